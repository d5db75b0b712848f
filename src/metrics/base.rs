use anyhow::{anyhow, Result};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

const METRICS_API: &str = "/apis/metrics.k8s.io/v1beta1";

#[derive(Debug, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    pub usage: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct PodMetricsItem {
    pub metadata: serde_json::Value,
    pub containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Deserialize)]
pub struct NodeMetricsItem {
    pub metadata: serde_json::Value,
    pub usage: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsList<T> {
    pub items: Vec<T>,
}

pub fn pod_metrics_path(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("{}/namespaces/{}/pods", METRICS_API, ns),
        None => format!("{}/pods", METRICS_API),
    }
}

pub fn node_metrics_path() -> String {
    format!("{}/nodes", METRICS_API)
}

async fn get_list<T: DeserializeOwned>(client: &Client, path: String) -> Result<Vec<T>> {
    use http::Request as HttpRequest;
    let req = HttpRequest::builder()
        .method("GET")
        .uri(path)
        .body(Vec::new())
        .map_err(|e| anyhow!("build request: {}", e))?;
    let list: MetricsList<T> = client.request(req).await?;
    Ok(list.items)
}

/// Lists pod metrics in one namespace, or cluster-wide when `namespace` is `None`.
pub async fn list_pod_metrics_http(client: &Client, namespace: Option<&str>) -> Result<Vec<PodMetricsItem>> {
    get_list(client, pod_metrics_path(namespace)).await
}

pub async fn list_node_metrics_http(client: &Client) -> Result<Vec<NodeMetricsItem>> {
    get_list(client, node_metrics_path()).await
}

pub(crate) fn metadata_str<'a>(metadata: &'a serde_json::Value, field: &str) -> &'a str {
    metadata.get(field).and_then(|v| v.as_str()).unwrap_or("")
}
