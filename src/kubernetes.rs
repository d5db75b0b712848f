use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::{Container, Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{api::ListParams, Api, Client};
use tracing::info;

use crate::error::ClusterError;
use crate::metrics::nodes::node_samples_from_items;
use crate::metrics::pods::pod_samples_from_items;
use crate::metrics::{list_node_metrics_http, list_pod_metrics_http, MetricsSource};
use crate::ownership::{OwnerLookup, REPLICA_SET_KIND};
use crate::parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};
use crate::types::{Config, ContainerResources, NodeMetricsSample, OwnerRef, PodMetricsSample, PodRecord};

const IN_CLUSTER_CONTEXT: &str = "in-cluster";

/// Builds a client and returns it with the name of the context it uses.
///
/// An explicit kubeconfig path must be readable. Without one, the default
/// kubeconfig is used when present, otherwise the in-cluster environment.
pub async fn connect(cfg: &Config) -> Result<(Client, String)> {
    let kubeconfig = match &cfg.kubeconfig_path {
        Some(path) => Some(
            Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig {}", path.display()))?,
        ),
        None => Kubeconfig::read().ok(),
    };

    let (kube_config, context) = match kubeconfig {
        Some(kubeconfig) => {
            let context = cfg
                .kube_context
                .clone()
                .or_else(|| kubeconfig.current_context.clone())
                .context("kubeconfig has no current context; set KUBE_CONTEXT")?;
            let options = KubeConfigOptions {
                context: Some(context.clone()),
                ..Default::default()
            };
            let kube_config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .with_context(|| format!("loading kubeconfig context {}", context))?;
            (kube_config, context)
        }
        None => {
            let kube_config = kube::Config::infer()
                .await
                .context("no kubeconfig found and in-cluster config unavailable")?;
            (kube_config, IN_CLUSTER_CONTEXT.to_string())
        }
    };

    info!(context = %context, cluster = %kube_config.cluster_url, "Connecting to cluster");
    let client = Client::try_from(kube_config).context("creating Kubernetes client")?;
    Ok((client, context))
}

/// `metrics.k8s.io` backed metrics source.
pub struct KubeMetricsSource {
    client: Client,
    namespace: Option<String>,
}

impl KubeMetricsSource {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }
}

#[async_trait]
impl MetricsSource for KubeMetricsSource {
    async fn list_pod_metrics(&self) -> Result<Vec<PodMetricsSample>> {
        let items = list_pod_metrics_http(&self.client, self.namespace.as_deref()).await?;
        Ok(pod_samples_from_items(items))
    }

    async fn list_node_metrics(&self) -> Result<Vec<NodeMetricsSample>> {
        let items = list_node_metrics_http(&self.client).await?;
        Ok(node_samples_from_items(items))
    }
}

/// Read-only access to pods, nodes and replica-sets.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Lists pods in one namespace, or in all namespaces when `namespace` is `None`.
    pub async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodRecord>, ClusterError> {
        let pod_api: Api<Pod> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let pods = pod_api
            .list(&ListParams::default())
            .await
            .map_err(ClusterError::Connection)?;
        Ok(pods.items.iter().filter_map(pod_record).collect())
    }

    pub async fn list_nodes(&self) -> Result<Vec<String>, ClusterError> {
        let node_api: Api<Node> = Api::all(self.client.clone());
        let nodes = node_api
            .list(&ListParams::default())
            .await
            .map_err(ClusterError::Connection)?;
        Ok(nodes.items.into_iter().filter_map(|n| n.metadata.name).collect())
    }
}

#[async_trait]
impl OwnerLookup for KubeCluster {
    async fn replica_set_owners(&self, namespace: &str, name: &str) -> Result<Vec<OwnerRef>, ClusterError> {
        let rs_api: Api<ReplicaSet> = Api::namespaced(self.client.clone(), namespace);
        let rs = rs_api
            .get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, REPLICA_SET_KIND, namespace, name))?;
        Ok(owner_refs(&rs.metadata.owner_references))
    }
}

fn owner_refs(refs: &Option<Vec<k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference>>) -> Vec<OwnerRef> {
    refs.iter()
        .flatten()
        .map(|o| OwnerRef::new(&o.kind, &o.name))
        .collect()
}

/// Converts an API pod; pods without a name are dropped.
pub fn pod_record(pod: &Pod) -> Option<PodRecord> {
    let name = pod.metadata.name.clone()?;
    Some(PodRecord {
        name,
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        owner_references: owner_refs(&pod.metadata.owner_references),
        containers: pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.iter().map(container_resources).collect())
            .unwrap_or_default(),
    })
}

fn container_resources(c: &Container) -> ContainerResources {
    let limits = c.resources.as_ref().and_then(|r| r.limits.as_ref());
    ContainerResources {
        name: c.name.clone(),
        cpu_limit_millicores: quantity(limits, "cpu").and_then(parse_cpu_to_millicores),
        memory_limit_bytes: quantity(limits, "memory").and_then(parse_memory_to_bytes),
    }
}

fn quantity<'a>(map: Option<&'a BTreeMap<String, Quantity>>, key: &str) -> Option<&'a str> {
    map.and_then(|m| m.get(key)).map(|q| q.0.as_str())
}
