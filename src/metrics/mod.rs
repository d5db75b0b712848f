// Metrics API access
pub mod base;
pub mod pods;
pub mod nodes;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{NodeMetricsSample, PodMetricsSample};

pub use base::{list_node_metrics_http, list_pod_metrics_http};

/// Source of live pod-container and node usage.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn list_pod_metrics(&self) -> Result<Vec<PodMetricsSample>>;

    async fn list_node_metrics(&self) -> Result<Vec<NodeMetricsSample>>;

    /// Single reachability check issued before sampling starts.
    async fn probe(&self) -> Result<()> {
        self.list_node_metrics().await.map(|_| ())
    }
}
