use crate::parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};
use crate::types::{ContainerMetricsSample, PodMetricsSample};

use super::base::{metadata_str, ContainerMetrics, PodMetricsItem};

/// Converts raw metrics items into samples, dropping items without a name.
pub fn pod_samples_from_items(items: Vec<PodMetricsItem>) -> Vec<PodMetricsSample> {
    items
        .into_iter()
        .filter_map(|item| {
            let name = metadata_str(&item.metadata, "name");
            if name.is_empty() {
                return None;
            }
            Some(PodMetricsSample {
                namespace: metadata_str(&item.metadata, "namespace").to_string(),
                name: name.to_string(),
                containers: item.containers.iter().map(container_sample).collect(),
            })
        })
        .collect()
}

// Unparseable quantities count as zero usage
fn container_sample(c: &ContainerMetrics) -> ContainerMetricsSample {
    ContainerMetricsSample {
        name: c.name.clone(),
        cpu_millicores: c
            .usage
            .get("cpu")
            .and_then(|q| parse_cpu_to_millicores(q))
            .unwrap_or(0),
        memory_bytes: c
            .usage
            .get("memory")
            .and_then(|q| parse_memory_to_bytes(q))
            .unwrap_or(0),
    }
}
