use crate::parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};
use crate::types::NodeMetricsSample;

use super::base::{metadata_str, NodeMetricsItem};

pub fn node_samples_from_items(items: Vec<NodeMetricsItem>) -> Vec<NodeMetricsSample> {
    items
        .into_iter()
        .filter_map(|item| {
            let name = metadata_str(&item.metadata, "name");
            if name.is_empty() {
                return None;
            }
            Some(NodeMetricsSample {
                name: name.to_string(),
                cpu_millicores: item
                    .usage
                    .get("cpu")
                    .and_then(|c| parse_cpu_to_millicores(c))
                    .unwrap_or(0),
                memory_bytes: item
                    .usage
                    .get("memory")
                    .and_then(|m| parse_memory_to_bytes(m))
                    .unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_node_samples_from_items() {
        let mut usage = HashMap::new();
        usage.insert("cpu".to_string(), "2000m".to_string());
        usage.insert("memory".to_string(), "4Gi".to_string());

        let items = vec![
            NodeMetricsItem {
                metadata: serde_json::json!({"name": "node-a"}),
                usage,
            },
            NodeMetricsItem {
                metadata: serde_json::json!({}),
                usage: HashMap::new(),
            },
        ];

        let samples = node_samples_from_items(items);
        assert_eq!(
            samples,
            vec![NodeMetricsSample {
                name: "node-a".to_string(),
                cpu_millicores: 2000,
                memory_bytes: 4 * 1024 * 1024 * 1024,
            }]
        );
    }
}
