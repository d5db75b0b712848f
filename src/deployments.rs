use std::collections::HashMap;

use tracing::debug;

use crate::ownership::{resolve_deployment, OwnerLookup};
use crate::types::{DeploymentKey, MetricsSnapshot, PodRecord, PodUsage};

/// Usage statistics of one deployment over the collection window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentAggregate {
    pub name: String,
    pub namespace: String,
    /// Member pods in the order they were folded in
    pub pods: Vec<String>,
    pub total_pods: usize,
    pub pods_without_limits: usize,
    pub max_cpu: i64,
    pub max_memory: i64,
    pub avg_cpu: i64,
    pub avg_memory: i64,
    cpu_sum: i64,
    memory_sum: i64,
    observed_containers: usize,
}

impl DeploymentAggregate {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            pods: Vec::new(),
            total_pods: 0,
            pods_without_limits: 0,
            max_cpu: 0,
            max_memory: 0,
            avg_cpu: 0,
            avg_memory: 0,
            cpu_sum: 0,
            memory_sum: 0,
            observed_containers: 0,
        }
    }

    pub fn key(&self) -> DeploymentKey {
        DeploymentKey::new(&self.namespace, &self.name)
    }

    pub fn observed_containers(&self) -> usize {
        self.observed_containers
    }

    pub fn has_usage(&self) -> bool {
        self.max_cpu > 0 || self.max_memory > 0
    }

    /// Adds one member pod and, when present, its sampled usage.
    pub fn fold_pod(&mut self, pod: &PodRecord, usage: Option<&PodUsage>) {
        self.pods.push(pod.name.clone());
        self.total_pods += 1;
        if !pod.has_limits() {
            self.pods_without_limits += 1;
        }

        let Some(usage) = usage else {
            return;
        };
        if usage.containers.is_empty() {
            return;
        }
        for container in usage.containers.values() {
            self.max_cpu = self.max_cpu.max(container.max_cpu);
            self.max_memory = self.max_memory.max(container.max_memory);
            self.cpu_sum += container.max_cpu;
            self.memory_sum += container.max_memory;
        }
        self.observed_containers += usage.containers.len();
        let count = self.observed_containers as i64;
        self.avg_cpu = self.cpu_sum / count;
        self.avg_memory = self.memory_sum / count;
    }
}

/// Groups pods by owning deployment and folds in their sampled usage.
///
/// Pods without a deployment owner are skipped. Pods missing from the
/// snapshot still count towards `total_pods` and `pods_without_limits`.
pub async fn aggregate_deployments<L: OwnerLookup + ?Sized>(
    pods: &[PodRecord],
    snapshot: &MetricsSnapshot,
    lookup: &L,
) -> HashMap<DeploymentKey, DeploymentAggregate> {
    let mut deployments: HashMap<DeploymentKey, DeploymentAggregate> = HashMap::new();

    for pod in pods {
        let Some(deployment) = resolve_deployment(pod, lookup).await else {
            debug!(pod = %pod.key(), "Pod has no owning deployment, skipping");
            continue;
        };
        let key = DeploymentKey::new(&pod.namespace, deployment);
        deployments
            .entry(key.clone())
            .or_insert_with(|| DeploymentAggregate::new(key.namespace, key.name))
            .fold_pod(pod, snapshot.pod(&pod.key()));
    }

    deployments
}

/// Aggregates sorted by namespace, then deployment name.
pub fn sorted_deployments(deployments: HashMap<DeploymentKey, DeploymentAggregate>) -> Vec<DeploymentAggregate> {
    let mut sorted: Vec<_> = deployments.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
    sorted.into_iter().map(|(_, d)| d).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerResources, ContainerUsage};
    use std::collections::BTreeMap;

    const MI: i64 = 1024 * 1024;

    fn limited(name: &str) -> ContainerResources {
        ContainerResources {
            name: name.to_string(),
            cpu_limit_millicores: Some(500),
            memory_limit_bytes: Some(256 * MI),
            ..Default::default()
        }
    }

    fn pod(name: &str, containers: Vec<ContainerResources>) -> PodRecord {
        PodRecord {
            name: name.to_string(),
            namespace: "ns".to_string(),
            owner_references: vec![],
            containers,
        }
    }

    fn usage(containers: &[(&str, i64, i64)]) -> PodUsage {
        PodUsage {
            namespace: "ns".to_string(),
            containers: containers
                .iter()
                .map(|(n, cpu, mem)| {
                    (
                        n.to_string(),
                        ContainerUsage {
                            max_cpu: *cpu,
                            max_memory: *mem,
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_zero_cpu_limit_counts_as_missing() {
        let mut container = limited("app");
        container.cpu_limit_millicores = Some(0);
        let mut agg = DeploymentAggregate::new("ns", "web");

        agg.fold_pod(&pod("web-1", vec![container]), None);

        assert_eq!(agg.total_pods, 1);
        assert_eq!(agg.pods_without_limits, 1);
    }

    #[test]
    fn test_pod_without_containers_counts_as_limited() {
        let mut agg = DeploymentAggregate::new("ns", "web");
        agg.fold_pod(&pod("web-1", vec![]), None);

        assert_eq!(agg.pods_without_limits, 0);
        assert!(!agg.has_usage());
    }

    #[test]
    fn test_averages_follow_all_observed_containers() {
        let mut agg = DeploymentAggregate::new("ns", "web");

        agg.fold_pod(&pod("web-1", vec![limited("app")]), Some(&usage(&[("app", 100, 10 * MI), ("proxy", 20, 2 * MI)])));
        assert_eq!(agg.observed_containers(), 2);
        assert_eq!(agg.avg_cpu, 60);
        assert_eq!(agg.avg_memory, 6 * MI);

        agg.fold_pod(&pod("web-2", vec![limited("app")]), Some(&usage(&[("app", 300, 30 * MI)])));
        assert_eq!(agg.observed_containers(), 3);
        assert_eq!(agg.avg_cpu, 140);
        assert_eq!(agg.avg_memory, 14 * MI);
        assert_eq!(agg.max_cpu, 300);
        assert_eq!(agg.max_memory, 30 * MI);
    }

    #[test]
    fn test_pod_with_no_observed_containers_keeps_averages() {
        let mut agg = DeploymentAggregate::new("ns", "web");
        agg.fold_pod(&pod("web-1", vec![]), Some(&usage(&[("app", 90, 9 * MI)])));

        agg.fold_pod(&pod("web-2", vec![]), Some(&usage(&[])));
        agg.fold_pod(&pod("web-3", vec![]), None);

        assert_eq!(agg.total_pods, 3);
        assert_eq!(agg.observed_containers(), 1);
        assert_eq!(agg.avg_cpu, 90);
        assert_eq!(agg.avg_memory, 9 * MI);
        assert_eq!(agg.pods, vec!["web-1", "web-2", "web-3"]);
    }

    #[test]
    fn test_sorted_deployments() {
        let mut map = HashMap::new();
        for (ns, name) in [("b", "api"), ("a", "web"), ("a", "api")] {
            map.insert(DeploymentKey::new(ns, name), DeploymentAggregate::new(ns, name));
        }

        let keys: Vec<String> = sorted_deployments(map).iter().map(|d| d.key().to_string()).collect();
        assert_eq!(keys, vec!["a/api", "a/web", "b/api"]);
    }
}
