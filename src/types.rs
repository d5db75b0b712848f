use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub collection_period: Duration,
    pub sample_interval: Duration,
    pub fetch_timeout: Option<Duration>,
    pub namespace: Option<String>,
    pub kube_context: Option<String>,
    pub kubeconfig_path: Option<PathBuf>,
    pub report_dir: PathBuf,
    pub fail_if_no_metrics: bool,
}

/// Pod identity used to join metrics samples against the pod list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Peak usage of one container over the collection window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContainerUsage {
    pub max_cpu: i64,
    pub max_memory: i64,
}

impl ContainerUsage {
    pub fn observe(&mut self, cpu_millicores: i64, memory_bytes: i64) {
        self.max_cpu = self.max_cpu.max(cpu_millicores);
        self.max_memory = self.max_memory.max(memory_bytes);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PodUsage {
    pub namespace: String,
    pub containers: BTreeMap<String, ContainerUsage>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeUsage {
    pub max_cpu: i64,
    pub max_memory: i64,
}

impl NodeUsage {
    pub fn observe(&mut self, cpu_millicores: i64, memory_bytes: i64) {
        self.max_cpu = self.max_cpu.max(cpu_millicores);
        self.max_memory = self.max_memory.max(memory_bytes);
    }
}

/// One pod's usage as returned by a single metrics listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodMetricsSample {
    pub namespace: String,
    pub name: String,
    pub containers: Vec<ContainerMetricsSample>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMetricsSample {
    pub name: String,
    pub cpu_millicores: i64,
    pub memory_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMetricsSample {
    pub name: String,
    pub cpu_millicores: i64,
    pub memory_bytes: i64,
}

/// Max-usage accumulator filled by the sampler.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub pods: HashMap<PodKey, PodUsage>,
    pub nodes: HashMap<String, NodeUsage>,
    pub iterations: usize,
    pub failed_fetches: usize,
}

impl MetricsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty() && self.nodes.is_empty()
    }

    pub fn pod(&self, key: &PodKey) -> Option<&PodUsage> {
        self.pods.get(key)
    }

    pub fn record_pod(&mut self, sample: &PodMetricsSample) {
        let usage = self
            .pods
            .entry(PodKey::new(&sample.namespace, &sample.name))
            .or_insert_with(|| PodUsage {
                namespace: sample.namespace.clone(),
                containers: BTreeMap::new(),
            });
        for c in &sample.containers {
            usage
                .containers
                .entry(c.name.clone())
                .or_default()
                .observe(c.cpu_millicores, c.memory_bytes);
        }
    }

    pub fn record_node(&mut self, sample: &NodeMetricsSample) {
        self.nodes
            .entry(sample.name.clone())
            .or_default()
            .observe(sample.cpu_millicores, sample.memory_bytes);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainerResources {
    pub name: String,
    pub cpu_limit_millicores: Option<i64>,
    pub memory_limit_bytes: Option<i64>,
}

impl ContainerResources {
    /// Both a CPU and a memory limit are set to a non-zero value.
    pub fn has_limits(&self) -> bool {
        self.cpu_limit_millicores.unwrap_or(0) != 0 && self.memory_limit_bytes.unwrap_or(0) != 0
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub owner_references: Vec<OwnerRef>,
    pub containers: Vec<ContainerResources>,
}

impl PodRecord {
    pub fn key(&self) -> PodKey {
        PodKey::new(&self.namespace, &self.name)
    }

    /// A pod without containers counts as limited.
    pub fn has_limits(&self) -> bool {
        self.containers.iter().all(ContainerResources::has_limits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeploymentKey {
    pub namespace: String,
    pub name: String,
}

impl DeploymentKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DeploymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
