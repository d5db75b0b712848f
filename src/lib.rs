// Public modules
pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod parsing;
pub mod kubernetes;
pub mod metrics;
pub mod collector;
pub mod ownership;
pub mod deployments;
pub mod report;

// Re-export commonly used items
pub use types::*;
pub use error::{ClusterError, SamplerError};
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_cpu_to_millicores, parse_memory_to_bytes, parse_duration, format_duration};
pub use kubernetes::{connect, KubeCluster, KubeMetricsSource};
pub use metrics::MetricsSource;
pub use collector::{collect_metrics, Interrupt, MetricsSampler, SamplerConfig, StopFlag, DEFAULT_SAMPLE_INTERVAL};
pub use ownership::{resolve_deployment, CachingOwnerLookup, OwnerLookup};
pub use deployments::{aggregate_deployments, DeploymentAggregate};
pub use report::{OptimizationReport, ReportSummary};
