use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::deployments::{sorted_deployments, DeploymentAggregate};
use crate::parsing::{bytes_to_mebibytes, format_duration};
use crate::types::{DeploymentKey, MetricsSnapshot, NodeUsage};

const SEPARATOR_WIDTH: usize = 80;

/// Optimization report for one analysis run
pub struct OptimizationReport {
    pub context: String,
    pub period: Duration,
    pub generated_at: DateTime<Local>,
    pub deployments: Vec<DeploymentAggregate>,
    pub node_count: usize,
    pub node_usage: Vec<(String, NodeUsage)>,
    pub iterations: usize,
    pub failed_fetches: usize,
}

impl OptimizationReport {
    pub fn new(
        context: impl Into<String>,
        period: Duration,
        generated_at: DateTime<Local>,
        deployments: HashMap<DeploymentKey, DeploymentAggregate>,
        node_count: usize,
        snapshot: &MetricsSnapshot,
    ) -> Self {
        let mut node_usage: Vec<_> = snapshot
            .nodes
            .iter()
            .map(|(name, usage)| (name.clone(), *usage))
            .collect();
        node_usage.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            context: context.into(),
            period,
            generated_at,
            deployments: sorted_deployments(deployments),
            node_count,
            node_usage,
            iterations: snapshot.iterations,
            failed_fetches: snapshot.failed_fetches,
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            deployment_count: self.deployments.len(),
            deployments_without_limits: self
                .deployments
                .iter()
                .filter(|d| d.pods_without_limits > 0)
                .count(),
            pods_without_limits: self.deployments.iter().map(|d| d.pods_without_limits).sum(),
            node_count: self.node_count,
        }
    }

    pub fn render(&self) -> String {
        let period = format_duration(self.period);
        let mut lines = vec![
            "Kubernetes Optimization Recommendations".to_string(),
            format!("Context: {}", self.context),
            format!("Analysis period: {}", period),
            format!("Generated at: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S")),
            String::new(),
            String::new(),
            "=== Recommendations by Deployment ===".to_string(),
            "-".repeat(36),
        ];
        for d in &self.deployments {
            lines.extend(render_deployment(d, &period));
        }

        if !self.node_usage.is_empty() {
            lines.push(String::new());
            lines.push("=== Node Peak Usage ===".to_string());
            for (name, usage) in &self.node_usage {
                lines.push(format!(
                    "- {}: CPU {}m, Memory {}Mi",
                    name,
                    usage.max_cpu,
                    bytes_to_mebibytes(usage.max_memory)
                ));
            }
        }

        let summary = self.summary();
        lines.push(String::new());
        lines.push("=== Recommendations Summary ===".to_string());
        lines.push(format!("Deployments analyzed: {}", summary.deployment_count));
        lines.push(format!("Deployments with pods lacking limits: {}", summary.deployments_without_limits));
        lines.push(format!("Nodes monitored: {}", summary.node_count));
        lines.push(format!(
            "Metric samples: {} ({} failed fetches)",
            self.iterations, self.failed_fetches
        ));

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    pub fn file_name(&self) -> String {
        format!(
            "recommendations-{}-{}.txt",
            sanitize_filename(&self.context),
            self.generated_at.format("%Y-%m-%d-%H-%M-%S")
        )
    }

    /// Writes the rendered report into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating report directory {}", dir.display()))?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.render())
            .with_context(|| format!("writing report {}", path.display()))?;
        Ok(path)
    }
}

fn render_deployment(d: &DeploymentAggregate, period: &str) -> Vec<String> {
    let max_mem = bytes_to_mebibytes(d.max_memory);
    let avg_mem = bytes_to_mebibytes(d.avg_memory);

    let mut lines = vec![
        String::new(),
        format!("Deployment: {} (Namespace: {})", d.name, d.namespace),
        format!("Total pods: {}", d.total_pods),
        format!("Pods without limits: {}", d.pods_without_limits),
    ];

    if d.has_usage() {
        lines.push(String::new());
        lines.push(format!("Metrics (period of {}):", period));
        lines.push("  Maximum:".to_string());
        lines.push(format!("    CPU: {}m", d.max_cpu));
        lines.push(format!("    Memory: {}Mi", max_mem));
        lines.push("  Average:".to_string());
        lines.push(format!("    CPU: {}m", d.avg_cpu));
        lines.push(format!("    Memory: {}Mi", avg_mem));
    }

    if d.pods_without_limits > 0 {
        lines.push(String::new());
        lines.push("Issues found:".to_string());
        lines.push(format!("1. {} pods without resource limits", d.pods_without_limits));
        lines.push("   Recommendation: set CPU and memory limits to prevent runaway consumption".to_string());
        lines.push("   Impact: High - may degrade cluster performance".to_string());
        lines.push("   Priority: High".to_string());
    }

    if d.has_usage() {
        lines.push(String::new());
        lines.push("Resource recommendations:".to_string());
        lines.push("1. Suggested limits based on observed maximum:".to_string());
        lines.push(format!("   CPU: {}m (observed maximum)", d.max_cpu));
        lines.push(format!("   Memory: {}Mi (observed maximum)", max_mem));
        lines.push("2. Suggested requests based on observed average:".to_string());
        lines.push(format!("   CPU: {}m (observed average)", d.avg_cpu));
        lines.push(format!("   Memory: {}Mi (observed average)", avg_mem));
    }

    lines.push(String::new());
    lines.push("Monitored pods:".to_string());
    for pod in &d.pods {
        lines.push(format!("- {}", pod));
    }
    lines.push(String::new());
    lines.push("-".repeat(SEPARATOR_WIDTH));
    lines
}

/// Replaces characters unsafe in file names with `-`, collapsing runs.
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' };
        if c == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(c);
    }
    sanitized.trim_matches('-').to_string()
}

pub struct ReportSummary {
    pub deployment_count: usize,
    pub deployments_without_limits: usize,
    pub pods_without_limits: usize,
    pub node_count: usize,
}

impl ReportSummary {
    pub fn has_issues(&self) -> bool {
        self.pods_without_limits > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PodRecord;
    use chrono::TimeZone;

    fn generated_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 10, 30, 5).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("arn:aws:eks:us-east-1:123:cluster/prod"),
            "arn-aws-eks-us-east-1-123-cluster-prod"
        );
        assert_eq!(sanitize_filename("kind-dev"), "kind-dev");
        assert_eq!(sanitize_filename("::gke_proj::"), "gke_proj");
        assert_eq!(sanitize_filename("a -- b"), "a-b");
        assert_eq!(sanitize_filename("ctx.v1_x"), "ctx.v1_x");
    }

    #[test]
    fn test_file_name() {
        let report = OptimizationReport::new(
            "user@prod:cluster",
            Duration::from_secs(300),
            generated_at(),
            HashMap::new(),
            0,
            &MetricsSnapshot::new(),
        );
        assert_eq!(report.file_name(), "recommendations-user-prod-cluster-2024-05-01-10-30-05.txt");
    }

    #[test]
    fn test_render_deployment_without_usage_or_issues() {
        let mut agg = DeploymentAggregate::new("ns", "quiet");
        agg.fold_pod(
            &PodRecord {
                name: "quiet-1".to_string(),
                namespace: "ns".to_string(),
                ..Default::default()
            },
            None,
        );
        let mut map = HashMap::new();
        map.insert(agg.key(), agg);

        let report = OptimizationReport::new("ctx", Duration::from_secs(60), generated_at(), map, 2, &MetricsSnapshot::new());
        let text = report.render();

        assert!(text.contains("Deployment: quiet (Namespace: ns)"));
        assert!(text.contains("Pods without limits: 0"));
        assert!(!text.contains("Issues found"));
        assert!(!text.contains("Resource recommendations"));
        assert!(text.contains("- quiet-1"));
        assert!(text.contains("Nodes monitored: 2"));
        assert!(!report.summary().has_issues());
    }

    #[test]
    fn test_render_layout() {
        let mut agg = DeploymentAggregate::new("ns", "quiet");
        agg.fold_pod(
            &PodRecord {
                name: "quiet-1".to_string(),
                namespace: "ns".to_string(),
                ..Default::default()
            },
            None,
        );
        let mut map = HashMap::new();
        map.insert(agg.key(), agg);

        let report = OptimizationReport::new("ctx", Duration::from_secs(60), generated_at(), map, 0, &MetricsSnapshot::new());
        let text = report.render();
        let separator = "-".repeat(SEPARATOR_WIDTH);
        let expected = [
            "Kubernetes Optimization Recommendations",
            "Context: ctx",
            "Analysis period: 1m",
            "Generated at: 2024-05-01 10:30:05",
            "",
            "",
            "=== Recommendations by Deployment ===",
            "------------------------------------",
            "",
            "Deployment: quiet (Namespace: ns)",
            "Total pods: 1",
            "Pods without limits: 0",
            "",
            "Monitored pods:",
            "- quiet-1",
            "",
            separator.as_str(),
            "",
            "=== Recommendations Summary ===",
            "Deployments analyzed: 1",
            "Deployments with pods lacking limits: 0",
            "Nodes monitored: 0",
            "Metric samples: 0 (0 failed fetches)",
        ];
        assert_eq!(text, format!("{}\n", expected.join("\n")));
    }
}
