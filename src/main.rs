use anyhow::Result;
use chrono::Local;
use tracing::{info, warn};

use kube_perf_analyzer::collector::{Interrupt, MetricsSampler, SamplerConfig, StopFlag};
use kube_perf_analyzer::deployments::aggregate_deployments;
use kube_perf_analyzer::logging::init_tracing;
use kube_perf_analyzer::kubernetes::{connect, KubeCluster, KubeMetricsSource};
use kube_perf_analyzer::ownership::CachingOwnerLookup;
use kube_perf_analyzer::report::OptimizationReport;
use kube_perf_analyzer::{load_config, MetricsSnapshot, SamplerError};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!(
        period = ?cfg.collection_period,
        interval = ?cfg.sample_interval,
        namespace = cfg.namespace.as_deref().unwrap_or("<all>"),
        "Starting performance analysis"
    );

    let (client, context) = connect(&cfg).await?;

    let stop = StopFlag::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            // first Ctrl-C ends sampling early, a second one aborts the run
            while tokio::signal::ctrl_c().await.is_ok() {
                match stop.interrupt() {
                    Interrupt::Graceful => {
                        warn!("Interrupted, finishing with the samples collected so far (Ctrl-C again to abort)")
                    }
                    Interrupt::Abort => {
                        warn!("Interrupted again, aborting");
                        std::process::exit(130);
                    }
                }
            }
        });
    }

    let source = KubeMetricsSource::new(client.clone(), cfg.namespace.clone());
    let snapshot = match MetricsSampler::new(&source, SamplerConfig::from_config(&cfg))
        .with_stop_flag(stop)
        .collect()
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e @ SamplerError::MetricsUnavailable { .. }) if !cfg.fail_if_no_metrics => {
            warn!(error = %e, "Continuing the analysis without metrics");
            MetricsSnapshot::new()
        }
        Err(e) => return Err(e.into()),
    };

    let cluster = KubeCluster::new(client);
    let pods = cluster.list_pods(cfg.namespace.as_deref()).await?;
    info!("Found {} pods", pods.len());
    let nodes = cluster.list_nodes().await?;
    info!("Found {} nodes", nodes.len());

    let lookup = CachingOwnerLookup::new(&cluster);
    let deployments = aggregate_deployments(&pods, &snapshot, &lookup).await;
    info!(
        deployments = deployments.len(),
        replica_sets = lookup.cached_entries(),
        "Resolved deployment owners"
    );

    let report = OptimizationReport::new(
        context,
        cfg.collection_period,
        Local::now(),
        deployments,
        nodes.len(),
        &snapshot,
    );
    let path = report.write_to_dir(&cfg.report_dir)?;

    let summary = report.summary();
    if summary.has_issues() {
        warn!(
            deployments = summary.deployments_without_limits,
            pods = summary.pods_without_limits,
            "Deployments with pods lacking resource limits"
        );
    }
    info!(
        deployments = summary.deployment_count,
        nodes = summary.node_count,
        report = %path.display(),
        "Recommendations report written"
    );

    Ok(())
}
