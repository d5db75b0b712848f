use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::SamplerError;
use crate::metrics::MetricsSource;
use crate::types::{Config, MetricsSnapshot};

/// Fixed spacing between two samples unless configured otherwise.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Total collection window
    pub window: Duration,
    /// Spacing between samples
    pub interval: Duration,
    /// Deadline for a single metrics fetch
    pub fetch_timeout: Option<Duration>,
}

impl SamplerConfig {
    pub fn new(window: Duration, interval: Duration) -> Self {
        Self {
            window,
            interval,
            fetch_timeout: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            window: cfg.collection_period,
            interval: cfg.sample_interval,
            fetch_timeout: cfg.fetch_timeout,
        }
    }

    /// `floor(window / interval)`, zero for a zero interval.
    pub fn iterations(&self) -> usize {
        let quotient = self
            .window
            .as_nanos()
            .checked_div(self.interval.as_nanos())
            .unwrap_or(0);
        usize::try_from(quotient).unwrap_or(usize::MAX)
    }
}

/// Cooperative stop request shared with the sampler.
#[derive(Debug, Clone)]
pub struct StopFlag(Arc<watch::Sender<bool>>);

impl StopFlag {
    pub fn new() -> Self {
        Self(Arc::new(watch::Sender::new(false)))
    }

    pub fn request_stop(&self) {
        self.0.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.0.borrow()
    }

    /// Handles an interrupt: the first one requests a graceful stop, any
    /// later one asks for the run to be aborted.
    pub fn interrupt(&self) -> Interrupt {
        if self.is_stop_requested() {
            return Interrupt::Abort;
        }
        self.request_stop();
        Interrupt::Graceful
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.0.subscribe();
        // the sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Graceful,
    Abort,
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls a metrics source over a bounded window and keeps per-container and
/// per-node usage maxima.
pub struct MetricsSampler<'a, S: MetricsSource + ?Sized> {
    source: &'a S,
    config: SamplerConfig,
    stop: StopFlag,
}

impl<'a, S: MetricsSource + ?Sized> MetricsSampler<'a, S> {
    pub fn new(source: &'a S, config: SamplerConfig) -> Self {
        Self {
            source,
            config,
            stop: StopFlag::new(),
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Runs the whole collection window.
    ///
    /// Fails only when the initial probe fails. Individual fetch failures are
    /// logged, counted in [`MetricsSnapshot::failed_fetches`] and skipped.
    pub async fn collect(&self) -> Result<MetricsSnapshot, SamplerError> {
        self.fetch(self.source.probe())
            .await
            .map_err(|e| SamplerError::MetricsUnavailable {
                reason: format!("{:#}", e),
            })?;

        let total = self.config.iterations();
        let mut snapshot = MetricsSnapshot::new();
        info!(
            window_secs = self.config.window.as_secs(),
            interval_secs = self.config.interval.as_secs(),
            iterations = total,
            "Collecting metrics"
        );

        for i in 0..total {
            if self.stop.is_stop_requested() {
                info!(completed = i, iterations = total, "Stop requested, ending collection early");
                break;
            }
            if i > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.interval) => {}
                    _ = self.stop.stopped() => {
                        info!(completed = i, iterations = total, "Stop requested, ending collection early");
                        break;
                    }
                }
            }
            info!("Sample {}/{}", i + 1, total);
            self.sample_once(&mut snapshot).await;
            snapshot.iterations += 1;
        }

        debug!(
            pods = snapshot.pods.len(),
            nodes = snapshot.nodes.len(),
            failed_fetches = snapshot.failed_fetches,
            "Collection finished"
        );
        Ok(snapshot)
    }

    async fn sample_once(&self, snapshot: &mut MetricsSnapshot) {
        match self.fetch(self.source.list_pod_metrics()).await {
            Ok(pods) => pods.iter().for_each(|p| snapshot.record_pod(p)),
            Err(e) => {
                snapshot.failed_fetches += 1;
                warn!(error = %e, "Failed to collect pod metrics");
            }
        }

        match self.fetch(self.source.list_node_metrics()).await {
            Ok(nodes) => nodes.iter().for_each(|n| snapshot.record_node(n)),
            Err(e) => {
                snapshot.failed_fetches += 1;
                warn!(error = %e, "Failed to collect node metrics");
            }
        }
    }

    async fn fetch<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| anyhow!("metrics request timed out after {:?}", limit))?,
            None => call.await,
        }
    }
}

/// Samples `source` every `interval` for `window` and returns the maxima seen.
pub async fn collect_metrics<S: MetricsSource + ?Sized>(
    source: &S,
    window: Duration,
    interval: Duration,
) -> Result<MetricsSnapshot, SamplerError> {
    MetricsSampler::new(source, SamplerConfig::new(window, interval))
        .collect()
        .await
}
