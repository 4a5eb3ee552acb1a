//! Application entry point for sweeps: runs the coordinator, fills the cache.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::cache::ResultCache;
use super::coordinator::ProbeCoordinator;
use super::metrics::SweepMetrics;
use crate::error::SweepError;
use crate::models::{Endpoint, ProbeReport};

/// Owns the endpoint list and everything a sweep writes to.
pub struct SweepRunner {
    coordinator: ProbeCoordinator,
    endpoints: Arc<[Endpoint]>,
    cache: Arc<ResultCache>,
    metrics: Arc<SweepMetrics>,
    /// One sweep at a time
    guard: Mutex<()>,
}

impl SweepRunner {
    pub fn new(
        coordinator: ProbeCoordinator,
        endpoints: Arc<[Endpoint]>,
        cache: Arc<ResultCache>,
        metrics: Arc<SweepMetrics>,
    ) -> Self {
        Self {
            coordinator,
            endpoints,
            cache,
            metrics,
            guard: Mutex::new(()),
        }
    }

    pub fn endpoints(&self) -> &Arc<[Endpoint]> {
        &self.endpoints
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<SweepMetrics> {
        &self.metrics
    }

    /// Run one sweep to completion and cache its report.
    pub async fn run(&self) -> Result<ProbeReport, SweepError> {
        let _running = match self.guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Sweep already running, waiting for it to finish");
                self.guard.lock().await
            }
        };

        let started = Instant::now();
        match self.coordinator.run_probe_sweep(&self.endpoints).await {
            Ok(report) => {
                self.metrics.record_report(&report, started.elapsed());
                let bucket = self.cache.store(report.clone());
                info!(bucket = %bucket, elapsed_ms = started.elapsed().as_millis() as u64, "Cached sweep report");
                Ok(report)
            }
            Err(e) => {
                self.metrics.record_sweep_failure();
                error!("Probe sweep failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run a sweep on its own task. The sweep finishes and is cached even if the
    /// returned future is dropped.
    pub async fn run_detached(self: &Arc<Self>) -> Result<ProbeReport, SweepError> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.run().await })
            .await
            .map_err(|e| SweepError::Internal(e.to_string()))?
    }
}
