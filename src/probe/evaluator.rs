//! Per-endpoint measurement: warm-up, then sequential measured attempts.

use std::time::Duration;

use tracing::{debug, info};

use super::config::ProbeConfig;
use super::prober::Prober;
use crate::models::{Endpoint, EndpointResult, FailureKind, ProbeAttempt, ProbeStatus};

/// Attempt count and timeout applied to every endpoint
#[derive(Debug, Clone, Copy)]
pub struct EvaluationPolicy {
    pub retry_count: u32,
    pub timeout: Duration,
    pub warmup: bool,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            retry_count: 3,
            timeout: Duration::from_millis(3000),
            warmup: true,
        }
    }
}

impl From<&ProbeConfig> for EvaluationPolicy {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            retry_count: config.retry_count,
            timeout: config.timeout,
            warmup: config.warmup,
        }
    }
}

#[derive(Clone)]
pub struct EndpointEvaluator {
    prober: Prober,
    policy: EvaluationPolicy,
}

impl EndpointEvaluator {
    pub fn new(prober: Prober, policy: EvaluationPolicy) -> Self {
        Self { prober, policy }
    }

    pub fn policy(&self) -> &EvaluationPolicy {
        &self.policy
    }

    /// Measure one endpoint. Attempts run one after another so they never compete
    /// for the same connection.
    pub async fn evaluate(&self, endpoint: &Endpoint) -> EndpointResult {
        if self.policy.warmup {
            // absorbs DNS and connection setup; outcome intentionally dropped
            let warmup = self.prober.probe(endpoint, self.policy.timeout).await;
            debug!(source = %endpoint.name, ok = warmup.is_success(), "warm-up done");
        }

        let mut attempts = Vec::with_capacity(self.policy.retry_count as usize);
        for _ in 0..self.policy.retry_count {
            attempts.push(self.prober.probe(endpoint, self.policy.timeout).await);
        }

        let result = aggregate(endpoint, &attempts);
        info!(
            source = %result.name,
            latency_ms = result.latency_ms,
            status = result.status.as_str(),
            "source measured"
        );
        result
    }
}

/// Fold measured attempts into one result.
pub fn aggregate(endpoint: &Endpoint, attempts: &[ProbeAttempt]) -> EndpointResult {
    let mut success_count = 0u32;
    let mut total_latency_ms = 0.0;
    let mut timeouts = 0usize;
    let mut errors = 0usize;

    for attempt in attempts {
        match attempt {
            ProbeAttempt::Success { latency_ms } => {
                success_count += 1;
                total_latency_ms += latency_ms;
            }
            ProbeAttempt::Failure(FailureKind::Timeout) => timeouts += 1,
            ProbeAttempt::Failure(FailureKind::TransportError) => errors += 1,
        }
    }

    if success_count > 0 {
        let mean = (total_latency_ms / success_count as f64).round() as i64;
        return EndpointResult::success(endpoint, mean);
    }

    EndpointResult::failed(endpoint, classify_failures(timeouts, errors))
}

/// Majority failure kind wins; an exact tie, or no attempts at all, is an error.
pub fn classify_failures(timeouts: usize, errors: usize) -> ProbeStatus {
    if timeouts > errors {
        ProbeStatus::Timeout
    } else {
        ProbeStatus::Error
    }
}
