//! Single latency measurement against one mirror.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use super::transport::{HeadTransport, TransportError};
use crate::models::{Endpoint, FailureKind, ProbeAttempt};

/// Responses at or above this status count as failed attempts
const FAILURE_STATUS: u16 = 400;

/// Times one HEAD request through the injected transport.
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn HeadTransport>,
}

impl Prober {
    pub fn new(transport: Arc<dyn HeadTransport>) -> Self {
        Self { transport }
    }

    /// Perform exactly one attempt. Every outcome, including a transport that ignores
    /// its timeout, comes back as a [`ProbeAttempt`].
    pub async fn probe(&self, endpoint: &Endpoint, attempt_timeout: Duration) -> ProbeAttempt {
        let start = Instant::now();
        let outcome = timeout(
            attempt_timeout,
            self.transport.head(&endpoint.url, attempt_timeout),
        )
        .await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(status)) if status < FAILURE_STATUS => {
                debug!(source = %endpoint.name, status, latency_ms = elapsed_ms, "HEAD ok");
                ProbeAttempt::Success {
                    latency_ms: elapsed_ms,
                }
            }
            Ok(Ok(status)) => {
                warn!(source = %endpoint.name, status, "HEAD returned error status");
                ProbeAttempt::Failure(FailureKind::TransportError)
            }
            Ok(Err(TransportError::Timeout)) | Err(_) => {
                warn!(source = %endpoint.name, timeout_ms = attempt_timeout.as_millis() as u64, "HEAD timed out");
                ProbeAttempt::Failure(FailureKind::Timeout)
            }
            Ok(Err(TransportError::Other(reason))) => {
                warn!(source = %endpoint.name, %reason, "HEAD failed");
                ProbeAttempt::Failure(FailureKind::TransportError)
            }
        }
    }
}
