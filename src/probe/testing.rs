//! Scripted in-memory transport for tests.
//!
//! Built for the crate's own unit tests, and for dependents with the `test-util` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::transport::{HeadTransport, TransportError};

/// What a scripted url does when probed
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Respond with `status` after `delay_ms`
    Ok { delay_ms: u64, status: u16 },
    /// Wait out the caller's timeout, then report a timeout
    Timeout,
    /// Fail immediately with a transport error
    Fail(String),
    /// Never respond
    Hang,
    /// Panic inside the transport call
    Panic,
    /// Play the listed behaviors in order, repeating the last one
    Sequence(Vec<Behavior>),
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, Behavior>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, behavior: Behavior) -> Self {
        self.routes.insert(url.into(), behavior);
        self
    }

    /// Number of HEAD requests issued against `url`
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    /// Highest number of simultaneously outstanding requests seen
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_behavior(&self, url: &str) -> Behavior {
        let call_index = {
            let mut calls = self.calls.lock();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };

        match self.routes.get(url) {
            Some(Behavior::Sequence(steps)) => steps
                .get(call_index)
                .or_else(|| steps.last())
                .cloned()
                .unwrap_or_else(|| Behavior::Fail("empty sequence".into())),
            Some(behavior) => behavior.clone(),
            None => Behavior::Fail(format!("no route for {}", url)),
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl HeadTransport for ScriptedTransport {
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, TransportError> {
        let behavior = self.next_behavior(url);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        match behavior {
            Behavior::Ok { delay_ms, status } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(status)
            }
            Behavior::Timeout => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout)
            }
            Behavior::Fail(reason) => Err(TransportError::Other(reason)),
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("scripted transport panic for {}", url),
            Behavior::Sequence(_) => Err(TransportError::Other("nested sequence".into())),
        }
    }
}
