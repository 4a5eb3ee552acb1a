//! Concurrent sweep across every configured mirror.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tracing::{error, info};

use super::evaluator::EndpointEvaluator;
use crate::error::{ConfigError, SweepError};
use crate::models::{Endpoint, EndpointResult, ProbeReport, ProbeStatus};

/// Fans endpoint evaluations out over a bounded pool and ranks the results.
#[derive(Clone)]
pub struct ProbeCoordinator {
    evaluator: Arc<EndpointEvaluator>,
    concurrency: usize,
}

impl ProbeCoordinator {
    pub fn new(evaluator: EndpointEvaluator, concurrency: usize) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Evaluate every endpoint and return the ranked report.
    ///
    /// Resolves only after all evaluations finish. Individual endpoint failures,
    /// including a panicking evaluation, become `error` results; only an empty
    /// endpoint list fails the sweep.
    pub async fn run_probe_sweep(&self, endpoints: &[Endpoint]) -> Result<ProbeReport, SweepError> {
        if endpoints.is_empty() {
            return Err(ConfigError::EmptyEndpoints.into());
        }

        info!(
            sources = endpoints.len(),
            concurrency = self.concurrency,
            "Starting probe sweep"
        );

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut pending = FuturesUnordered::new();

        for (index, endpoint) in endpoints.iter().enumerate() {
            let evaluator = self.evaluator.clone();
            let permits = permits.clone();
            let endpoint = endpoint.clone();

            let handle = tokio::spawn(async move {
                // the semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                evaluator.evaluate(&endpoint).await
            });
            pending.push(handle.map(move |joined| (index, joined)));
        }

        // completion order
        let mut collected: Vec<(usize, EndpointResult)> = Vec::with_capacity(endpoints.len());
        while let Some((index, joined)) = pending.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    let endpoint = &endpoints[index];
                    error!(source = %endpoint.name, error = %e, "Source evaluation failed");
                    EndpointResult::failed(endpoint, ProbeStatus::Error)
                }
            };
            collected.push((index, result));
        }

        let report = ProbeReport::from_ranked(Utc::now(), rank(collected));
        info!(
            reachable = report.reachable_count(),
            total = report.results.len(),
            fastest = report.fastest.as_ref().map(|r| r.name.as_str()).unwrap_or("none"),
            "Probe sweep complete"
        );
        Ok(report)
    }
}

/// Successes first by ascending latency, then everything else. Ties keep
/// configuration order so the ranking is reproducible.
pub fn rank(mut results: Vec<(usize, EndpointResult)>) -> Vec<EndpointResult> {
    results.sort_by(|(ia, a), (ib, b)| compare(a, b).then(ia.cmp(ib)));
    results.into_iter().map(|(_, r)| r).collect()
}

fn compare(a: &EndpointResult, b: &EndpointResult) -> Ordering {
    match (a.is_success(), b.is_success()) {
        (true, true) => a.latency_ms.cmp(&b.latency_ms),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::evaluator::EvaluationPolicy;
    use crate::probe::prober::Prober;
    use crate::probe::testing::{Behavior, ScriptedTransport};

    fn coordinator(transport: Arc<ScriptedTransport>, concurrency: usize) -> ProbeCoordinator {
        let evaluator = EndpointEvaluator::new(Prober::new(transport), EvaluationPolicy::default());
        ProbeCoordinator::new(evaluator, concurrency)
    }

    fn ep(name: &str) -> Endpoint {
        Endpoint::new(name, format!("https://{}.example/simple", name))
    }

    #[test]
    fn test_rank_orders_successes_then_failures() {
        let a = ep("a");
        let b = ep("b");
        let c = ep("c");
        let d = ep("d");
        let ranked = rank(vec![
            (0, EndpointResult::failed(&a, ProbeStatus::Timeout)),
            (1, EndpointResult::success(&b, 80)),
            (2, EndpointResult::failed(&c, ProbeStatus::Error)),
            (3, EndpointResult::success(&d, 15)),
        ]);
        let names: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_rank_ties_follow_configuration_order() {
        let a = ep("a");
        let b = ep("b");
        let ranked = rank(vec![
            (1, EndpointResult::success(&b, 30)),
            (0, EndpointResult::success(&a, 30)),
        ]);
        assert_eq!(ranked[0].name, "a");
        assert_eq!(ranked[1].name, "b");
    }

    #[tokio::test]
    async fn test_empty_endpoint_list_is_configuration_error() {
        let coordinator = coordinator(Arc::new(ScriptedTransport::new()), 5);
        let err = coordinator.run_probe_sweep(&[]).await.unwrap_err();
        assert!(matches!(err, SweepError::Configuration(ConfigError::EmptyEndpoints)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_and_timing_out_sources() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("https://b.example/simple", Behavior::Timeout)
                .with("https://a.example/simple", Behavior::Ok { delay_ms: 10, status: 200 }),
        );
        let report = coordinator(transport, 5)
            .run_probe_sweep(&[ep("b"), ep("a")])
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].name, "a");
        assert_eq!(report.results[0].status, ProbeStatus::Success);
        assert!((10..=11).contains(&report.results[0].latency_ms));
        assert_eq!(report.results[1].name, "b");
        assert_eq!(report.results[1].status, ProbeStatus::Timeout);
        assert_eq!(report.results[1].latency_ms, -1);
        assert_eq!(report.fastest.as_ref(), Some(&report.results[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_evaluation_becomes_error_result() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with("https://boom.example/simple", Behavior::Panic)
                .with("https://ok.example/simple", Behavior::Ok { delay_ms: 3, status: 200 }),
        );
        let report = coordinator(transport, 5)
            .run_probe_sweep(&[ep("boom"), ep("ok")])
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].name, "ok");
        assert_eq!(report.results[1].name, "boom");
        assert_eq!(report.results[1].status, ProbeStatus::Error);
        assert_eq!(report.results[1].latency_ms, -1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reachable_sources_has_no_fastest() {
        let transport = Arc::new(ScriptedTransport::new());
        let report = coordinator(transport, 5)
            .run_probe_sweep(&[ep("x"), ep("y")])
            .await
            .unwrap();
        assert!(report.fastest.is_none());
        assert!(report.results.iter().all(|r| r.status == ProbeStatus::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_capped() {
        let endpoints: Vec<Endpoint> = (0..12).map(|i| ep(&format!("m{}", i))).collect();
        let mut transport = ScriptedTransport::new();
        for e in &endpoints {
            transport = transport.with(e.url.clone(), Behavior::Ok { delay_ms: 50, status: 200 });
        }
        let transport = Arc::new(transport);

        let report = coordinator(transport.clone(), 3)
            .run_probe_sweep(&endpoints)
            .await
            .unwrap();

        assert_eq!(report.results.len(), 12);
        assert_eq!(transport.max_in_flight(), 3);
    }
}
