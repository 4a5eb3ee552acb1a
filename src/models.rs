use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A package index mirror to be latency-tested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Display name, unique within the configured set
    pub name: String,
    pub url: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Why a single probe attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    TransportError,
}

/// Outcome of one transport call. Never leaves the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeAttempt {
    Success { latency_ms: f64 },
    Failure(FailureKind),
}

impl ProbeAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeAttempt::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Success,
    Timeout,
    Error,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Success => "success",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Error => "error",
        }
    }
}

/// Latency sentinel for endpoints without a single successful attempt
pub const UNREACHABLE_LATENCY: i64 = -1;

/// Aggregated measurement of one endpoint.
///
/// Serialized as `{name, url, latency, status}`, the shape the web UI reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointResult {
    pub name: String,
    pub url: String,
    #[serde(rename = "latency")]
    pub latency_ms: i64,
    pub status: ProbeStatus,
}

impl EndpointResult {
    pub fn success(endpoint: &Endpoint, latency_ms: i64) -> Self {
        Self {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            // success requires a positive latency, even for sub-millisecond hosts
            latency_ms: latency_ms.max(1),
            status: ProbeStatus::Success,
        }
    }

    pub fn failed(endpoint: &Endpoint, status: ProbeStatus) -> Self {
        debug_assert!(status != ProbeStatus::Success);
        Self {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            latency_ms: UNREACHABLE_LATENCY,
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ProbeStatus::Success
    }
}

/// Ranked outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    #[serde(rename = "timestamp")]
    pub generated_at: DateTime<Utc>,
    pub results: Vec<EndpointResult>,
    pub fastest: Option<EndpointResult>,
}

impl ProbeReport {
    /// Build a report from results already in ranking order.
    pub fn from_ranked(generated_at: DateTime<Utc>, results: Vec<EndpointResult>) -> Self {
        let fastest = results.first().filter(|r| r.is_success()).cloned();
        Self {
            generated_at,
            results,
            fastest,
        }
    }

    pub fn reachable_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_result_wire_shape() {
        let ep = Endpoint::new("Tuna", "https://pypi.tuna.tsinghua.edu.cn/simple");
        let value = serde_json::to_value(EndpointResult::success(&ep, 42)).unwrap();
        assert_eq!(value["name"], "Tuna");
        assert_eq!(value["latency"], 42);
        assert_eq!(value["status"], "success");

        let value = serde_json::to_value(EndpointResult::failed(&ep, ProbeStatus::Timeout)).unwrap();
        assert_eq!(value["latency"], -1);
        assert_eq!(value["status"], "timeout");
    }

    #[test]
    fn test_success_latency_is_positive() {
        let ep = Endpoint::new("local", "http://127.0.0.1/simple");
        assert_eq!(EndpointResult::success(&ep, 0).latency_ms, 1);
    }

    #[test]
    fn test_fastest_only_when_first_is_success() {
        let a = Endpoint::new("a", "https://a.example/simple");
        let b = Endpoint::new("b", "https://b.example/simple");

        let report = ProbeReport::from_ranked(
            Utc::now(),
            vec![
                EndpointResult::failed(&a, ProbeStatus::Error),
                EndpointResult::failed(&b, ProbeStatus::Timeout),
            ],
        );
        assert!(report.fastest.is_none());

        let report = ProbeReport::from_ranked(
            Utc::now(),
            vec![
                EndpointResult::success(&b, 12),
                EndpointResult::failed(&a, ProbeStatus::Error),
            ],
        );
        assert_eq!(report.fastest.as_ref().map(|r| r.name.as_str()), Some("b"));
        assert_eq!(report.reachable_count(), 1);
    }
}
