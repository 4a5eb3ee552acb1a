//! Mirror probing engine
//!
//! Measures HEAD latency against every configured mirror and ranks them.
//!
//! Layers, leaves first:
//! - [`Prober`]: one timed HEAD attempt through an injected [`HeadTransport`]
//! - [`EndpointEvaluator`]: warm-up plus N sequential attempts, folded into one result
//! - [`ProbeCoordinator`]: bounded-parallel sweep over all mirrors, ranked report
//! - [`ResultCache`]: newest report per hour bucket
//! - [`SweepRunner`]: detached, serialized sweeps that feed the cache and [`SweepMetrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! let transport = Arc::new(ReqwestTransport::new(&config.probe)?);
//! let evaluator = EndpointEvaluator::new(Prober::new(transport), (&config.probe).into());
//! let coordinator = ProbeCoordinator::new(evaluator, config.probe.concurrency);
//! let report = coordinator.run_probe_sweep(&config.sources).await?;
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod evaluator;
pub mod metrics;
pub mod prober;
pub mod runner;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transport;

pub use cache::*;
pub use config::*;
pub use coordinator::*;
pub use evaluator::*;
pub use metrics::*;
pub use prober::*;
pub use runner::*;
pub use transport::*;
