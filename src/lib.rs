//! pipspeed backend library
//!
//! Probes a fixed set of PyPI mirrors, ranks them by HEAD latency and
//! generates pip configuration commands for the chosen one.

pub mod api;
pub mod error;
pub mod middleware;
pub mod models;
pub mod probe;
pub mod recommend;
