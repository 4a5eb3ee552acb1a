//! Error taxonomy.
//!
//! Per-attempt and per-endpoint failures never show up here: they are folded into
//! [`crate::models::ProbeStatus`] by the evaluator and coordinator. Only problems with
//! the endpoint list or with an incoming request reach a caller as an error.

use thiserror::Error;

/// Endpoint list or probe settings are unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint list is empty")]
    EmptyEndpoints,

    #[error("duplicate endpoint name: {0}")]
    DuplicateName(String),

    #[error("endpoint {name:?} has an invalid url {url:?}")]
    InvalidUrl { name: String, url: String },

    #[error("invalid probe setting `{field}`: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// A sweep could not run at all.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("sweep task failed: {0}")]
    Internal(String),
}

/// A recommendation request could not be served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("missing `source` parameter")]
    MissingIdentifier,

    #[error("source not found: {0}")]
    NotFound(String),
}
