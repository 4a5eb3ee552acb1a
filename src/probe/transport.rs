//! HTTP HEAD transport used by the prober.
//!
//! The probe engine only needs "send a HEAD with this timeout, tell me the status
//! or why it failed". Production uses [`ReqwestTransport`]; tests inject scripted
//! implementations of [`HeadTransport`].

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{redirect, Client};
use thiserror::Error;

use super::config::ProbeConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait HeadTransport: Send + Sync {
    /// Issue one HEAD request, following redirects, and return the final status code.
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, TransportError>;
}

/// reqwest-backed transport sharing one connection pool across all probes
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .connect_timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HeadTransport for ReqwestTransport {
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, TransportError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;
        Ok(response.status().as_u16())
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Other(err.to_string())
    }
}
