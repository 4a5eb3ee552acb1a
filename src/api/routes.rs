use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::{ResolveError, SweepError};
use crate::models::{Endpoint, EndpointResult, ProbeReport};
use crate::probe::{bucket_key, SweepRunner};
use crate::recommend::{Commands, Recommender};

pub const SERVICE_NAME: &str = "pipspeed";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<SweepRunner>,
    pub recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(runner: Arc<SweepRunner>) -> Self {
        let recommender = Arc::new(Recommender::new(runner.endpoints().clone()));
        Self {
            runner,
            recommender,
        }
    }
}

// ===== Route Handlers =====

/// Run a full sweep and return the ranked sources
pub async fn probe_sweep(State(state): State<AppState>) -> Result<Json<SweepResponse>, ApiError> {
    info!("Speed test requested");
    let report = state.runner.run_detached().await?;
    Ok(Json(SweepResponse::from(report)))
}

/// Most recent cached report, or the one for `?bucket=YYYYMMDDHH`
pub async fn cached_report(
    State(state): State<AppState>,
    Query(params): Query<CachedQuery>,
) -> Result<Json<CachedResponse>, ApiError> {
    let cache = state.runner.cache();
    let report = match params.bucket.as_deref() {
        Some(bucket) => cache.get(bucket),
        None => cache.latest(),
    };
    let report = report.ok_or_else(|| {
        ApiError::NotFound(match params.bucket {
            Some(bucket) => format!("No cached report for bucket {}", bucket),
            None => "No cached report yet".to_string(),
        })
    })?;

    Ok(Json(CachedResponse {
        bucket: bucket_key(report.generated_at),
        report: SweepResponse::from(report),
    }))
}

/// Generate pip commands for one source, matched by name or url
pub async fn resolve_source(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ResolveResponse>, ApiError> {
    // unparseable bodies are treated like a missing `source`
    let request: ResolveRequest = serde_json::from_slice(&body).unwrap_or_default();
    let recommendation = state.recommender.resolve(&request.source)?;
    info!(source = %recommendation.source.name, "Generated pip commands");

    Ok(Json(ResolveResponse {
        success: true,
        source: recommendation.source,
        commands: recommendation.commands,
    }))
}

pub async fn list_sources(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "sources": state.runner.endpoints().as_ref(),
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        timestamp: Utc::now(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.runner.metrics().to_prometheus(),
    )
}

// ===== Request/Response Types =====

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct CachedQuery {
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    pub success: bool,
    pub sources: Vec<EndpointResult>,
    pub fastest: Option<EndpointResult>,
    pub timestamp: DateTime<Utc>,
}

impl From<ProbeReport> for SweepResponse {
    fn from(report: ProbeReport) -> Self {
        Self {
            success: true,
            sources: report.results,
            fastest: report.fastest,
            timestamp: report.generated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CachedResponse {
    pub bucket: String,
    #[serde(flatten)]
    pub report: SweepResponse,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub success: bool,
    pub source: Endpoint,
    pub commands: Commands,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Sweep(SweepError),
    Resolve(ResolveError),
    NotFound(String),
}

impl From<SweepError> for ApiError {
    fn from(err: SweepError) -> Self {
        ApiError::Sweep(err)
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        ApiError::Resolve(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Sweep(err) => {
                tracing::error!("Speed test failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": err.to_string(),
                        "message": "Speed test failed, please retry later",
                    }),
                )
            }
            ApiError::Resolve(err) => (
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "error": err.to_string(),
                }),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "error": msg,
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
