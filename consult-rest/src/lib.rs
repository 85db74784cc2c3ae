//! # Consult REST
//!
//! HTTP transport for consultation summary synthesis.
//!
//! Handles:
//! - `POST /api/ai/generate-summary` with axum
//! - startup configuration resolved from environment values
//! - REST-specific concerns (JSON error bodies, CORS, request tracing)
//!
//! Summaries are returned to the caller; persisting them is the portal's job.

#![warn(rust_2018_idioms)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use consult_core::{ConsultationInput, StructuredSummary, SummaryConfig, SummaryError};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_SUMMARY_DELAY_MS: u64 = 1500;

const MISSING_NOTES_MESSAGE: &str = "Doctor notes are required";

/// Server configuration resolved once at startup.
#[derive(Clone, Debug)]
pub struct RestConfig {
    pub addr: String,
    pub summary_delay: Duration,
    pub summary: SummaryConfig,
}

impl RestConfig {
    /// Build the configuration from raw environment values.
    ///
    /// Taking the values as arguments keeps process-wide environment reads in `main`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the delay is not a whole number of milliseconds, or
    /// - the follow-up timeframe cannot be parsed.
    pub fn from_env_values(
        addr: Option<String>,
        delay_ms: Option<String>,
        follow_up_timeframe: Option<String>,
    ) -> anyhow::Result<Self> {
        let summary_delay = match delay_ms {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid SUMMARY_DELAY_MS: {raw:?}"))?,
            ),
            None => Duration::from_millis(DEFAULT_SUMMARY_DELAY_MS),
        };

        let mut summary = SummaryConfig::default();
        if let Some(timeframe) = follow_up_timeframe {
            summary.follow_up_timeframe = timeframe;
        }
        summary
            .validate()
            .context("invalid SUMMARY_FOLLOW_UP_TIMEFRAME")?;

        Ok(Self {
            addr: addr.unwrap_or_else(|| DEFAULT_REST_ADDR.into()),
            summary_delay,
            summary,
        })
    }
}

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    summary_config: Arc<SummaryConfig>,
    summary_delay: Duration,
}

impl AppState {
    pub fn new(summary_config: SummaryConfig, summary_delay: Duration) -> Self {
        Self {
            summary_config: Arc::new(summary_config),
            summary_delay,
        }
    }

    pub fn from_config(cfg: &RestConfig) -> Self {
        Self::new(cfg.summary.clone(), cfg.summary_delay)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateSummaryRes {
    pub summary: StructuredSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorRes {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorRes>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

/// Build the REST router with all routes and layers attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ai/generate-summary", post(generate_summary))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint used by monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Consult REST API is alive".into(),
    })
}

/// Generate a structured summary from a consultation payload
///
/// # Returns
/// * `Ok(Json<GenerateSummaryRes>)` - The synthesized summary
/// * `Err((StatusCode, Json<ErrorRes>))` - Error body describing the failure
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the body is not a valid consultation payload, or
/// - `doctorNotes` is missing or blank.
///
/// Returns `500 Internal Server Error` if synthesis fails for any other reason.
#[axum::debug_handler]
async fn generate_summary(
    State(state): State<AppState>,
    payload: Result<Json<ConsultationInput>, JsonRejection>,
) -> Result<Json<GenerateSummaryRes>, ApiError> {
    let Json(input) = payload.map_err(|rejection| {
        tracing::warn!("Rejected summary payload: {}", rejection.body_text());
        api_error(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    if input.validate().is_err() {
        return Err(api_error(StatusCode::BAD_REQUEST, MISSING_NOTES_MESSAGE));
    }

    if !state.summary_delay.is_zero() {
        tokio::time::sleep(state.summary_delay).await;
    }

    match consult_synth::synthesize_with_config(&input, &state.summary_config) {
        Ok(summary) => {
            tracing::info!(
                referral_required = summary.referral_required,
                "Generated consultation summary"
            );
            Ok(Json(GenerateSummaryRes { summary }))
        }
        Err(SummaryError::InvalidInput(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, MISSING_NOTES_MESSAGE))
        }
        Err(e) => {
            tracing::error!("Generate summary error: {:?}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate summary",
            ))
        }
    }
}
