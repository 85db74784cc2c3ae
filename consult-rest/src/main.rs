//! Standalone REST API server binary.
//!
//! Serves the consultation summary endpoint used by the doctor portal.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use consult_rest::{router, AppState, RestConfig};

/// Main entry point for the consultation REST API server
///
/// # Environment Variables
/// - `CONSULT_REST_ADDR`: Server address (default: "0.0.0.0:5000")
/// - `SUMMARY_DELAY_MS`: Artificial processing delay before synthesis (default: 1500)
/// - `SUMMARY_FOLLOW_UP_TIMEFRAME`: Follow-up timeframe written into summaries (default: "2 weeks")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the environment holds an invalid setting,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("consult_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = RestConfig::from_env_values(
        std::env::var("CONSULT_REST_ADDR").ok(),
        std::env::var("SUMMARY_DELAY_MS").ok(),
        std::env::var("SUMMARY_FOLLOW_UP_TIMEFRAME").ok(),
    )?;

    tracing::info!("-- Starting consult REST API on {}", cfg.addr);

    let app = router(AppState::from_config(&cfg));
    let listener = tokio::net::TcpListener::bind(&cfg.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
