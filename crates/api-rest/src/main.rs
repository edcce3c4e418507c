//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, with OpenAPI/Swagger UI. Useful for development; the
//! workspace's main `mme-run` binary serves the same router.

use mme_api_rest::{build_service, router, AppState};
use mme_core::CoreConfig;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the MME REST API server
///
/// # Environment Variables
/// - `MME_REST_ADDR`: Server address (default: "0.0.0.0:9020")
/// - `PATIENT_DATA_DIR`, `MME_RESOLVE_GENES`, `MME_ENSEMBL_URL`, `MME_GENE_TIMEOUT_SECS`:
///   see [`CoreConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the storage directory cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mme_api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MME_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:9020".into());

    tracing::info!("-- Starting MME REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::from_env()?);
    let patient_service = tokio::task::spawn_blocking(move || build_service(cfg)).await??;

    let app = router(AppState { patient_service });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
