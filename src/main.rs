//! Default binary for an MME node.
//!
//! Loads configuration from the environment (and a `.env` file if present), initialises
//! tracing, opens the patient store and serves the REST API.

use mme_api_rest::{build_service, router, AppState};
use mme_core::CoreConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the MME node
///
/// # Environment Variables
/// - `MME_REST_ADDR`: REST server address (default: "0.0.0.0:9020")
/// - `PATIENT_DATA_DIR`: Directory for patient data storage (default: "patient_data")
/// - `MME_RESOLVE_GENES`: Resolve gene references of added patients (default: true)
/// - `MME_ENSEMBL_URL`: Ensembl REST endpoint (default: "https://grch37.rest.ensembl.org")
/// - `MME_GENE_TIMEOUT_SECS`: Gene lookup timeout in seconds (default: 10)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mme_run=info".parse()?)
                .add_directive("mme_core=info".parse()?)
                .add_directive("mme_api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("MME_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:9020".into())
        .parse()?;

    let cfg = Arc::new(CoreConfig::from_env()?);
    tracing::info!(
        data_dir = %cfg.patient_data_dir().display(),
        resolve_genes = cfg.resolve_genes(),
        "++ Starting MME node REST on {}",
        rest_addr
    );

    // The Ensembl client is blocking and must be built off the async executor.
    let patient_service = tokio::task::spawn_blocking(move || build_service(cfg)).await??;
    let app = router(AppState { patient_service });

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
