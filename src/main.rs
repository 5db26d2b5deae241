use std::net::SocketAddr;
use std::sync::Arc;

use crop_service_rs::config::DiagnosisConfig;
use crop_service_rs::diagnosis::DiagnosisNormalizer;
use crop_service_rs::logging::init_tracing;
use crop_service_rs::provider::GeminiClient;
use crop_service_rs::server::{diagnosis_router, DiagnosisState};

/// Plant diagnosis HTTP service.
///
/// Refuses to start without `GEMINI_API_KEY`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = DiagnosisConfig::from_env()?;
    let client = GeminiClient::new(&config.gemini)?;
    tracing::info!(
        model = %config.gemini.model,
        timeout = ?config.gemini.timeout,
        "Gemini client ready"
    );

    let normalizer = DiagnosisNormalizer::new(Arc::new(client));
    let app = diagnosis_router(DiagnosisState::new(normalizer), config.body_limit_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
