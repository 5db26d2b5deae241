use std::net::SocketAddr;
use std::sync::Arc;

use crop_service_rs::config::YieldConfig;
use crop_service_rs::logging::init_tracing;
use crop_service_rs::model::YieldPredictor;
use crop_service_rs::server::{prediction_router, ModelStatus};
use crop_service_rs::utils::ensure_files_exist;

async fn load_predictor(config: &YieldConfig) -> anyhow::Result<YieldPredictor> {
    ensure_files_exist(config).await?;
    let predictor = YieldPredictor::load(
        &config.model_path,
        &config.features_path,
        config.scaler_path.as_deref(),
    )?;
    Ok(predictor)
}

/// Crop yield prediction HTTP service.
///
/// A model that fails to load does not stop the process; `/health` and
/// `/predict` report the failure instead.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = YieldConfig::from_env()?;
    let status = match load_predictor(&config).await {
        Ok(predictor) => {
            tracing::info!("Model loaded successfully. Server is ready.");
            ModelStatus::Loaded(Arc::new(predictor))
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to load model on startup");
            ModelStatus::Unavailable(err.to_string())
        }
    };

    let app = prediction_router(status, config.body_limit_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
