use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{cors_layer, ApiError};
use crate::diagnosis::{DiagnosisNormalizer, DiagnosisRecord};

const DEFAULT_LANGUAGE: &str = "English";

#[derive(Clone)]
pub struct DiagnosisState {
    normalizer: DiagnosisNormalizer,
}

impl DiagnosisState {
    pub fn new(normalizer: DiagnosisNormalizer) -> Self {
        Self { normalizer }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    #[serde(rename = "imageData", default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Body of a successful `POST /diagnose`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: DiagnosisRecord,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosisResponse {
    /// Attach a fresh id and timestamp, refusing records that break the invariants.
    pub fn new(record: DiagnosisRecord) -> Result<Self, String> {
        record.check()?;
        Ok(Self {
            id: Uuid::new_v4(),
            record,
            timestamp: Utc::now(),
        })
    }
}

pub fn diagnosis_router(state: DiagnosisState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/diagnose", post(diagnose_plant))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors_layer())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Plant Diagnosis API is running" }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "plant-diagnosis-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn diagnose_plant(
    State(state): State<DiagnosisState>,
    Json(request): Json<DiagnoseRequest>,
) -> Result<Json<DiagnosisResponse>, ApiError> {
    let image_data = request
        .image_data
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ApiError::detail(StatusCode::BAD_REQUEST, "Image data is required"))?;
    let language = request
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let record = state.normalizer.diagnose(&image_data, &language).await;

    let response = DiagnosisResponse::new(record).map_err(|reason| {
        tracing::error!(%reason, "Diagnosis response rejected");
        ApiError::detail(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Diagnosis failed: {reason}"),
        )
    })?;
    Ok(Json(response))
}
