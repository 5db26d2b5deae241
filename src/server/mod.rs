//! HTTP surfaces for the diagnosis and yield prediction services.

pub mod diagnosis;
pub mod prediction;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::ALLOWED_ORIGINS;

pub use diagnosis::{diagnosis_router, DiagnosisResponse, DiagnosisState};
pub use prediction::{prediction_router, ModelStatus, PredictionResponse};

/// Error returned by a handler, rendered as `{ <key>: <message> }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    key: &'static str,
    message: String,
}

impl ApiError {
    /// `{ "detail": .. }` body, used by the diagnosis service.
    pub fn detail(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            key: "detail",
            message: message.into(),
        }
    }

    /// `{ "error": .. }` body, used by the yield service.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            key: "error",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.to_string(), json!(self.message));
        (self.status, Json(body)).into_response()
    }
}

/// CORS restricted to the local development frontends.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(ALLOWED_ORIGINS.map(HeaderValue::from_static)))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
