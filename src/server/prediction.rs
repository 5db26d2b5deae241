use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ApiError;
use crate::model::YieldPredictor;

/// Outcome of loading the yield model at startup.
pub enum ModelStatus {
    Loaded(Arc<YieldPredictor>),
    /// The service keeps running and reports the failure on every request.
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_yield: f64,
}

pub fn prediction_router(status: ModelStatus, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .route("/health", get(health_check))
        .with_state(Arc::new(status))
}

async fn health_check(State(status): State<Arc<ModelStatus>>) -> Response {
    match status.as_ref() {
        ModelStatus::Loaded(_) => {
            Json(json!({ "status": "ok", "model_loaded": true })).into_response()
        }
        ModelStatus::Unavailable(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "model_loaded": false,
                "message": "Model could not be loaded on startup.",
            })),
        )
            .into_response(),
    }
}

async fn predict_handler(
    State(status): State<Arc<ModelStatus>>,
    body: Option<Json<Value>>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let predictor = match status.as_ref() {
        ModelStatus::Loaded(predictor) => predictor,
        ModelStatus::Unavailable(reason) => {
            tracing::warn!(%reason, "Prediction requested while model is unavailable");
            return Err(ApiError::error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Model is not available due to a startup error.",
            ));
        }
    };

    let features = match body {
        Some(Json(Value::Object(features))) if !features.is_empty() => features,
        _ => {
            return Err(ApiError::error(
                StatusCode::BAD_REQUEST,
                "Invalid input: No JSON data received.",
            ))
        }
    };

    tracing::info!(features = features.len(), "Received prediction request");
    match predictor.predict_single(&features) {
        Ok(predicted_yield) => {
            tracing::info!(predicted_yield, "Prediction successful");
            Ok(Json(PredictionResponse { predicted_yield }))
        }
        Err(err) if err.is_input_error() => {
            tracing::warn!(error = %err, "Bad prediction request");
            Err(ApiError::error(
                StatusCode::BAD_REQUEST,
                format!("Invalid input: {err}"),
            ))
        }
        Err(err) => {
            tracing::error!(error = %err, "Prediction failed");
            Err(ApiError::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An unexpected error occurred: {err}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PredictError, Regressor};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct SumRegressor;

    impl Regressor for SumRegressor {
        fn predict(&self, row: &[f32]) -> Result<f64, PredictError> {
            Ok(row.iter().map(|&x| x as f64).sum())
        }
    }

    struct BrokenRegressor;

    impl Regressor for BrokenRegressor {
        fn predict(&self, _row: &[f32]) -> Result<f64, PredictError> {
            Err(PredictError::Inference("tree index out of range".into()))
        }
    }

    fn loaded(regressor: Box<dyn Regressor>) -> ModelStatus {
        let features = vec!["rainfall".to_string(), "temperature".to_string()];
        ModelStatus::Loaded(Arc::new(YieldPredictor::new(features, None, regressor).unwrap()))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn predicts_yield() {
        let app = prediction_router(loaded(Box::new(SumRegressor)), 1024 * 1024);
        let response = app
            .oneshot(post_json(r#"{"rainfall": 2.5, "temperature": 30}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "predicted_yield": 32.5 }));
    }

    #[tokio::test]
    async fn missing_features_are_bad_requests() {
        let app = prediction_router(loaded(Box::new(SumRegressor)), 1024 * 1024);
        let response = app.oneshot(post_json(r#"{"rainfall": 2.5}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid input: Missing features: temperature" })
        );
    }

    #[tokio::test]
    async fn empty_or_non_object_body_is_rejected() {
        for body in ["{}", "[1, 2]", "not json"] {
            let app = prediction_router(loaded(Box::new(SumRegressor)), 1024 * 1024);
            let response = app.oneshot(post_json(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(
                body_json(response).await,
                json!({ "error": "Invalid input: No JSON data received." })
            );
        }
    }

    #[tokio::test]
    async fn regressor_failure_is_internal_error() {
        let app = prediction_router(loaded(Box::new(BrokenRegressor)), 1024 * 1024);
        let response = app
            .oneshot(post_json(r#"{"rainfall": 1, "temperature": 2}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unavailable_model_degrades() {
        let app = prediction_router(ModelStatus::Unavailable("missing file".into()), 1024);
        let response = app
            .clone()
            .oneshot(post_json(r#"{"rainfall": 1, "temperature": 2}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(health).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["model_loaded"], false);
    }

    #[tokio::test]
    async fn health_reports_loaded_model() {
        let app = prediction_router(loaded(Box::new(SumRegressor)), 1024);
        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(health).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok", "model_loaded": true }));
    }
}
