use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use crop_service_rs::diagnosis::DiagnosisNormalizer;
use crop_service_rs::provider::{ImageInput, ModelProvider, ProviderError};
use crop_service_rs::server::{diagnosis_router, DiagnosisState};

/// Minimal JFIF header; enough for format detection.
const SMALL_JPEG: [u8; 20] = [
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00,
];

enum Reply {
    Text(String),
    Fail(String),
}

struct ScriptedModel(Reply);

#[async_trait]
impl ModelProvider for ScriptedModel {
    async fn generate(&self, _prompt: &str, image: &ImageInput) -> Result<String, ProviderError> {
        assert_eq!(image.mime_type, "image/jpeg");
        match &self.0 {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(ProviderError::Other(message.clone())),
        }
    }
}

fn app(reply: Reply) -> Router {
    let normalizer = DiagnosisNormalizer::new(Arc::new(ScriptedModel(reply)));
    diagnosis_router(DiagnosisState::new(normalizer), 10 * 1024 * 1024)
}

fn diagnose_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/diagnose")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn jpeg_data_uri() -> String {
    format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(SMALL_JPEG)
    )
}

fn upstream_diagnosis() -> Value {
    json!({
        "disease_name": "Powdery Mildew",
        "description": "White powdery fungal growth on the upper leaf surface.",
        "symptoms": ["White patches on leaves", "Curling leaves"],
        "treatment": "Remove affected leaves\nSpray diluted milk solution\nImprove air circulation",
        "prevention": "Avoid overhead watering\nSpace plants widely",
        "confidence": 0.87
    })
}

#[tokio::test]
async fn diagnose_echoes_model_diagnosis() {
    let upstream = upstream_diagnosis();
    let app = app(Reply::Text(format!("```json\n{upstream}\n```")));

    let before = Utc::now();
    let response = app
        .oneshot(diagnose_request(json!({
            "imageData": jpeg_data_uri(),
            "language": "English"
        })))
        .await
        .unwrap();
    let after = Utc::now();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    for field in [
        "disease_name",
        "description",
        "symptoms",
        "treatment",
        "prevention",
        "confidence",
    ] {
        assert_eq!(body[field], upstream[field], "field {field}");
    }

    let id = body["id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok(), "id {id}");

    let timestamp: DateTime<Utc> = body["timestamp"].as_str().unwrap().parse().unwrap();
    assert!(timestamp >= before && timestamp <= after);
}

#[tokio::test]
async fn each_request_gets_a_fresh_id() {
    let reply = || Reply::Text(upstream_diagnosis().to_string());
    let request = || diagnose_request(json!({ "imageData": jpeg_data_uri() }));

    let first = body_json(app(reply()).oneshot(request()).await.unwrap()).await;
    let second = body_json(app(reply()).oneshot(request()).await.unwrap()).await;
    assert_ne!(first["id"], second["id"]);
}

#[tokio::test]
async fn missing_image_data_is_bad_request() {
    for body in [json!({ "language": "English" }), json!({ "imageData": "" })] {
        let response = app(Reply::Text(String::new()))
            .oneshot(diagnose_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "detail": "Image data is required" })
        );
    }
}

#[tokio::test]
async fn upstream_failure_is_a_zero_confidence_record() {
    let response = app(Reply::Fail("API key not valid".into()))
        .oneshot(diagnose_request(json!({
            "imageData": jpeg_data_uri(),
            "language": "hindi"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["disease_name"], "विश्लेषण असफल");
    assert_eq!(body["confidence"], 0.0);
    assert_eq!(body["symptoms"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn garbage_image_data_still_returns_a_record() {
    let response = app(Reply::Text(upstream_diagnosis().to_string()))
        .oneshot(diagnose_request(json!({ "imageData": "!!not base64!!" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["disease_name"], "Analysis Failed");
    assert_eq!(body["confidence"], 0.0);
}

#[tokio::test]
async fn blank_image_data_is_diagnosed_as_a_failure() {
    let response = app(Reply::Text(upstream_diagnosis().to_string()))
        .oneshot(diagnose_request(json!({ "imageData": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["disease_name"], "Analysis Failed");
    assert_eq!(body["confidence"], 0.0);
}

#[tokio::test]
async fn health_and_root_respond() {
    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app(Reply::Text(String::new())).oneshot(health).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let root = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app(Reply::Text(String::new())).oneshot(root).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn cors_allows_local_frontend_only() {
    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/diagnose")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let response = app(Reply::Text(String::new()))
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let response = app(Reply::Text(String::new()))
        .oneshot(preflight("http://evil.example"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
