//! External multimodal model.
//!
//! [`ModelProvider`] is the only seam between the diagnosis flow and the
//! network. Production uses [`GeminiClient`]; tests substitute a stub.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;

/// Image payload forwarded to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request to model provider failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model provider returned no text (finish reason: {finish_reason})")]
    EmptyResponse { finish_reason: String },
    #[error("{0}")]
    Other(String),
}

/// Text completion over a prompt and one image. A single attempt; no retries.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn generate(&self, prompt: &str, image: &ImageInput) -> Result<String, ProviderError>;
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.api_base, config.model
            ),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, ProviderError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ProviderError::EmptyResponse {
                finish_reason: block_reason.unwrap_or_else(|| "NO_CANDIDATES".into()),
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse {
                finish_reason: candidate
                    .finish_reason
                    .unwrap_or_else(|| "UNKNOWN".into()),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn generate(&self, prompt: &str, image: &ImageInput) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::Text { text: prompt },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Gemini request rejected");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        tracing::debug!(
            elapsed_ms = %start.elapsed().as_millis(),
            candidates = parsed.candidates.len(),
            "Gemini response received"
        );
        parsed.into_text()
    }
}
