//! Turns free-form model output into a [`DiagnosisRecord`].
//!
//! [`DiagnosisNormalizer::diagnose`] never fails. Every error on the way
//! (bad base64, provider failure, malformed or incomplete JSON) is logged and
//! folded into the localized fallback record.

use std::sync::Arc;

use base64::Engine as _;
use serde_json::{Map, Value};

use super::fallback::fallback_record;
use super::prompt::diagnosis_prompt;
use super::record::{clamp_confidence, DiagnosisRecord};
use crate::provider::{ImageInput, ModelProvider, ProviderError};

const REQUIRED_FIELDS: [&str; 6] = [
    "disease_name",
    "description",
    "symptoms",
    "treatment",
    "prevention",
    "confidence",
];

const DEFAULT_MIME: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    #[error("invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("image data is empty")]
    EmptyImage,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Invalid AI response format")]
    InvalidFormat(#[source] serde_json::Error),
    #[error("Invalid AI response format")]
    NotAnObject,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("field {field} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Diagnosis entry point shared by all requests.
#[derive(Clone)]
pub struct DiagnosisNormalizer {
    provider: Arc<dyn ModelProvider>,
}

impl DiagnosisNormalizer {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Diagnose a base64 image (optionally data-URI prefixed).
    pub async fn diagnose(&self, image_data: &str, language: &str) -> DiagnosisRecord {
        match self.try_diagnose(image_data, language).await {
            Ok(record) => {
                tracing::info!(
                    disease = %record.disease_name,
                    confidence = record.confidence,
                    "Successfully diagnosed"
                );
                record
            }
            Err(err) => {
                match &err {
                    DiagnosisError::InvalidFormat(source) => {
                        tracing::error!(error = %source, "Failed to parse AI response as JSON")
                    }
                    other => tracing::error!(error = %other, "AI diagnosis failed"),
                }
                fallback_record(language, &err.to_string())
            }
        }
    }

    async fn try_diagnose(
        &self,
        image_data: &str,
        language: &str,
    ) -> Result<DiagnosisRecord, DiagnosisError> {
        let image = decode_image(image_data)?;
        let prompt = diagnosis_prompt(language);

        tracing::info!(
            language,
            mime_type = %image.mime_type,
            image_size = image.bytes.len(),
            "Calling Gemini API for plant diagnosis"
        );
        let text = self.provider.generate(&prompt, &image).await?;
        parse_diagnosis(&text)
    }
}

/// Decode image data, dropping any `data:<mime>;base64,` header.
pub fn decode_image(image_data: &str) -> Result<ImageInput, DiagnosisError> {
    let (header, payload) = match image_data.split_once(',') {
        Some((header, payload)) => (Some(header), payload),
        None => (None, image_data),
    };

    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Err(DiagnosisError::EmptyImage);
    }

    let mime_type = header
        .and_then(declared_mime)
        .unwrap_or_else(|| sniff_mime(&bytes).to_string());

    Ok(ImageInput { bytes, mime_type })
}

fn declared_mime(header: &str) -> Option<String> {
    let mime = header.trim().strip_prefix("data:")?.split(';').next()?.trim();
    mime.starts_with("image/").then(|| mime.to_ascii_lowercase())
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    use image::ImageFormat;

    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => DEFAULT_MIME,
    }
}

/// Remove a surrounding ```` ```json ```` fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    match text.strip_prefix("```json") {
        Some(rest) => {
            let rest = rest.trim();
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => text,
    }
}

/// Parse and validate the model's text into a record.
pub fn parse_diagnosis(text: &str) -> Result<DiagnosisRecord, DiagnosisError> {
    let value: Value =
        serde_json::from_str(strip_code_fence(text)).map_err(DiagnosisError::InvalidFormat)?;
    let Value::Object(fields) = value else {
        return Err(DiagnosisError::NotAnObject);
    };

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
        return Err(DiagnosisError::MissingField(*missing));
    }

    let disease_name = text_field(&fields, "disease_name")?;
    if disease_name.trim().is_empty() {
        return Err(DiagnosisError::InvalidField {
            field: "disease_name",
            expected: "a non-empty string",
        });
    }

    Ok(DiagnosisRecord {
        disease_name,
        description: text_field(&fields, "description")?,
        symptoms: symptom_list(&fields["symptoms"]),
        treatment: text_field(&fields, "treatment")?,
        prevention: text_field(&fields, "prevention")?,
        confidence: clamp_confidence(confidence_value(&fields["confidence"])),
    })
}

fn text_field(fields: &Map<String, Value>, field: &'static str) -> Result<String, DiagnosisError> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DiagnosisError::InvalidField {
            field,
            expected: "a string",
        }),
        None => Err(DiagnosisError::MissingField(field)),
    }
}

fn symptom_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(scalar_text)
            .collect(),
        scalar => vec![scalar_text(scalar)],
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn confidence_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
