//! Runtime configuration.
//!
//! Everything here is resolved once at process startup and then passed into the
//! services. Request handlers never read the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Origins allowed to call the diagnosis service from a browser.
pub const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "https://localhost:3000",
];

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required. Check the .env file in the project root.")]
    Missing(&'static str),
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Settings for the external multimodal model.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    /// `None` leaves the external call unbounded.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Configuration for the diagnosis HTTP service.
#[derive(Debug, Clone)]
pub struct DiagnosisConfig {
    pub gemini: GeminiConfig,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl DiagnosisConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let timeout_secs: u64 = parse_or(&lookup, "GEMINI_TIMEOUT_SECS", 15, "a whole number of seconds")?;

        let gemini = GeminiConfig {
            api_key,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            api_base: lookup("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.into()),
            temperature: parse_or(&lookup, "GEMINI_TEMPERATURE", 0.3, "a number")?,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        };

        Ok(Self {
            gemini,
            port: parse_or(&lookup, "PORT", 8000, "a valid number between 0 and 65535")?,
            body_limit_bytes: body_limit(&lookup, 10)?,
        })
    }
}

/// Configuration for the yield prediction service and CLI.
#[derive(Debug, Clone)]
pub struct YieldConfig {
    pub model_path: PathBuf,
    pub features_path: PathBuf,
    pub scaler_path: Option<PathBuf>,
    pub model_url: Option<String>,
    pub features_url: Option<String>,
    pub github_token: Option<String>,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl YieldConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            model_path: lookup("YIELD_MODEL_PATH")
                .unwrap_or_else(|| "./model/yield_model.json".into())
                .into(),
            features_path: lookup("YIELD_FEATURES_PATH")
                .unwrap_or_else(|| "./model/feature_list.txt".into())
                .into(),
            scaler_path: lookup("YIELD_SCALER_PATH").map(PathBuf::from),
            model_url: lookup("YIELD_MODEL_URL"),
            features_url: lookup("YIELD_FEATURES_URL"),
            github_token: lookup("GITHUB_TOKEN"),
            port: parse_or(&lookup, "PORT", 8080, "a valid number between 0 and 65535")?,
            body_limit_bytes: body_limit(&lookup, 5)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}

fn body_limit<F>(lookup: &F, default_mb: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mb: usize = parse_or(lookup, "BODY_LIMIT_MB", default_mb, "a valid integer")?;
    Ok(mb * 1024 * 1024)
}
