use std::path::{Path, PathBuf};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::config::YieldConfig;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{} is missing and {env} is not set", .path.display())]
    NoSource { path: PathBuf, env: &'static str },
    #[error("invalid GITHUB_TOKEN format")]
    InvalidToken,
    #[error("failed to download {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to download {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    token: Option<&str>,
) -> Result<(), ArtifactError> {
    tracing::info!(url, path = %path.display(), "Downloading model artifact");

    let mut header_map = HeaderMap::new();
    if let Some(token) = token {
        let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ArtifactError::InvalidToken)?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));

    let request_err = |source| ArtifactError::Request {
        url: url.to_string(),
        source,
    };
    let response = client
        .get(url)
        .headers(header_map)
        .send()
        .await
        .map_err(request_err)?;

    if !response.status().is_success() {
        return Err(ArtifactError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(request_err)?;
    let write_err = |source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, bytes).await.map_err(write_err)
}

async fn ensure_file(
    client: &reqwest::Client,
    path: &Path,
    url: Option<&str>,
    env: &'static str,
    token: Option<&str>,
) -> Result<(), ArtifactError> {
    if path.exists() {
        return Ok(());
    }
    let url = url.ok_or_else(|| ArtifactError::NoSource {
        path: path.to_path_buf(),
        env,
    })?;
    download_file(client, url, path, token).await
}

/// Make sure the yield model and feature list are on disk, downloading them if needed.
pub async fn ensure_files_exist(config: &YieldConfig) -> Result<(), ArtifactError> {
    tracing::info!("Checking model...");
    let client = reqwest::Client::new();
    let token = config.github_token.as_deref();

    ensure_file(
        &client,
        &config.model_path,
        config.model_url.as_deref(),
        "YIELD_MODEL_URL",
        token,
    )
    .await?;
    ensure_file(
        &client,
        &config.features_path,
        config.features_url.as_deref(),
        "YIELD_FEATURES_URL",
        token,
    )
    .await
}
