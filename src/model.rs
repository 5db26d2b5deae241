use std::fs;
use std::path::{Path, PathBuf};

use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use serde::Deserialize;
use serde_json::{Map, Value};

#[cfg(feature = "tensorflow")]
mod tf;
#[cfg(feature = "tensorflow")]
pub use tf::TfRegressor;

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("model file not found at: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error loading model from {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("invalid scaler: {0}")]
    InvalidScaler(String),
    #[error("feature list is empty")]
    NoFeatures,
    #[error("Missing features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
    #[error("feature {name} must be a number")]
    InvalidFeature { name: String },
    #[error("error during prediction: {0}")]
    Inference(String),
}

impl PredictError {
    /// Errors caused by the caller's feature payload.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PredictError::MissingFeatures(_) | PredictError::InvalidFeature { .. }
        )
    }
}

/// A fitted regression model over one row of features.
pub trait Regressor: Send + Sync {
    fn predict(&self, row: &[f32]) -> Result<f64, PredictError>;
}

/// Gradient boosted trees saved with `gbdt`.
pub struct GbdtRegressor {
    model: GBDT,
}

impl GbdtRegressor {
    pub fn load(path: &Path) -> Result<Self, PredictError> {
        let path_str = path.to_str().ok_or_else(|| PredictError::ModelLoad {
            path: path.to_path_buf(),
            reason: "path is not valid UTF-8".into(),
        })?;
        let model = GBDT::load_model(path_str).map_err(|e| PredictError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { model })
    }
}

impl Regressor for GbdtRegressor {
    fn predict(&self, row: &[f32]) -> Result<f64, PredictError> {
        let sample = vec![Data::new_test_data(row.to_vec(), None)];
        let predictions = self.model.predict(&sample);
        predictions
            .first()
            .map(|&p| p as f64)
            .ok_or_else(|| PredictError::Inference("model returned no prediction".into()))
    }
}

/// Load the regressor matching the artifact's format.
pub fn load_regressor(path: &Path) -> Result<Box<dyn Regressor>, PredictError> {
    if !path.exists() {
        return Err(PredictError::NotFound(path.to_path_buf()));
    }

    let is_frozen_graph = path.extension().and_then(|e| e.to_str()) == Some("pb");
    if is_frozen_graph {
        #[cfg(feature = "tensorflow")]
        return Ok(Box::new(TfRegressor::load(path)?));

        #[cfg(not(feature = "tensorflow"))]
        return Err(PredictError::ModelLoad {
            path: path.to_path_buf(),
            reason: "built without the `tensorflow` feature".into(),
        });
    }

    Ok(Box::new(GbdtRegressor::load(path)?))
}

/// Standardization fitted at training time: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    pub fn load(path: &Path) -> Result<Self, PredictError> {
        let raw = fs::read_to_string(path).map_err(|source| PredictError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| PredictError::InvalidScaler(e.to_string()))
    }

    fn transform(&self, row: &mut [f64]) {
        for ((x, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            let scale = if *scale == 0.0 { 1.0 } else { *scale };
            *x = (*x - mean) / scale;
        }
    }
}

/// Reads one feature name per line; blank lines and `#` comments are skipped.
pub fn read_feature_list(path: &Path) -> Result<Vec<String>, PredictError> {
    let raw = fs::read_to_string(path).map_err(|source| PredictError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Crop yield predictor over a fixed, ordered feature set.
pub struct YieldPredictor {
    feature_cols: Vec<String>,
    scaler: Option<StandardScaler>,
    regressor: Box<dyn Regressor>,
}

impl YieldPredictor {
    pub fn new(
        feature_cols: Vec<String>,
        scaler: Option<StandardScaler>,
        regressor: Box<dyn Regressor>,
    ) -> Result<Self, PredictError> {
        if feature_cols.is_empty() {
            return Err(PredictError::NoFeatures);
        }
        if let Some(scaler) = &scaler {
            if scaler.mean.len() != feature_cols.len() || scaler.scale.len() != feature_cols.len() {
                return Err(PredictError::InvalidScaler(format!(
                    "expected {} entries in mean and scale, got {} and {}",
                    feature_cols.len(),
                    scaler.mean.len(),
                    scaler.scale.len()
                )));
            }
        }

        Ok(Self {
            feature_cols,
            scaler,
            regressor,
        })
    }

    /// Load the model, feature list and optional scaler from disk.
    pub fn load(
        model_path: &Path,
        features_path: &Path,
        scaler_path: Option<&Path>,
    ) -> Result<Self, PredictError> {
        let regressor = load_regressor(model_path)?;
        let feature_cols = read_feature_list(features_path)?;
        let scaler = scaler_path.map(StandardScaler::load).transpose()?;

        tracing::info!(
            model = %model_path.display(),
            features = feature_cols.len(),
            scaled = scaler.is_some(),
            "Yield model loaded"
        );
        Self::new(feature_cols, scaler, regressor)
    }

    /// Predict for a single sample keyed by feature name. Extra keys are ignored.
    pub fn predict_single(&self, features: &Map<String, Value>) -> Result<f64, PredictError> {
        let missing: Vec<String> = self
            .feature_cols
            .iter()
            .filter(|name| !features.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::MissingFeatures(missing));
        }

        let mut row = self
            .feature_cols
            .iter()
            .map(|name| feature_value(name, &features[name.as_str()]))
            .collect::<Result<Vec<f64>, _>>()?;

        if let Some(scaler) = &self.scaler {
            scaler.transform(&mut row);
        }

        let row: Vec<f32> = row.into_iter().map(|x| x as f32).collect();
        self.regressor.predict(&row)
    }
}

fn feature_value(name: &str, value: &Value) -> Result<f64, PredictError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| PredictError::InvalidFeature {
            name: name.to_string(),
        })
}
