use serde::{Deserialize, Serialize};

/// Reserved `disease_name` for a plant with no detected issue.
pub const HEALTHY_PLANT: &str = "Healthy Plant";

/// Structured diagnosis produced for a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub disease_name: String,
    pub description: String,
    pub symptoms: Vec<String>,
    /// Newline separated steps.
    pub treatment: String,
    /// Newline separated tips.
    pub prevention: String,
    pub confidence: f64,
}

impl DiagnosisRecord {
    /// Checks the invariants every record handed to a caller must hold.
    pub fn check(&self) -> Result<(), String> {
        if self.disease_name.trim().is_empty() {
            return Err("disease_name is empty".into());
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} is outside [0, 1]", self.confidence));
        }
        Ok(())
    }
}

/// Clamp a raw confidence into `[0.0, 1.0]`. NaN maps to `0.0`.
pub fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(confidence: f64) -> DiagnosisRecord {
        DiagnosisRecord {
            disease_name: "Leaf Rust".into(),
            description: "Orange pustules on the leaf underside.".into(),
            symptoms: vec!["Orange pustules".into()],
            treatment: "Remove infected leaves\nApply sulfur spray".into(),
            prevention: "Space plants for airflow".into(),
            confidence,
        }
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(clamp_confidence(-3.2), 0.0);
        assert_eq!(clamp_confidence(0.5), 0.5);
        assert_eq!(clamp_confidence(7.0), 1.0);
        assert_eq!(clamp_confidence(f64::INFINITY), 1.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn check_rejects_broken_records() {
        assert!(record(0.7).check().is_ok());
        assert!(record(1.2).check().is_err());
        assert!(record(f64::NAN).check().is_err());

        let mut unnamed = record(0.4);
        unnamed.disease_name = "  ".into();
        assert!(unnamed.check().is_err());
    }

    #[test]
    fn serializes_symptoms_as_array() {
        let value = serde_json::to_value(record(0.9)).unwrap();
        assert!(value["symptoms"].is_array());
        assert_eq!(value["confidence"], 0.9);
    }
}
