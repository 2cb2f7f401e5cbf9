use serde::Serialize;

use crate::error::PredictError;
use crate::features::FeatureRow;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Cardiovascular Disease Prediction API. Use POST /predict to get predictions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    Detected,
    NotDetected,
}

impl Diagnosis {
    /// Class 1 is a positive finding; every other label reads as negative.
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            Diagnosis::Detected
        } else {
            Diagnosis::NotDetected
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Diagnosis::Detected => "Cardiovascular Disease Detected",
            Diagnosis::NotDetected => "No Cardiovascular Disease",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
}

impl Default for WelcomeResponse {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: i64,
    pub message: &'static str,
    pub features_used: FeatureRow,
}

impl PredictionResponse {
    pub fn new(prediction: i64, features_used: FeatureRow) -> Self {
        Self {
            prediction,
            message: Diagnosis::from_class(prediction).message(),
            features_used,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&PredictError> for ErrorResponse {
    fn from(err: &PredictError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub features: usize,
}

impl HealthResponse {
    pub fn healthy(features: usize) -> Self {
        Self {
            status: "healthy",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_one_is_detected() {
        assert_eq!(Diagnosis::from_class(1).message(), "Cardiovascular Disease Detected");
        assert_eq!(Diagnosis::from_class(0).message(), "No Cardiovascular Disease");
        assert_eq!(Diagnosis::from_class(7), Diagnosis::NotDetected);
    }
}
