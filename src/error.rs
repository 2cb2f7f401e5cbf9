use std::io;
use std::path::PathBuf;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Failures while loading the artifacts the service is started with.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a JSON list of field names: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("feature order is empty")]
    EmptyFeatureOrder,
    #[error("feature '{0}' appears more than once in the feature order")]
    DuplicateFeature(String),
    #[error("failed to load ONNX model {origin}: {message}")]
    Onnx { origin: String, message: String },
    #[error("model input '{0}' is not in the feature order")]
    UnknownInput(String),
    #[error("model input '{field}' has unsupported type {datum}")]
    UnsupportedInput { field: String, datum: String },
}

/// Failures raised by a classifier while scoring one row.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("could not convert string to float: '{value}'")]
    NotNumeric { field: String, value: String },
    #[error("field '{field}' holds a {kind}, expected a scalar")]
    NotScalar { field: String, kind: &'static str },
    #[error("expected an integer for '{field}', got {value}")]
    NotInteger { field: String, value: f64 },
    #[error("row has no value for model input '{0}'")]
    MissingField(String),
    #[error("model produced no output")]
    EmptyOutput,
    #[error("{0}")]
    Runtime(String),
}

/// Everything that can go wrong while serving `POST /predict`.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("{0}")]
    Scoring(#[from] ScoringError),
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("failed to read request body: {0}")]
    Payload(String),
    #[error("{0}")]
    Blocking(String),
}

impl PredictError {
    /// Whether the failure was caused by what the client sent.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictError::MalformedBody(_)
                | PredictError::NotAnObject(_)
                | PredictError::PayloadTooLarge(_)
                | PredictError::Payload(_)
                | PredictError::Scoring(ScoringError::NotNumeric { .. })
                | PredictError::Scoring(ScoringError::NotScalar { .. })
                | PredictError::Scoring(ScoringError::NotInteger { .. })
        )
    }
}

// Clients read the `error` member rather than the status, so failures stay 200.
impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_body_keeps_parser_message() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let expected = err.to_string();
        let err = PredictError::from(err);
        assert_eq!(err.to_string(), expected);
        assert!(err.is_client_error());
    }

    #[test]
    fn scoring_errors_render_without_prefix() {
        let err = PredictError::from(ScoringError::NotNumeric {
            field: "age".into(),
            value: "old".into(),
        });
        assert_eq!(err.to_string(), "could not convert string to float: 'old'");

        let err = PredictError::from(ScoringError::Runtime("shape mismatch".into()));
        assert_eq!(err.to_string(), "shape mismatch");
        assert!(!err.is_client_error());
    }

    #[test]
    fn oversized_body_names_the_limit() {
        let err = PredictError::PayloadTooLarge(1024);
        assert_eq!(err.to_string(), "request body exceeds 1024 bytes");
        assert!(err.is_client_error());
    }

    #[test]
    fn error_response_is_ok_status() {
        let err = PredictError::NotAnObject("array");
        assert_eq!(err.error_response().status(), StatusCode::OK);
    }
}
