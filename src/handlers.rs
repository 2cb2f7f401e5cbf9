use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde_json::{Map, Value};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::error::PredictError;
use crate::features::FeatureRow;
use crate::models::{HealthResponse, PredictionResponse, WelcomeResponse};
use crate::AppState;

pub async fn home() -> HttpResponse {
    HttpResponse::Ok().json(WelcomeResponse::default())
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::healthy(state.feature_order.len()))
}

/// Body is read from the raw payload so that unparseable or oversized input
/// still gets the `{"error": ...}` shape instead of an extractor rejection.
pub async fn predict(
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, PredictError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id);

    match score(state, payload).instrument(span.clone()).await {
        Ok(response) => {
            span.in_scope(|| {
                debug!(
                    prediction = response.prediction,
                    message = response.message,
                    "prediction served"
                )
            });
            Ok(HttpResponse::Ok().json(response))
        }
        Err(err) => {
            span.in_scope(|| {
                warn!(client_error = err.is_client_error(), error = %err, "prediction failed")
            });
            Err(err)
        }
    }
}

async fn score(
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<PredictionResponse, PredictError> {
    let body = read_body(payload, state.body_limit).await?;
    let raw = parse_body(&body)?;
    let row = FeatureRow::assemble(&state.feature_order, &raw, &state.policy);

    let classifier = state.classifier.clone();
    let (row, class) = web::block(move || {
        let class = classifier.predict(&row);
        (row, class)
    })
    .await
    .map_err(|e| PredictError::Blocking(e.to_string()))?;

    Ok(PredictionResponse::new(class?, row))
}

async fn read_body(
    mut payload: web::Payload,
    limit: usize,
) -> Result<web::BytesMut, PredictError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| PredictError::Payload(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(PredictError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn parse_body(body: &[u8]) -> Result<Map<String, Value>, PredictError> {
    match serde_json::from_slice(body)? {
        Value::Object(map) => Ok(map),
        other => Err(PredictError::NotAnObject(json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_objects_only() {
        let map = parse_body(br#"{"age": 45}"#).unwrap();
        assert_eq!(map.get("age"), Some(&Value::from(45)));

        let err = parse_body(b"[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "request body must be a JSON object, got array");

        assert!(matches!(parse_body(b""), Err(PredictError::MalformedBody(_))));
        assert!(matches!(parse_body(b"age=45"), Err(PredictError::MalformedBody(_))));
    }
}
