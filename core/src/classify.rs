//! Mapping from HTTP status and body to a request outcome.
//!
//! `classify` is a pure function of its inputs: the same status, body and
//! expectation always produce the same result.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult, ParameterError};

/// A successful response, with or without a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Empty,
}

#[derive(Deserialize)]
struct ErrorBody<T> {
    detail: T,
}

/// Classify a response.
///
/// 5xx bodies are never parsed since servers commonly answer with HTML
/// there. A 204, or any 2xx when `expect_empty` is set, ignores the body.
pub fn classify(status: u16, body: &str, expect_empty: bool) -> ApiResult<Outcome> {
    if status >= 500 {
        return Err(ApiError::Server { code: status });
    }
    if status == 204 || (status < 300 && expect_empty) {
        return Ok(Outcome::Empty);
    }
    if status < 400 {
        let data = serde_json::from_str(body)
            .map_err(|e| ApiError::protocol(status, format!("invalid JSON body: {e}")))?;
        return Ok(Outcome::Success(data));
    }
    if status == 422 {
        let parsed: ErrorBody<Vec<ParameterError>> = serde_json::from_str(body)
            .map_err(|e| ApiError::protocol(status, format!("invalid validation body: {e}")))?;
        return Err(ApiError::Validation {
            code: status,
            issues: parsed.detail,
        });
    }
    let parsed: ErrorBody<Value> = serde_json::from_str(body)
        .map_err(|e| ApiError::protocol(status, format!("invalid error body: {e}")))?;
    let detail = match parsed.detail {
        Value::String(s) => s,
        other => other.to_string(),
    };
    Err(ApiError::Client {
        code: status,
        detail,
    })
}
