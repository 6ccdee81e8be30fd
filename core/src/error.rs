//! Error types for the Polympics API client.
//!
//! # Design
//! Every failure a request can end in is one variant of `ApiError`, so
//! callers branch with a `match` rather than downcasting. Transport failures
//! are kept apart from classified API errors: the former mean the request
//! never produced a status, the latter carry the status the API returned.

use std::fmt::Write as _;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// A single parameter problem reported by a 422 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterError {
    /// Path to the offending parameter, e.g. `["body", "name"]`. List
    /// indices such as the `0` in `["body", "accounts", 0]` are kept as text.
    #[serde(rename = "loc", deserialize_with = "location_segments")]
    pub location: Vec<String>,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocationSegment {
    Key(String),
    Index(i64),
}

fn location_segments<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let segments = Vec::<LocationSegment>::deserialize(deserializer)?;
    Ok(segments
        .into_iter()
        .map(|segment| match segment {
            LocationSegment::Key(key) => key,
            LocationSegment::Index(index) => index.to_string(),
        })
        .collect())
}

/// The injected transport could not complete the exchange.
#[derive(Error, Debug)]
#[error("transport failed: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors returned by `Client` operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never got a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned 5xx.
    #[error("Polympics server error: {code}")]
    Server { code: u16 },

    /// The server returned no content where a body was required.
    #[error("expected a response body but the server returned none")]
    EmptyResponse,

    /// The server rejected the request parameters (422).
    #[error("{}", describe_issues(.code, .issues))]
    Validation {
        code: u16,
        issues: Vec<ParameterError>,
    },

    /// Any other 4xx.
    #[error("{code}: {detail}")]
    Client { code: u16, detail: String },

    /// The response did not have the shape the protocol promises.
    #[error("malformed response (status {status}): {message}")]
    Protocol { status: u16, message: String },

    /// The response JSON did not match the expected type.
    #[error("unexpected response shape: {0}")]
    Decode(String),

    /// Request parameters could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Client configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn protocol(status: u16, msg: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            message: msg.into(),
        }
    }

    /// The HTTP status behind this error, if the server produced one.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Server { code } | Self::Validation { code, .. } | Self::Client { code, .. } => {
                Some(*code)
            }
            Self::Protocol { status, .. } => Some(*status),
            Self::EmptyResponse => Some(204),
            Self::Transport(_) | Self::Decode(_) | Self::Serialization(_) | Self::Config(_) => {
                None
            }
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Client { code: 404, .. })
    }

    /// Check if this is a client error (4xx), validation errors included.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Client { .. } | Self::Validation { .. })
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

fn describe_issues(code: &u16, issues: &[ParameterError]) -> String {
    let mut out = format!("{code}: {} parameter errors:", issues.len());
    for issue in issues {
        let _ = write!(
            out,
            "\n  {}: {} ({})",
            issue.location.join(" -> "),
            issue.message,
            issue.kind
        );
    }
    out
}
