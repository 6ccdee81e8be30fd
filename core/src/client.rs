//! Request pipeline for the Polympics API.
//!
//! # Design
//! `Client` turns `(method, path, params)` into an `HttpRequest`, passes it
//! to the injected `Transport`, and runs the response through `classify`.
//! `build_request` is kept separate and side-effect free so the exact wire
//! shape of any call can be checked without a transport.
//!
//! The held credentials are the only state that changes between calls; the
//! token-reset endpoints replace them, which is why those take `&mut self`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::classify::{classify, Outcome};
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{ApiError, ApiResult};
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;

/// Request parameters. Sent as the query string for GET, JSON body otherwise.
pub type Params = serde_json::Map<String, Value>;

/// Per-request knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Treat any 2xx as `Outcome::Empty` without decoding the body.
    pub expect_empty_body: bool,
}

impl RequestOptions {
    pub fn empty_body() -> Self {
        Self {
            expect_empty_body: true,
        }
    }
}

/// Client for the Polympics API.
///
/// One type covers unauthenticated, app and user access; which endpoints
/// succeed depends only on the credentials it holds.
#[derive(Debug, Clone)]
pub struct Client<T> {
    base_url: String,
    user_agent: String,
    credentials: Option<Credentials>,
    transport: T,
}

#[cfg(feature = "reqwest")]
impl Client<crate::transport::ReqwestTransport> {
    /// Create a client that talks HTTP through `reqwest`.
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        Self::new(config, crate::transport::ReqwestTransport::new())
    }
}

impl<T: Transport> Client<T> {
    pub fn new(config: ClientConfig, transport: T) -> ApiResult<Self> {
        config.validate()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent,
            credentials: config.credentials,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Replace the credentials used for every subsequent request.
    ///
    /// Credentials that `ClientConfig::validate` would reject are refused and
    /// the current ones are kept.
    pub fn set_credentials(&mut self, credentials: Option<Credentials>) -> ApiResult<()> {
        if let Some(creds) = &credentials {
            creds.validate()?;
        }
        self.credentials = credentials;
        Ok(())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the request for a call without sending it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> ApiResult<HttpRequest> {
        let mut url = format!("{}{path}", self.base_url);
        let mut headers = vec![("user-agent".to_string(), self.user_agent.clone())];
        let mut body = None;

        if method.uses_query() {
            let pairs: Vec<(&str, String)> = params
                .iter()
                .filter_map(|(key, value)| query_value(value).map(|v| (key.as_str(), v)))
                .collect();
            if !pairs.is_empty() {
                let query = serde_urlencoded::to_string(&pairs)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                url.push('?');
                url.push_str(&query);
            }
        } else {
            let json = serde_json::to_string(params)
                .map_err(|e| ApiError::Serialization(e.to_string()))?;
            headers.push(("content-type".to_string(), "application/json".to_string()));
            body = Some(json);
        }

        if let Some(creds) = &self.credentials {
            headers.push(("authorization".to_string(), creds.authorization_header()));
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send a call and classify the response.
    #[instrument(skip(self, params, options))]
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
        options: RequestOptions,
    ) -> ApiResult<Outcome> {
        let request = self.build_request(method, path, params)?;
        debug!(
            url = %request.url,
            authenticated = self.credentials.is_some(),
            "sending request"
        );

        let response = self.transport.send(request).await?;
        debug!(status = response.status, "received response");

        let outcome = classify(response.status, &response.body, options.expect_empty_body);
        if let Err(ApiError::Server { code }) = &outcome {
            warn!(code, "server error");
        }
        outcome
    }

    /// Send a call and decode the response body into `R`.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        params: Params,
    ) -> ApiResult<R> {
        match self
            .execute(method, path, &params, RequestOptions::default())
            .await?
        {
            Outcome::Success(value) => decode(value),
            Outcome::Empty => Err(ApiError::EmptyResponse),
        }
    }

    /// Send a call whose successful response carries no body.
    pub async fn request_empty(
        &self,
        method: HttpMethod,
        path: &str,
        params: Params,
    ) -> ApiResult<()> {
        self.execute(method, path, &params, RequestOptions::empty_body())
            .await
            .map(|_| ())
    }
}

/// Serialize a request struct into `Params`. It must encode as a JSON object.
pub fn to_params<S: Serialize>(value: &S) -> ApiResult<Params> {
    match serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::Serialization(format!(
            "parameters must be an object, got {other}"
        ))),
    }
}

pub(crate) fn decode<R: DeserializeOwned>(value: Value) -> ApiResult<R> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Text form of a query parameter. Nulls are dropped.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
