//! Configuration for the Polympics API client.
//!
//! Everything the client needs at construction time lives in `ClientConfig`;
//! nothing is read from globals after that.

use std::env;

use crate::credentials::Credentials;
use crate::error::{ApiError, ApiResult};

/// Default production API URL.
pub const DEFAULT_API_URL: &str = "https://api.polympics.xyz";

const DEFAULT_USER_AGENT: &str = concat!("polympics-rs/", env!("CARGO_PKG_VERSION"));

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Credentials sent with every request, if any.
    pub credentials: Option<Credentials>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            credentials: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `POLYMPICS_API_URL`: base URL (defaults to [`DEFAULT_API_URL`])
    /// - `POLYMPICS_USERNAME` / `POLYMPICS_PASSWORD`: credentials, used only
    ///   when both are set
    pub fn from_env() -> ApiResult<Self> {
        let base_url = env::var("POLYMPICS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let credentials = match (env::var("POLYMPICS_USERNAME"), env::var("POLYMPICS_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };
        let config = Self {
            base_url,
            credentials,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }
        if let Some(creds) = &self.credentials {
            creds.validate()?;
        }
        Ok(())
    }
}
