//! Async client for the Polympics API.
//!
//! # Overview
//! Builds authenticated requests, sends them through an injected
//! [`Transport`], classifies the responses and decodes them into typed
//! domain objects. Search endpoints are walked page by page with a
//! [`Paginator`].
//!
//! # Design
//! - [`Client`] is the only client type. Whether a call is made as nobody,
//!   an app or a user depends on the [`Credentials`] it holds.
//! - [`Client::build_request`] and [`classify`] are pure, so the wire shape
//!   of every call can be tested without a network.
//! - The transport is a trait; [`ReqwestTransport`] is the default
//!   implementation (feature `reqwest`).
//! - Nothing is retried. Every failure comes back as an [`ApiError`].
//!
//! ```no_run
//! # #[cfg(feature = "reqwest")]
//! # async fn run() -> polympics::ApiResult<()> {
//! use polympics::{Client, ClientConfig, Credentials, TeamSearch};
//!
//! let config = ClientConfig::default().with_credentials(Credentials::new("A1", "secret"));
//! let client = Client::with_config(config)?;
//! let mut teams = client.list_teams(&TeamSearch::default())?;
//! let first_page = teams.next_page().await?;
//! # let _ = first_page;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod paginator;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use classify::{classify, Outcome};
pub use client::{to_params, Client, Params, RequestOptions};
pub use config::{ClientConfig, DEFAULT_API_URL};
pub use credentials::Credentials;
pub use endpoints::{SearchPages, SearchPaginator};
pub use error::{ApiError, ApiResult, ParameterError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use paginator::{FnSource, Page, PageQuery, PageSource, Paginator};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use types::{
    Account, AccountSearch, AccountUpdate, App, AppCredentials, Award, AwardUpdate,
    ExtendedAward, NewAccount, NewAward, NewTeam, Permissions, Session, Team, TeamAssignment,
    TeamSearch, TeamUpdate,
};
