//! Authentication endpoints.
//!
//! `/auth/reset_token` and `/auth/me` answer differently for app and user
//! credentials, so each gets one method per caller kind. The reset methods
//! swap the client's credentials for the fresh ones on success.

use serde_json::Value;
use tracing::info;

use crate::client::{Client, Params};
use crate::error::ApiResult;
use crate::http::HttpMethod;
use crate::transport::Transport;
use crate::types::{Account, App, AppCredentials, Session};

impl<T: Transport> Client<T> {
    /// Exchange a Discord OAuth token for a user session.
    pub async fn discord_authenticate(&self, token: &str) -> ApiResult<Session> {
        let mut params = Params::new();
        params.insert("token".to_string(), Value::from(token));
        self.request(HttpMethod::Post, "/auth/discord", params).await
    }

    /// Create a session for an account. Requires app credentials.
    pub async fn create_session(&self, account_id: u64) -> ApiResult<Session> {
        let mut params = Params::new();
        params.insert("account".to_string(), Value::from(account_id));
        self.request(HttpMethod::Post, "/auth/create_session", params)
            .await
    }

    /// Reset the authenticated app's token and start using the new one.
    pub async fn reset_app_token(&mut self) -> ApiResult<AppCredentials> {
        let app: AppCredentials = self
            .request(HttpMethod::Post, "/auth/reset_token", Params::new())
            .await?;
        self.set_credentials(Some(app.credentials()))?;
        info!(username = %app.username, "app token reset");
        Ok(app)
    }

    /// Reset the authenticated session's token and start using the new one.
    pub async fn reset_session_token(&mut self) -> ApiResult<Session> {
        let session: Session = self
            .request(HttpMethod::Post, "/auth/reset_token", Params::new())
            .await?;
        self.set_credentials(Some(session.credentials()))?;
        info!(username = %session.username, "session token reset");
        Ok(session)
    }

    /// Metadata on the app the client authenticates as.
    pub async fn get_self_app(&self) -> ApiResult<App> {
        self.request(HttpMethod::Get, "/auth/me", Params::new()).await
    }

    /// The account of the user the client authenticates as.
    pub async fn get_self_account(&self) -> ApiResult<Account> {
        self.request(HttpMethod::Get, "/auth/me", Params::new()).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::credentials::Credentials;
    use crate::error::ApiError;
    use crate::http::HttpMethod;
    use crate::test_support::{body_json, client_with, ScriptedTransport, ACCOUNT_JSON};

    const SESSION_JSON: &str = r#"{"username":"S1","password":"fresh","expires_at":1700000000}"#;

    #[tokio::test]
    async fn discord_authenticate_posts_token() {
        let transport = ScriptedTransport::default();
        transport.push(200, SESSION_JSON);
        let client = client_with(transport.clone(), None);

        let session = client.discord_authenticate("oauth-token").await.unwrap();
        assert_eq!(session.username, "S1");
        assert_eq!(session.expires_at.timestamp(), 1_700_000_000);

        let req = transport.last_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/auth/discord");
        assert!(req.header("authorization").is_none());
        assert_eq!(body_json(&req), json!({"token": "oauth-token"}));
    }

    #[tokio::test]
    async fn create_session_for_account() {
        let transport = ScriptedTransport::default();
        transport.push(200, SESSION_JSON);
        let client = client_with(transport.clone(), Some(Credentials::new("A1", "app")));

        client.create_session(42).await.unwrap();
        let req = transport.last_request();
        assert_eq!(req.url, "http://localhost:8000/auth/create_session");
        assert_eq!(body_json(&req), json!({"account": 42}));
    }

    #[tokio::test]
    async fn reset_app_token_replaces_credentials() {
        let transport = ScriptedTransport::default();
        transport.push(
            200,
            r#"{"username":"A1","password":"new-secret","display_name":"Bot"}"#,
        );
        transport.push(200, r#"{"username":"A1","display_name":"Bot"}"#);
        let old = Credentials::new("A1", "old-secret");
        let mut client = client_with(transport.clone(), Some(old.clone()));

        let app = client.reset_app_token().await.unwrap();
        assert_eq!(app.password, "new-secret");
        assert_eq!(client.credentials(), Some(&Credentials::new("A1", "new-secret")));

        client.get_self_app().await.unwrap();
        let sent = transport.requests();
        assert_eq!(
            sent[0].header("authorization"),
            Some(old.authorization_header().as_str())
        );
        assert_eq!(
            sent[1].header("authorization"),
            Some(Credentials::new("A1", "new-secret").authorization_header().as_str())
        );
    }

    #[tokio::test]
    async fn failed_reset_keeps_credentials() {
        let transport = ScriptedTransport::default();
        transport.push(401, r#"{"detail":"Invalid credentials."}"#);
        let old = Credentials::new("S1", "stale");
        let mut client = client_with(transport, Some(old.clone()));

        let err = client.reset_session_token().await.unwrap_err();
        assert_eq!(err.code(), Some(401));
        assert_eq!(client.credentials(), Some(&old));
    }

    #[tokio::test]
    async fn reset_returning_unusable_username_keeps_credentials() {
        let transport = ScriptedTransport::default();
        transport.push(200, r#"{"username":"S:1","password":"fresh","expires_at":1700000000}"#);
        let old = Credentials::new("S1", "stale");
        let mut client = client_with(transport, Some(old.clone()));

        let err = client.reset_session_token().await.unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert_eq!(client.credentials(), Some(&old));
    }

    #[tokio::test]
    async fn reset_session_token_replaces_credentials() {
        let transport = ScriptedTransport::default();
        transport.push(200, SESSION_JSON);
        let mut client = client_with(transport, Some(Credentials::new("S1", "stale")));

        client.reset_session_token().await.unwrap();
        assert_eq!(client.credentials(), Some(&Credentials::new("S1", "fresh")));
    }

    #[tokio::test]
    async fn get_self_account() {
        let transport = ScriptedTransport::default();
        transport.push(200, ACCOUNT_JSON);
        let client = client_with(transport.clone(), Some(Credentials::new("S1", "tok")));

        let me = client.get_self_account().await.unwrap();
        assert_eq!(me.discord_id, 42);
        assert_eq!(transport.last_request().url, "http://localhost:8000/auth/me");
    }
}
