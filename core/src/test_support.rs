//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

pub(crate) const BASE_URL: &str = "http://localhost:8000";

/// Replays queued responses in order and records every request it sees.
/// Runs out of responses with a `TransportError`.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<HttpResponse>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub(crate) fn push(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(HttpResponse::new(status, body));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::new("no scripted response left"))
    }
}

pub(crate) fn client() -> Client<ScriptedTransport> {
    client_with(ScriptedTransport::default(), None)
}

pub(crate) fn client_with(
    transport: ScriptedTransport,
    credentials: Option<Credentials>,
) -> Client<ScriptedTransport> {
    let mut config = ClientConfig::default().with_base_url(BASE_URL);
    config.credentials = credentials;
    Client::new(config, transport).unwrap()
}

pub(crate) const TEAM_JSON: &str =
    r#"{"id":4,"name":"Red","created_at":1620000000,"member_count":2}"#;

pub(crate) const ACCOUNT_JSON: &str = r#"{
    "discord_id": 42,
    "display_name": "alice",
    "discriminator": 1234,
    "created_at": 1620000100,
    "permissions": 8,
    "avatar_url": "https://cdn.example.com/alice.png",
    "team": {"id":4,"name":"Red","created_at":1620000000,"member_count":2}
}"#;

pub(crate) const AWARD_JSON: &str = r#"{
    "id": 9,
    "title": "Gold",
    "image_url": "https://cdn.example.com/gold.png",
    "team": null
}"#;

/// The JSON body of a recorded request.
pub(crate) fn body_json(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
}
