//! In-memory stand-in for the Polympics API.
//!
//! Serves the same paths, status codes and JSON shapes as the real service
//! so the client can be exercised end to end over real HTTP. Apps are
//! registered up front through [`AppState::register_app`]; everything else
//! is created through the API itself.

mod error;
mod store;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub use error::{ApiFailure, ValidJson};
pub use store::{Account, App, AppCredentials, Award, ExtendedAward, Page, Session, Team};

use store::{paginate, AccountRecord, Principal, Store};

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;
const MAX_TEAM_NAME: usize = 32;
const MAX_DISCRIMINATOR: u16 = 9999;

const MANAGE_ACCOUNT_DETAILS: u32 = 1 << 2;
const MANAGE_TEAMS: u32 = 1 << 3;

type ApiResult<T> = Result<T, ApiFailure>;

/// Shared server state.
#[derive(Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an API app and return its credentials.
    pub async fn register_app(&self, display_name: &str) -> AppCredentials {
        self.store.write().await.register_app(display_name)
    }

    pub async fn set_signups_open(&self, open: bool) {
        self.store.write().await.signups_open = open;
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/accounts/signups", get(signups))
        .route("/accounts/search", get(search_accounts))
        .route("/accounts/new", post(create_account))
        .route(
            "/account/{id}",
            get(get_account).patch(update_account).delete(delete_account),
        )
        .route("/account/{id}/award/{award_id}", put(give_award).delete(take_award))
        .route("/teams/search", get(search_teams))
        .route("/teams/new", post(create_team))
        .route("/team/{id}", get(get_team).patch(update_team).delete(delete_team))
        .route("/awards/new", post(create_award))
        .route("/award/{id}", get(get_award).patch(update_award).delete(delete_award))
        .route("/auth/discord", post(discord_authenticate))
        .route("/auth/create_session", post(create_session))
        .route("/auth/reset_token", post(reset_token))
        .route("/auth/me", get(me))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock Polympics API listening");
    }
    axum::serve(listener, app(state)).await
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub team: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize)]
pub struct NewAccount {
    pub id: u64,
    pub name: String,
    pub discriminator: u16,
    pub avatar_url: String,
    #[serde(default)]
    pub permissions: u32,
    pub team: Option<u64>,
}

#[derive(Deserialize, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub discriminator: Option<u16>,
    pub grant_permissions: Option<u32>,
    pub revoke_permissions: Option<u32>,
    pub avatar_url: Option<String>,
    /// Team id, `0` to leave the current team.
    pub team: Option<u64>,
    pub discord_token: Option<String>,
}

#[derive(Deserialize)]
pub struct TeamName {
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewAward {
    pub title: String,
    pub image_url: String,
    pub team: u64,
    #[serde(default)]
    pub accounts: Vec<u64>,
}

#[derive(Deserialize)]
pub struct AwardUpdate {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub team: Option<u64>,
}

#[derive(Deserialize)]
pub struct DiscordToken {
    pub token: String,
}

#[derive(Deserialize)]
pub struct SessionRequest {
    pub account: u64,
}

// ---------------------------------------------------------------------------
// Auth helpers
// ---------------------------------------------------------------------------

fn principal(store: &Store, headers: &HeaderMap) -> ApiResult<Principal> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or_else(ApiFailure::unauthorized)?;
    let decoded = STANDARD
        .decode(raw)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(ApiFailure::unauthorized)?;
    let (username, password) = decoded.split_once(':').ok_or_else(ApiFailure::unauthorized)?;
    store
        .authenticate(username, password)
        .ok_or_else(ApiFailure::unauthorized)
}

/// Apps may do anything; users need `bit` on their account.
fn require_permission(store: &Store, principal: &Principal, bit: u32) -> ApiResult<()> {
    match principal {
        Principal::App(_) => Ok(()),
        Principal::User { account_id, .. } => {
            let granted = store
                .accounts
                .get(account_id)
                .is_some_and(|a| a.permissions & bit != 0);
            if granted {
                Ok(())
            } else {
                Err(ApiFailure::forbidden())
            }
        }
    }
}

fn is_self(principal: &Principal, id: u64) -> bool {
    matches!(principal, Principal::User { account_id, .. } if *account_id == id)
}

fn validate_team_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_TEAM_NAME {
        return Err(ApiFailure::invalid(
            &["body", "name"],
            "team name must be between 1 and 32 characters",
            "value_error.any_str.length",
        ));
    }
    Ok(name.to_string())
}

fn validate_discriminator(discriminator: u16) -> ApiResult<u16> {
    if discriminator > MAX_DISCRIMINATOR {
        return Err(ApiFailure::invalid(
            &["body", "discriminator"],
            "ensure this value is less than or equal to 9999",
            "value_error.number.not_le",
        ));
    }
    Ok(discriminator)
}

fn require_team(store: &Store, id: u64) -> ApiResult<()> {
    if store.teams.contains_key(&id) {
        Ok(())
    } else {
        Err(ApiFailure::not_found("Team"))
    }
}

fn page_bounds(query: &SearchQuery) -> (u32, u32) {
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    (query.page.unwrap_or(0), per_page)
}

fn matches_search(haystack: &str, needle: &Option<String>) -> bool {
    needle
        .as_deref()
        .map_or(true, |q| haystack.to_lowercase().contains(&q.to_lowercase()))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

async fn signups(State(state): State<AppState>) -> Json<Value> {
    let store = state.store.read().await;
    Json(json!({ "signups_open": store.signups_open }))
}

async fn search_accounts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Page<Account>> {
    let store = state.store.read().await;
    let (page, per_page) = page_bounds(&query);
    let matches: Vec<Account> = store
        .accounts
        .values()
        .filter(|a| matches_search(&a.display_name, &query.q))
        .filter(|a| query.team.is_none() || a.team_id == query.team)
        .map(|a| store.render_account(a))
        .collect();
    Json(paginate(matches, page, per_page))
}

async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<NewAccount>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_ACCOUNT_DETAILS)?;
    let discriminator = validate_discriminator(input.discriminator)?;
    if store.accounts.contains_key(&input.id) {
        return Err(ApiFailure::conflict("Account already exists."));
    }
    if let Some(team) = input.team {
        require_team(&store, team)?;
    }
    let record = AccountRecord {
        discord_id: input.id,
        display_name: input.name,
        discriminator,
        created_at: store::now(),
        permissions: input.permissions,
        avatar_url: input.avatar_url,
        team_id: input.team,
        award_ids: Default::default(),
    };
    debug!(discord_id = record.discord_id, "account created");
    let account = store.render_account(&record);
    store.accounts.insert(record.discord_id, record);
    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Json<Account>> {
    let store = state.store.read().await;
    let record = store.accounts.get(&id).ok_or_else(|| ApiFailure::not_found("Account"))?;
    Ok(Json(store.render_account(record)))
}

async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<AccountUpdate>,
) -> ApiResult<Json<Account>> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    if !is_self(&who, id) {
        require_permission(&store, &who, MANAGE_ACCOUNT_DETAILS)?;
    }
    if input.grant_permissions.is_some() || input.revoke_permissions.is_some() {
        require_permission(&store, &who, 1)?;
    }
    if let Some(d) = input.discriminator {
        validate_discriminator(d)?;
    }
    match input.team {
        Some(0) | None => {}
        Some(team) => require_team(&store, team)?,
    }

    let record = store
        .accounts
        .get_mut(&id)
        .ok_or_else(|| ApiFailure::not_found("Account"))?;
    if let Some(name) = input.name {
        record.display_name = name;
    }
    if let Some(d) = input.discriminator {
        record.discriminator = d;
    }
    if let Some(url) = input.avatar_url {
        record.avatar_url = url;
    }
    if let Some(bits) = input.grant_permissions {
        record.permissions |= bits;
    }
    if let Some(bits) = input.revoke_permissions {
        record.permissions &= !bits;
    }
    match input.team {
        Some(0) => record.team_id = None,
        Some(team) => record.team_id = Some(team),
        None => {}
    }
    let record = record.clone();
    Ok(Json(store.render_account(&record)))
}

async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    if !is_self(&who, id) {
        require_permission(&store, &who, MANAGE_ACCOUNT_DETAILS)?;
    }
    store
        .accounts
        .remove(&id)
        .ok_or_else(|| ApiFailure::not_found("Account"))?;
    store.sessions.retain(|_, s| s.account_id != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn give_award(
    State(state): State<AppState>,
    Path((id, award_id)): Path<(u64, u64)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    if !store.awards.contains_key(&award_id) {
        return Err(ApiFailure::not_found("Award"));
    }
    let account = store
        .accounts
        .get_mut(&id)
        .ok_or_else(|| ApiFailure::not_found("Account"))?;
    account.award_ids.insert(award_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn take_award(
    State(state): State<AppState>,
    Path((id, award_id)): Path<(u64, u64)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    let account = store
        .accounts
        .get_mut(&id)
        .ok_or_else(|| ApiFailure::not_found("Account"))?;
    if !account.award_ids.remove(&award_id) {
        return Err(ApiFailure::not_found("Award"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

async fn search_teams(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Page<Team>> {
    let store = state.store.read().await;
    let (page, per_page) = page_bounds(&query);
    let matches: Vec<Team> = store
        .teams
        .values()
        .filter(|t| matches_search(&t.name, &query.q))
        .map(|t| store.render_team(t))
        .collect();
    Json(paginate(matches, page, per_page))
}

async fn create_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<TeamName>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    let name = validate_team_name(&input.name)?;
    let id = store.insert_team(name);
    debug!(team_id = id, "team created");
    let team = store.render_team(&store.teams[&id]);
    Ok((StatusCode::CREATED, Json(team)))
}

async fn get_team(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Json<Team>> {
    let store = state.store.read().await;
    let record = store.teams.get(&id).ok_or_else(|| ApiFailure::not_found("Team"))?;
    Ok(Json(store.render_team(record)))
}

async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<TeamName>,
) -> ApiResult<Json<Team>> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    let name = validate_team_name(&input.name)?;
    let record = store
        .teams
        .get_mut(&id)
        .ok_or_else(|| ApiFailure::not_found("Team"))?;
    record.name = name;
    let record = record.clone();
    Ok(Json(store.render_team(&record)))
}

async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    store
        .teams
        .remove(&id)
        .ok_or_else(|| ApiFailure::not_found("Team"))?;
    for account in store.accounts.values_mut() {
        if account.team_id == Some(id) {
            account.team_id = None;
        }
    }
    for award in store.awards.values_mut() {
        if award.team_id == Some(id) {
            award.team_id = None;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Awards
// ---------------------------------------------------------------------------

async fn create_award(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<NewAward>,
) -> ApiResult<(StatusCode, Json<Award>)> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    require_team(&store, input.team)?;
    if let Some(missing) = input.accounts.iter().find(|id| !store.accounts.contains_key(*id)) {
        return Err(ApiFailure::invalid(
            &["body", "accounts"],
            &format!("account {missing} does not exist"),
            "value_error",
        ));
    }
    let id = store.insert_award(input.title, input.image_url, Some(input.team));
    for account_id in &input.accounts {
        if let Some(account) = store.accounts.get_mut(account_id) {
            account.award_ids.insert(id);
        }
    }
    let award = store.render_award(&store.awards[&id]);
    Ok((StatusCode::CREATED, Json(award)))
}

async fn get_award(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<ExtendedAward>> {
    let store = state.store.read().await;
    let record = store.awards.get(&id).ok_or_else(|| ApiFailure::not_found("Award"))?;
    Ok(Json(store.render_extended_award(record)))
}

async fn update_award(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<AwardUpdate>,
) -> ApiResult<Json<Award>> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    if let Some(team) = input.team {
        require_team(&store, team)?;
    }
    let record = store
        .awards
        .get_mut(&id)
        .ok_or_else(|| ApiFailure::not_found("Award"))?;
    if let Some(title) = input.title {
        record.title = title;
    }
    if let Some(url) = input.image_url {
        record.image_url = url;
    }
    if let Some(team) = input.team {
        record.team_id = Some(team);
    }
    let record = record.clone();
    Ok(Json(store.render_award(&record)))
}

async fn delete_award(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let mut store = state.store.write().await;
    let who = principal(&store, &headers)?;
    require_permission(&store, &who, MANAGE_TEAMS)?;
    store
        .awards
        .remove(&id)
        .ok_or_else(|| ApiFailure::not_found("Award"))?;
    for account in store.accounts.values_mut() {
        account.award_ids.remove(&id);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// There is no Discord here: a token is accepted when it is the Discord id
/// of an existing account.
async fn discord_authenticate(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<DiscordToken>,
) -> ApiResult<Json<Session>> {
    let mut store = state.store.write().await;
    let account_id = input
        .token
        .parse::<u64>()
        .ok()
        .filter(|id| store.accounts.contains_key(id))
        .ok_or_else(|| {
            ApiFailure::Detail(StatusCode::UNAUTHORIZED, "Invalid Discord token.".to_string())
        })?;
    Ok(Json(store.open_session(account_id)))
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<SessionRequest>,
) -> ApiResult<Json<Session>> {
    let mut store = state.store.write().await;
    if !matches!(principal(&store, &headers)?, Principal::App(_)) {
        return Err(ApiFailure::forbidden());
    }
    if !store.accounts.contains_key(&input.account) {
        return Err(ApiFailure::not_found("Account"));
    }
    Ok(Json(store.open_session(input.account)))
}

async fn reset_token(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let mut store = state.store.write().await;
    let password = store::new_token();
    let body = match principal(&store, &headers)? {
        Principal::App(username) => {
            let app = store
                .apps
                .get_mut(&username)
                .ok_or_else(ApiFailure::unauthorized)?;
            app.password = password.clone();
            json!(AppCredentials {
                username,
                password,
                display_name: app.display_name.clone(),
            })
        }
        Principal::User { username, .. } => {
            let session = store
                .sessions
                .get_mut(&username)
                .ok_or_else(ApiFailure::unauthorized)?;
            session.password = password.clone();
            json!(Session {
                username,
                password,
                expires_at: session.expires_at,
            })
        }
    };
    Ok(Json(body))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let store = state.store.read().await;
    let body = match principal(&store, &headers)? {
        Principal::App(username) => {
            let app = store.apps.get(&username).ok_or_else(ApiFailure::unauthorized)?;
            json!(App {
                username,
                display_name: app.display_name.clone(),
            })
        }
        Principal::User { account_id, .. } => {
            let account = store
                .accounts
                .get(&account_id)
                .ok_or_else(|| ApiFailure::not_found("Account"))?;
            json!(store.render_account(account))
        }
    };
    Ok(Json(body))
}
