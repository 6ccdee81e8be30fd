//! In-memory state behind the mock API.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of a user session, in seconds.
const SESSION_TTL: i64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    pub created_at: i64,
    pub member_count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub id: u64,
    pub title: String,
    pub image_url: String,
    pub team: Option<Team>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub discord_id: u64,
    pub display_name: String,
    pub discriminator: u16,
    pub created_at: i64,
    pub permissions: u32,
    pub avatar_url: String,
    pub team: Option<Team>,
    pub awards: Vec<Award>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtendedAward {
    #[serde(flatten)]
    pub award: Award,
    pub accounts: Vec<Account>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub password: String,
    pub expires_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub username: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppCredentials {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub results: u32,
    pub data: Vec<T>,
}

#[derive(Clone, Debug)]
pub(crate) struct TeamRecord {
    pub id: u64,
    pub name: String,
    pub created_at: i64,
}

#[derive(Clone, Debug)]
pub(crate) struct AccountRecord {
    pub discord_id: u64,
    pub display_name: String,
    pub discriminator: u16,
    pub created_at: i64,
    pub permissions: u32,
    pub avatar_url: String,
    pub team_id: Option<u64>,
    pub award_ids: BTreeSet<u64>,
}

#[derive(Clone, Debug)]
pub(crate) struct AwardRecord {
    pub id: u64,
    pub title: String,
    pub image_url: String,
    pub team_id: Option<u64>,
}

#[derive(Clone, Debug)]
pub(crate) struct AppRecord {
    pub password: String,
    pub display_name: String,
}

#[derive(Clone, Debug)]
pub(crate) struct SessionRecord {
    pub password: String,
    pub account_id: u64,
    pub expires_at: i64,
}

/// Who a request is authenticated as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Principal {
    App(String),
    User { username: String, account_id: u64 },
}

#[derive(Debug)]
pub(crate) struct Store {
    pub teams: BTreeMap<u64, TeamRecord>,
    pub accounts: BTreeMap<u64, AccountRecord>,
    pub awards: BTreeMap<u64, AwardRecord>,
    pub apps: HashMap<String, AppRecord>,
    pub sessions: HashMap<String, SessionRecord>,
    pub signups_open: bool,
    next_team_id: u64,
    next_award_id: u64,
    next_app_id: u64,
    next_session_id: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            teams: BTreeMap::new(),
            accounts: BTreeMap::new(),
            awards: BTreeMap::new(),
            apps: HashMap::new(),
            sessions: HashMap::new(),
            signups_open: true,
            next_team_id: 1,
            next_award_id: 1,
            next_app_id: 1,
            next_session_id: 1,
        }
    }
}

pub(crate) fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub(crate) fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Store {
    pub fn register_app(&mut self, display_name: &str) -> AppCredentials {
        let username = format!("A{}", self.next_app_id);
        self.next_app_id += 1;
        let password = new_token();
        self.apps.insert(
            username.clone(),
            AppRecord {
                password: password.clone(),
                display_name: display_name.to_string(),
            },
        );
        AppCredentials {
            username,
            password,
            display_name: display_name.to_string(),
        }
    }

    pub fn open_session(&mut self, account_id: u64) -> Session {
        let username = format!("S{}", self.next_session_id);
        self.next_session_id += 1;
        let record = SessionRecord {
            password: new_token(),
            account_id,
            expires_at: now() + SESSION_TTL,
        };
        let session = Session {
            username: username.clone(),
            password: record.password.clone(),
            expires_at: record.expires_at,
        };
        self.sessions.insert(username, record);
        session
    }

    pub fn insert_team(&mut self, name: String) -> u64 {
        let id = self.next_team_id;
        self.next_team_id += 1;
        self.teams.insert(
            id,
            TeamRecord {
                id,
                name,
                created_at: now(),
            },
        );
        id
    }

    pub fn insert_award(&mut self, title: String, image_url: String, team_id: Option<u64>) -> u64 {
        let id = self.next_award_id;
        self.next_award_id += 1;
        self.awards.insert(
            id,
            AwardRecord {
                id,
                title,
                image_url,
                team_id,
            },
        );
        id
    }

    /// Resolve a username/password pair to an app or a live session.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Principal> {
        if let Some(app) = self.apps.get(username) {
            return (app.password == password).then(|| Principal::App(username.to_string()));
        }
        let session = self.sessions.get(username)?;
        if session.password != password || session.expires_at < now() {
            return None;
        }
        Some(Principal::User {
            username: username.to_string(),
            account_id: session.account_id,
        })
    }

    pub fn render_team(&self, team: &TeamRecord) -> Team {
        let member_count = self
            .accounts
            .values()
            .filter(|a| a.team_id == Some(team.id))
            .count() as u32;
        Team {
            id: team.id,
            name: team.name.clone(),
            created_at: team.created_at,
            member_count,
        }
    }

    fn render_team_id(&self, id: Option<u64>) -> Option<Team> {
        id.and_then(|id| self.teams.get(&id)).map(|t| self.render_team(t))
    }

    pub fn render_award(&self, award: &AwardRecord) -> Award {
        Award {
            id: award.id,
            title: award.title.clone(),
            image_url: award.image_url.clone(),
            team: self.render_team_id(award.team_id),
        }
    }

    pub fn render_account(&self, account: &AccountRecord) -> Account {
        Account {
            discord_id: account.discord_id,
            display_name: account.display_name.clone(),
            discriminator: account.discriminator,
            created_at: account.created_at,
            permissions: account.permissions,
            avatar_url: account.avatar_url.clone(),
            team: self.render_team_id(account.team_id),
            awards: account
                .award_ids
                .iter()
                .filter_map(|id| self.awards.get(id))
                .map(|a| self.render_award(a))
                .collect(),
        }
    }

    pub fn render_extended_award(&self, award: &AwardRecord) -> ExtendedAward {
        ExtendedAward {
            award: self.render_award(award),
            accounts: self
                .accounts
                .values()
                .filter(|a| a.award_ids.contains(&award.id))
                .map(|a| self.render_account(a))
                .collect(),
        }
    }
}

/// Slice `items` into the requested zero-based page.
pub(crate) fn paginate<T>(items: Vec<T>, page: u32, per_page: u32) -> Page<T> {
    let results = items.len() as u32;
    let pages = results.div_ceil(per_page);
    let start = (page as usize).saturating_mul(per_page as usize);
    let data = items
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect();
    Page {
        page,
        per_page,
        pages,
        results,
        data,
    }
}
