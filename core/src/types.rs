//! Domain types for the Polympics API and their wire mapping.
//!
//! # Design
//! Each entity is one struct whose serde attributes are its wire mapping:
//! field names stay `snake_case`, timestamps travel as Unix seconds and are
//! held as `DateTime<Utc>`, and page envelopes rename `pages`/`results`/
//! `data`. Read shapes nest related objects (an account's team is a `Team`);
//! the write shapes further down refer to them by id instead.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::credentials::Credentials;

bitflags! {
    /// Permission bits carried by an account.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "u32", into = "u32")]
    pub struct Permissions: u32 {
        const MANAGE_PERMISSIONS = 1 << 0;
        const MANAGE_ACCOUNT_TEAMS = 1 << 1;
        const MANAGE_ACCOUNT_DETAILS = 1 << 2;
        const MANAGE_TEAMS = 1 << 3;
        const AUTHENTICATE_USERS = 1 << 4;
        const MANAGE_OWN_TEAM = 1 << 5;
    }
}

// Unknown bits are kept so a newer server's flags survive a round trip.
impl From<u32> for Permissions {
    fn from(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }
}

impl From<Permissions> for u32 {
    fn from(permissions: Permissions) -> Self {
        permissions.bits()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub member_count: u32,
}

/// A user account, keyed by Discord user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub discord_id: u64,
    pub display_name: String,
    pub discriminator: u16,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub permissions: Permissions,
    pub avatar_url: String,
    pub team: Option<Team>,
    #[serde(default)]
    pub awards: Vec<Award>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub id: u64,
    pub title: String,
    pub image_url: String,
    pub team: Option<Team>,
}

/// An award together with the accounts holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedAward {
    #[serde(flatten)]
    pub award: Award,
    pub accounts: Vec<Account>,
}

/// A user authentication session. Its username and password are the
/// credentials a user client authenticates with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub password: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

/// Metadata on an API app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub username: String,
    pub display_name: String,
}

/// Metadata and credentials for an API app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredentials {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

impl AppCredentials {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    pub fn app(&self) -> App {
        App {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAccount {
    /// Discord user id.
    pub id: u64,
    pub name: String,
    pub discriminator: u16,
    pub avatar_url: String,
    pub permissions: Permissions,
    /// Team id, if the account starts on a team.
    pub team: Option<u64>,
}

/// Moving an account between teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamAssignment {
    Join(u64),
    Leave,
}

// The API reads team id 0 as "no team".
impl Serialize for TeamAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TeamAssignment::Join(id) => serializer.serialize_u64(*id),
            TeamAssignment::Leave => serializer.serialize_u64(0),
        }
    }
}

/// Fields to change on an account. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoke_permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamAssignment>,
    /// Discord OAuth token, used by the API to refresh the account's profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTeam {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamUpdate {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAward {
    pub title: String,
    pub image_url: String,
    pub team: u64,
    /// Discord ids of the accounts that receive the award straight away.
    pub accounts: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AwardUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<u64>,
}

// An empty search means "everything", which the API expects as no `q` at all.
fn no_search_text(search: &Option<String>) -> bool {
    search.as_deref().map_or(true, str::is_empty)
}

/// Filters for the account search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountSearch {
    #[serde(rename = "q", skip_serializing_if = "no_search_text")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<u64>,
}

/// Filters for the team search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamSearch {
    #[serde(rename = "q", skip_serializing_if = "no_search_text")]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::{json, Value};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn team() -> Team {
        Team {
            id: 4,
            name: "Red".to_string(),
            created_at: at(1_620_000_000),
            member_count: 12,
        }
    }

    fn award() -> Award {
        Award {
            id: 9,
            title: "Gold".to_string(),
            image_url: "https://cdn.example.com/gold.png".to_string(),
            team: Some(team()),
        }
    }

    fn account() -> Account {
        Account {
            discord_id: 123_456_789_012_345_678,
            display_name: "alice".to_string(),
            discriminator: 1234,
            created_at: at(1_620_000_100),
            permissions: Permissions::MANAGE_TEAMS | Permissions::MANAGE_OWN_TEAM,
            avatar_url: "https://cdn.example.com/alice.png".to_string(),
            team: Some(team()),
            awards: vec![award()],
        }
    }

    fn round_trip<T>(value: &T) -> (Value, T)
    where
        T: Serialize + for<'de> Deserialize<'de>,
    {
        let wire = serde_json::to_value(value).unwrap();
        let back = serde_json::from_value(wire.clone()).unwrap();
        (wire, back)
    }

    #[test]
    fn team_round_trip() {
        let (wire, back) = round_trip(&team());
        assert_eq!(
            wire,
            json!({"id": 4, "name": "Red", "created_at": 1_620_000_000, "member_count": 12})
        );
        assert_eq!(back, team());
    }

    #[test]
    fn account_round_trip() {
        let (wire, back) = round_trip(&account());
        assert_eq!(wire["discord_id"], json!(123_456_789_012_345_678u64));
        assert_eq!(wire["display_name"], "alice");
        assert_eq!(wire["permissions"], json!(8 | 32));
        assert_eq!(wire["team"]["id"], 4);
        assert_eq!(back, account());
    }

    #[test]
    fn account_without_team_or_awards() {
        let raw = json!({
            "discord_id": 1,
            "display_name": "bob",
            "discriminator": 7,
            "created_at": 0,
            "permissions": 0,
            "avatar_url": "",
            "team": null
        });
        let account: Account = serde_json::from_value(raw).unwrap();
        assert!(account.team.is_none());
        assert!(account.awards.is_empty());
        assert!(account.permissions.is_empty());
    }

    #[test]
    fn award_round_trips() {
        let (_, back) = round_trip(&award());
        assert_eq!(back, award());

        let extended = ExtendedAward {
            award: award(),
            accounts: vec![account()],
        };
        let (wire, back) = round_trip(&extended);
        assert_eq!(wire["title"], "Gold");
        assert_eq!(wire["accounts"][0]["discord_id"], json!(123_456_789_012_345_678u64));
        assert_eq!(back, extended);
    }

    #[test]
    fn session_and_app_round_trips() {
        let session = Session {
            username: "S123".to_string(),
            password: "tok".to_string(),
            expires_at: at(1_700_000_000),
        };
        let (wire, back) = round_trip(&session);
        assert_eq!(wire["expires_at"], 1_700_000_000);
        assert_eq!(back, session);
        assert_eq!(session.credentials(), Credentials::new("S123", "tok"));

        let app = App {
            username: "A1".to_string(),
            display_name: "Bot".to_string(),
        };
        assert_eq!(round_trip(&app).1, app);

        let creds = AppCredentials {
            username: "A1".to_string(),
            password: "secret".to_string(),
            display_name: "Bot".to_string(),
        };
        assert_eq!(round_trip(&creds).1, creds);
        assert_eq!(creds.app(), app);
        assert_eq!(creds.credentials(), Credentials::new("A1", "secret"));
    }

    #[test]
    fn permissions_keep_unknown_bits() {
        let perms: Permissions = serde_json::from_value(json!(1 | 64)).unwrap();
        assert!(perms.contains(Permissions::MANAGE_PERMISSIONS));
        assert_eq!(serde_json::to_value(perms).unwrap(), json!(65));
    }

    #[test]
    fn permission_bit_values() {
        assert_eq!(Permissions::MANAGE_PERMISSIONS.bits(), 1);
        assert_eq!(Permissions::MANAGE_ACCOUNT_TEAMS.bits(), 2);
        assert_eq!(Permissions::MANAGE_ACCOUNT_DETAILS.bits(), 4);
        assert_eq!(Permissions::MANAGE_TEAMS.bits(), 8);
        assert_eq!(Permissions::AUTHENTICATE_USERS.bits(), 16);
        assert_eq!(Permissions::MANAGE_OWN_TEAM.bits(), 32);
    }

    #[test]
    fn account_update_only_sends_set_fields() {
        let update = AccountUpdate {
            name: Some("carol".to_string()),
            grant_permissions: Some(Permissions::MANAGE_TEAMS),
            team: Some(TeamAssignment::Leave),
            ..AccountUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"name": "carol", "grant_permissions": 8, "team": 0})
        );
        assert_eq!(serde_json::to_value(AccountUpdate::default()).unwrap(), json!({}));
    }

    #[test]
    fn new_account_wire_shape() {
        let new = NewAccount {
            id: 42,
            name: "dave".to_string(),
            discriminator: 1,
            avatar_url: "https://cdn.example.com/d.png".to_string(),
            permissions: Permissions::empty(),
            team: None,
        };
        assert_eq!(
            serde_json::to_value(&new).unwrap(),
            json!({
                "id": 42,
                "name": "dave",
                "discriminator": 1,
                "avatar_url": "https://cdn.example.com/d.png",
                "permissions": 0,
                "team": null
            })
        );
    }

    #[test]
    fn search_filters_use_q() {
        let search = AccountSearch {
            search: Some("ali".to_string()),
            team: Some(4),
        };
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({"q": "ali", "team": 4})
        );
        assert_eq!(serde_json::to_value(TeamSearch::default()).unwrap(), json!({}));
    }

    #[test]
    fn empty_search_text_is_left_out() {
        let teams = TeamSearch {
            search: Some(String::new()),
        };
        assert_eq!(serde_json::to_value(&teams).unwrap(), json!({}));

        let accounts = AccountSearch {
            search: Some(String::new()),
            team: Some(4),
        };
        assert_eq!(serde_json::to_value(&accounts).unwrap(), json!({"team": 4}));
    }
}
