// Domain model for hosted game sessions and player sessions.
//
// Every type here is a point-in-time snapshot delivered by the orchestrator
// over the control channel. Nothing is mutated after construction — a changed
// game session arrives as a *new* `GameSession` plus an `UpdateReason`, never
// as an in-place edit. Status enums use SCREAMING_SNAKE_CASE on the wire and
// fall back to `NotSet` / `Unknown` for values outside the declared range, so
// an agent speaking a newer protocol revision degrades gracefully instead of
// failing deserialization.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Orchestrator-side status of a game session snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameSessionStatus {
    Active,
    Activating,
    Terminated,
    Terminating,
    #[serde(other)]
    NotSet,
}

/// Orchestrator-side status of a player session.
///
/// Lifecycle: `Reserved` when the orchestrator admits a client before it
/// connects, `Active` once the hosting process accepts it, and the terminal
/// states `Completed` / `Timedout` never revert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerSessionStatus {
    Reserved,
    Active,
    Completed,
    Timedout,
    #[serde(other)]
    NotSet,
}

impl PlayerSessionStatus {
    /// Parse a `player_session_status_filter` string. Returns `None` for
    /// anything outside the declared names (including `NOT_SET`, which is
    /// not a meaningful filter).
    pub fn from_filter(name: &str) -> Option<Self> {
        match name {
            "RESERVED" => Some(Self::Reserved),
            "ACTIVE" => Some(Self::Active),
            "COMPLETED" => Some(Self::Completed),
            "TIMEDOUT" => Some(Self::Timedout),
            _ => None,
        }
    }
}

/// Why the orchestrator delivered a new game session snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateReason {
    MatchmakingDataUpdated,
    BackfillFailed,
    BackfillTimedOut,
    BackfillCancelled,
    #[serde(other)]
    Unknown,
}

/// Immutable snapshot of a game session hosted by this process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub name: String,
    pub fleet_id: String,
    pub maximum_player_session_count: u32,
    pub status: GameSessionStatus,
    pub ip_address: String,
    pub port: u16,
    /// Opaque session data blob set at session creation.
    pub game_session_data: String,
    /// Opaque matchmaker payload; parse with `matchmaker::parse`.
    pub matchmaker_data: String,
}

/// Immutable snapshot of a player session admitted to a game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSession {
    pub player_session_id: String,
    pub player_id: String,
    pub game_session_id: String,
    pub fleet_id: String,
    pub creation_time: DateTime<Utc>,
    /// Unset while the player session is still `Reserved` or `Active`.
    pub termination_time: Option<DateTime<Utc>>,
    pub status: PlayerSessionStatus,
    pub ip_address: String,
    pub port: u16,
    pub player_data: String,
    pub dns_name: String,
}

/// A new game session snapshot paired with the reason it was delivered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSessionUpdate {
    pub game_session: GameSession,
    pub update_reason: UpdateReason,
}

/// A matchmade player, used as backfill-request input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub team: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub latency_in_ms: BTreeMap<String, i32>,
}

impl Player {
    pub fn new(player_id: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            team: team.into(),
            attributes: BTreeMap::new(),
            latency_in_ms: BTreeMap::new(),
        }
    }
}

/// Matchmaking attribute value — an explicit tagged union constructed via
/// the named factories below. The variant is part of the type, never a
/// separately stored tag that could disagree with the carried value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "attribute_type",
    content = "value",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum AttributeValue {
    None,
    String(String),
    Double(f64),
    StringList(Vec<String>),
    StringDoubleMap(BTreeMap<String, f64>),
}

impl AttributeValue {
    pub fn none() -> Self {
        Self::None
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn double(value: f64) -> Self {
        Self::Double(value)
    }

    pub fn string_list(values: impl IntoIterator<Item = String>) -> Self {
        Self::StringList(values.into_iter().collect())
    }

    pub fn string_double_map(entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self::StringDoubleMap(entries.into_iter().collect())
    }

    /// Variant name as it appears on the wire. Handy for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::String(_) => "STRING",
            Self::Double(_) => "DOUBLE",
            Self::StringList(_) => "STRING_LIST",
            Self::StringDoubleMap(_) => "STRING_DOUBLE_MAP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_game_session_status_maps_to_not_set() {
        let status: GameSessionStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(status, GameSessionStatus::NotSet);
    }

    #[test]
    fn unknown_player_session_status_maps_to_not_set() {
        let status: PlayerSessionStatus = serde_json::from_str("\"FROZEN\"").unwrap();
        assert_eq!(status, PlayerSessionStatus::NotSet);
    }

    #[test]
    fn unknown_update_reason_maps_to_unknown() {
        let reason: UpdateReason = serde_json::from_str("\"BACKFILL_EXPLODED\"").unwrap();
        assert_eq!(reason, UpdateReason::Unknown);
    }

    #[test]
    fn known_statuses_round_trip() {
        for status in [
            PlayerSessionStatus::Reserved,
            PlayerSessionStatus::Active,
            PlayerSessionStatus::Completed,
            PlayerSessionStatus::Timedout,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let back: PlayerSessionStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(
            PlayerSessionStatus::from_filter("RESERVED"),
            Some(PlayerSessionStatus::Reserved)
        );
        assert_eq!(
            PlayerSessionStatus::from_filter("TIMEDOUT"),
            Some(PlayerSessionStatus::Timedout)
        );
        assert_eq!(PlayerSessionStatus::from_filter("NOT_SET"), None);
        assert_eq!(PlayerSessionStatus::from_filter("reserved"), None);
    }

    #[test]
    fn game_session_field_round_trip() {
        let session = GameSession {
            id: "gsess-1".into(),
            name: "arena-4".into(),
            fleet_id: "fleet-9".into(),
            maximum_player_session_count: 16,
            status: GameSessionStatus::Activating,
            ip_address: "10.0.0.3".into(),
            port: 7777,
            game_session_data: "{\"map\":\"dunes\"}".into(),
            matchmaker_data: String::new(),
        };
        let json = serde_json::to_string(&session).unwrap();
        let back: GameSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn player_session_field_round_trip() {
        let session = PlayerSession {
            player_session_id: "psess-7".into(),
            player_id: "player-42".into(),
            game_session_id: "gsess-1".into(),
            fleet_id: "fleet-9".into(),
            creation_time: "2026-08-25T12:00:00Z".parse().unwrap(),
            termination_time: None,
            status: PlayerSessionStatus::Reserved,
            ip_address: "10.0.0.3".into(),
            port: 7777,
            player_data: String::new(),
            dns_name: "host.fleet.example".into(),
        };
        let json = serde_json::to_string(&session).unwrap();
        let back: PlayerSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
        assert!(back.termination_time.is_none());
    }

    #[test]
    fn attribute_value_factories() {
        assert_eq!(AttributeValue::none(), AttributeValue::None);
        assert_eq!(
            AttributeValue::string("abc"),
            AttributeValue::String("abc".into())
        );
        assert_eq!(AttributeValue::double(42.0), AttributeValue::Double(42.0));
        assert_eq!(
            AttributeValue::string_list(vec!["a".to_string(), "b".to_string()]),
            AttributeValue::StringList(vec!["a".into(), "b".into()])
        );
        let map = AttributeValue::string_double_map([("a".to_string(), 1.0)]);
        assert_eq!(map.type_name(), "STRING_DOUBLE_MAP");
    }

    #[test]
    fn attribute_value_serde_round_trip() {
        let value = AttributeValue::string_double_map([
            ("skill".to_string(), 1800.0),
            ("rank".to_string(), 3.0),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("STRING_DOUBLE_MAP"));
        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
