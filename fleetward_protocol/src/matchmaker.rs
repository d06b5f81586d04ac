// Matchmaker data parsing.
//
// The orchestrator attaches an opaque matchmaker payload to each game
// session snapshot: a JSON document with a `teams` list, each team carrying
// a `name` and a `players` list. `parse` flattens all players across all
// teams into one ordered sequence (team-then-player source order), stamping
// each player with its originating team name.
//
// Two hard rules, both from the orchestrator contract:
// - An empty payload means "no matchmaker data" and yields `Ok(None)`, not
//   an error — sessions placed outside matchmaking have no payload.
// - A malformed payload is a parse failure, never a partial result. Dropping
//   players silently would corrupt backfill requests built from the output.
//
// The payload uses the orchestrator's camelCase field names; they are an
// external contract this parser honors rather than restyles.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::model::{AttributeValue, Player};

/// Matchmaker payload parse failure.
#[derive(Debug, Error)]
pub enum MatchmakerParseError {
    #[error("matchmaker payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed matchmaker payload: {0}")]
    Shape(String),
}

/// Parsed matchmaker data for one match.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchmakerData {
    pub match_id: Option<String>,
    pub matchmaking_configuration_arn: Option<String>,
    pub auto_backfill_ticket_id: Option<String>,
    /// All players across all teams, in team-then-player source order.
    pub players: Vec<Player>,
}

/// Parse an opaque matchmaker payload. Empty input yields `Ok(None)`.
pub fn parse(payload: &str) -> Result<Option<MatchmakerData>, MatchmakerParseError> {
    if payload.is_empty() {
        return Ok(None);
    }

    let root: Value = serde_json::from_str(payload)?;
    let root = root
        .as_object()
        .ok_or_else(|| shape("top-level value is not an object"))?;

    let teams = root
        .get("teams")
        .ok_or_else(|| shape("missing 'teams' list"))?
        .as_array()
        .ok_or_else(|| shape("'teams' is not a list"))?;

    let mut players = Vec::new();
    for team in teams {
        let team_name = team
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| shape("team missing string 'name'"))?;
        let team_players = team
            .get("players")
            .ok_or_else(|| shape("team missing 'players' list"))?
            .as_array()
            .ok_or_else(|| shape("team 'players' is not a list"))?;
        for player in team_players {
            players.push(parse_player(player, team_name)?);
        }
    }

    Ok(Some(MatchmakerData {
        match_id: optional_string(root.get("matchId")),
        matchmaking_configuration_arn: optional_string(root.get("matchmakingConfigurationArn")),
        auto_backfill_ticket_id: optional_string(root.get("autoBackfillTicketId")),
        players,
    }))
}

/// Derive an `AttributeValue` from a JSON value's shape. Pure function of
/// the shape: string → String, number → Double, list of strings →
/// StringList, object of numbers → StringDoubleMap, null → None.
pub fn attribute_from_value(value: &Value) -> Result<AttributeValue, MatchmakerParseError> {
    match value {
        Value::Null => Ok(AttributeValue::None),
        Value::Bool(_) => Ok(AttributeValue::None),
        Value::String(s) => Ok(AttributeValue::String(s.clone())),
        Value::Number(n) => {
            let n = n
                .as_f64()
                .ok_or_else(|| shape("attribute number is not representable as f64"))?;
            Ok(AttributeValue::Double(n))
        }
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                let s = item
                    .as_str()
                    .ok_or_else(|| shape("attribute list element is not a string"))?;
                list.push(s.to_string());
            }
            Ok(AttributeValue::StringList(list))
        }
        Value::Object(entries) => {
            let mut map = BTreeMap::new();
            for (key, entry) in entries {
                let n = entry
                    .as_f64()
                    .ok_or_else(|| shape("attribute map value is not a number"))?;
                map.insert(key.clone(), n);
            }
            Ok(AttributeValue::StringDoubleMap(map))
        }
    }
}

fn parse_player(player: &Value, team_name: &str) -> Result<Player, MatchmakerParseError> {
    let player_id = player
        .get("playerId")
        .and_then(Value::as_str)
        .ok_or_else(|| shape("player missing string 'playerId'"))?;

    let mut parsed = Player::new(player_id, team_name);

    if let Some(attributes) = player.get("attributes") {
        let attributes = attributes
            .as_object()
            .ok_or_else(|| shape("player 'attributes' is not an object"))?;
        for (name, value) in attributes {
            // Some payload revisions wrap values in {"attributeType": ...,
            // "valueAttribute": ...}; the shape rules apply to the inner
            // value in that case.
            let value = value.get("valueAttribute").unwrap_or(value);
            parsed
                .attributes
                .insert(name.clone(), attribute_from_value(value)?);
        }
    }

    if let Some(latency) = player.get("latencyInMs") {
        let latency = latency
            .as_object()
            .ok_or_else(|| shape("player 'latencyInMs' is not an object"))?;
        for (region, value) in latency {
            let ms = value
                .as_i64()
                .ok_or_else(|| shape("latency value is not an integer"))?;
            #[expect(clippy::cast_possible_truncation)]
            parsed.latency_in_ms.insert(region.clone(), ms as i32);
        }
    }

    Ok(parsed)
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn shape(message: &str) -> MatchmakerParseError {
    MatchmakerParseError::Shape(message.into())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_payload_is_no_data() {
        assert_eq!(parse("").unwrap(), None);
    }

    #[test]
    fn two_teams_flatten_in_source_order() {
        let payload = json!({
            "matchId": "match-1",
            "matchmakingConfigurationArn": "arn:config/ranked",
            "autoBackfillTicketId": "ticket-0",
            "teams": [
                {
                    "name": "red",
                    "players": [
                        {"playerId": "r1"},
                        {"playerId": "r2"},
                    ],
                },
                {
                    "name": "blue",
                    "players": [
                        {"playerId": "b1"},
                        {"playerId": "b2"},
                        {"playerId": "b3"},
                    ],
                },
            ],
        })
        .to_string();

        let data = parse(&payload).unwrap().unwrap();
        assert_eq!(data.match_id.as_deref(), Some("match-1"));
        assert_eq!(
            data.matchmaking_configuration_arn.as_deref(),
            Some("arn:config/ranked")
        );
        assert_eq!(data.auto_backfill_ticket_id.as_deref(), Some("ticket-0"));

        let ids: Vec<&str> = data.players.iter().map(|p| p.player_id.as_str()).collect();
        assert_eq!(ids, ["r1", "r2", "b1", "b2", "b3"]);
        let teams: Vec<&str> = data.players.iter().map(|p| p.team.as_str()).collect();
        assert_eq!(teams, ["red", "red", "blue", "blue", "blue"]);
    }

    #[test]
    fn player_attributes_and_latency() {
        let payload = json!({
            "teams": [{
                "name": "solo",
                "players": [{
                    "playerId": "p1",
                    "attributes": {
                        "skill": 1800,
                        "clan": "oaks",
                        "roles": ["tank", "healer"],
                        "per_mode": {"ranked": 1.5},
                        "wrapped": {"attributeType": "STRING", "valueAttribute": "inner"},
                    },
                    "latencyInMs": {"eu-west": 40, "us-east": 110},
                }],
            }],
        })
        .to_string();

        let data = parse(&payload).unwrap().unwrap();
        let player = &data.players[0];
        assert_eq!(player.attributes["skill"], AttributeValue::Double(1800.0));
        assert_eq!(
            player.attributes["clan"],
            AttributeValue::String("oaks".into())
        );
        assert_eq!(
            player.attributes["roles"],
            AttributeValue::StringList(vec!["tank".into(), "healer".into()])
        );
        assert_eq!(
            player.attributes["per_mode"],
            AttributeValue::string_double_map([("ranked".to_string(), 1.5)])
        );
        assert_eq!(
            player.attributes["wrapped"],
            AttributeValue::String("inner".into())
        );
        assert_eq!(player.latency_in_ms["eu-west"], 40);
        assert_eq!(player.latency_in_ms["us-east"], 110);
    }

    #[test]
    fn attribute_shape_table() {
        assert_eq!(
            attribute_from_value(&json!("abc")).unwrap(),
            AttributeValue::String("abc".into())
        );
        assert_eq!(
            attribute_from_value(&json!(42)).unwrap(),
            AttributeValue::Double(42.0)
        );
        assert_eq!(
            attribute_from_value(&json!(["a", "b"])).unwrap(),
            AttributeValue::StringList(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            attribute_from_value(&json!({"a": 1.0})).unwrap(),
            AttributeValue::string_double_map([("a".to_string(), 1.0)])
        );
        assert_eq!(
            attribute_from_value(&Value::Null).unwrap(),
            AttributeValue::None
        );
    }

    #[test]
    fn mixed_attribute_list_is_an_error() {
        let err = attribute_from_value(&json!(["a", 3])).unwrap_err();
        assert!(matches!(err, MatchmakerParseError::Shape(_)));
    }

    #[test]
    fn missing_teams_is_an_error() {
        let err = parse("{\"matchId\":\"m\"}").unwrap_err();
        assert!(matches!(err, MatchmakerParseError::Shape(_)));
    }

    #[test]
    fn player_without_id_is_an_error() {
        let payload = json!({
            "teams": [{"name": "red", "players": [{"team": "red"}]}],
        })
        .to_string();
        let err = parse(&payload).unwrap_err();
        assert!(matches!(err, MatchmakerParseError::Shape(_)));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, MatchmakerParseError::Json(_)));
    }
}
