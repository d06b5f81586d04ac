// fleetward_protocol — wire protocol for the Fleetward control channel.
//
// This crate defines everything shared between a hosted game server process
// (`fleetward_host`) and the fleet agent it registers with: the domain model
// delivered in lifecycle events, the request/reply/event message enums, the
// matchmaker payload parser, and length-delimited framing. It has no
// dependency on the host SDK.
//
// Module overview:
// - `types.rs`:      `RequestId` correlation newtype, protocol version.
// - `model.rs`:      Immutable session/player snapshots and status enums.
// - `matchmaker.rs`: Opaque matchmaker payload → typed `MatchmakerData`.
// - `message.rs`:    `HostMessage` / `AgentMessage` vocabulary and request
//                    structs.
// - `framing.rs`:    4-byte big-endian length prefix + JSON payload over any
//                    `Read`/`Write` stream.
//
// Design decisions:
// - **JSON serialization.** Human-inspectable on the wire; the agent side of
//   the channel is owned by the orchestrator and JSON is its stable contract.
// - **No async runtime.** Framing works over blocking `std::io` streams; the
//   host SDK uses a reader thread, not an executor.
// - **Unknown enum values degrade.** Statuses and update reasons outside the
//   declared range deserialize to `NotSet`/`Unknown` rather than failing the
//   whole frame.

pub mod framing;
pub mod matchmaker;
pub mod message;
pub mod model;
pub mod types;

pub use framing::{MAX_FRAME_LEN, read_frame, write_frame};
pub use matchmaker::{MatchmakerData, MatchmakerParseError};
pub use message::{
    AgentMessage, AgentReply, DescribePlayerSessionsRequest, HostMessage, LifecycleEvent,
    PlayerSessionPage, StartMatchBackfillRequest, StopMatchBackfillRequest,
};
pub use model::{
    AttributeValue, GameSession, GameSessionStatus, GameSessionUpdate, Player, PlayerSession,
    PlayerSessionStatus, UpdateReason,
};
pub use types::{PROTOCOL_VERSION, RequestId};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn host_round_trip(msg: &HostMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &json).unwrap();

        let mut cursor = Cursor::new(&wire);
        let recovered_json = read_frame(&mut cursor).unwrap();
        let recovered: HostMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    fn agent_round_trip(msg: &AgentMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &json).unwrap();

        let mut cursor = Cursor::new(&wire);
        let recovered_json = read_frame(&mut cursor).unwrap();
        let recovered: AgentMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    fn sample_session() -> GameSession {
        GameSession {
            id: "gsess-1".into(),
            name: "arena".into(),
            fleet_id: "fleet-1".into(),
            maximum_player_session_count: 8,
            status: GameSessionStatus::Activating,
            ip_address: "127.0.0.1".into(),
            port: 9000,
            game_session_data: String::new(),
            matchmaker_data: String::new(),
        }
    }

    #[test]
    fn round_trip_register_process() {
        host_round_trip(&HostMessage::RegisterProcess {
            request_id: RequestId(0),
            protocol_version: PROTOCOL_VERSION,
            port: 7777,
            log_path: Some("/var/log/server.log".into()),
        });
    }

    #[test]
    fn round_trip_register_process_no_log_path() {
        host_round_trip(&HostMessage::RegisterProcess {
            request_id: RequestId(1),
            protocol_version: PROTOCOL_VERSION,
            port: 7777,
            log_path: None,
        });
    }

    #[test]
    fn round_trip_start_match_backfill() {
        let mut player = Player::new("p1", "red");
        player
            .attributes
            .insert("skill".into(), AttributeValue::double(1800.0));
        player.latency_in_ms.insert("eu-west".into(), 35);

        host_round_trip(&HostMessage::StartMatchBackfill {
            request_id: RequestId(7),
            request: StartMatchBackfillRequest {
                ticket_id: None,
                matchmaking_configuration_arn: Some("arn:config/ranked".into()),
                game_session_arn: Some("arn:gsess-1".into()),
                players: Some(vec![player]),
            },
        });
    }

    #[test]
    fn round_trip_describe_player_sessions() {
        host_round_trip(&HostMessage::DescribePlayerSessions {
            request_id: RequestId(8),
            request: DescribePlayerSessionsRequest {
                game_session_id: Some("gsess-1".into()),
                player_session_status_filter: Some("RESERVED".into()),
                limit: Some(20),
                ..DescribePlayerSessionsRequest::default()
            },
        });
    }

    #[test]
    fn round_trip_health_status() {
        host_round_trip(&HostMessage::HealthStatus { healthy: false });
    }

    #[test]
    fn round_trip_reply_refused() {
        agent_round_trip(&AgentMessage::Reply {
            request_id: RequestId(3),
            reply: AgentReply::Refused {
                name: "UNAUTHORIZED".into(),
                message: "process is not registered".into(),
            },
        });
    }

    #[test]
    fn round_trip_reply_player_session_page() {
        agent_round_trip(&AgentMessage::Reply {
            request_id: RequestId(4),
            reply: AgentReply::PlayerSessionPage(PlayerSessionPage {
                player_sessions: vec![PlayerSession {
                    player_session_id: "psess-1".into(),
                    player_id: "p1".into(),
                    game_session_id: "gsess-1".into(),
                    fleet_id: "fleet-1".into(),
                    creation_time: "2026-08-25T10:00:00Z".parse().unwrap(),
                    termination_time: None,
                    status: PlayerSessionStatus::Reserved,
                    ip_address: "127.0.0.1".into(),
                    port: 9000,
                    player_data: String::new(),
                    dns_name: String::new(),
                }],
                next_token: Some("page-2".into()),
            }),
        });
    }

    #[test]
    fn round_trip_event_start_game_session() {
        agent_round_trip(&AgentMessage::Event(LifecycleEvent::StartGameSession {
            game_session: sample_session(),
        }));
    }

    #[test]
    fn round_trip_event_update_game_session() {
        agent_round_trip(&AgentMessage::Event(LifecycleEvent::UpdateGameSession {
            game_session: sample_session(),
            update_reason: UpdateReason::BackfillTimedOut,
        }));
    }

    #[test]
    fn round_trip_event_terminate_and_health() {
        agent_round_trip(&AgentMessage::Event(LifecycleEvent::TerminateProcess));
        agent_round_trip(&AgentMessage::Event(LifecycleEvent::HealthCheck));
    }
}
