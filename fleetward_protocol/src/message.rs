// Control-channel messages between a hosted process and the fleet agent.
//
// Two enums define the protocol vocabulary:
// - `HostMessage`: sent by the hosted game server process to the agent.
//   Request variants carry a `RequestId`; the agent answers each with
//   exactly one `AgentMessage::Reply` bearing the same ID. `HealthStatus`
//   and `Goodbye` are fire-and-forget notifications with no reply.
// - `AgentMessage`: sent by the agent. Either a `Reply` to a pending host
//   request, or an unsolicited `Event` driving the session lifecycle.
//
// Request structs use `Option` per field so "absent" is distinguishable
// from "empty" — the host validates required fields locally before a
// request ever crosses the channel.

use serde::{Deserialize, Serialize};

use crate::model::{GameSession, Player, PlayerSession, UpdateReason};
use crate::types::RequestId;

/// Messages sent by the hosted process to the fleet agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HostMessage {
    /// Announce this process and where the agent can route players.
    RegisterProcess {
        request_id: RequestId,
        protocol_version: u32,
        port: u16,
        log_path: Option<String>,
    },
    /// The process is beginning graceful shutdown.
    ProcessEnding { request_id: RequestId },
    /// The process finished preparing the session delivered via
    /// `LifecycleEvent::StartGameSession` and is accepting players.
    ActivateGameSession { request_id: RequestId },
    /// The process is done with its current session.
    TerminateGameSession { request_id: RequestId },
    /// Ask the matchmaker to fill empty slots in the running session.
    StartMatchBackfill {
        request_id: RequestId,
        request: StartMatchBackfillRequest,
    },
    /// Abort a previously started backfill ticket.
    StopMatchBackfill {
        request_id: RequestId,
        request: StopMatchBackfillRequest,
    },
    /// A reserved player connected and the process accepts them.
    AcceptPlayerSession {
        request_id: RequestId,
        player_session_id: String,
    },
    /// A player left; free their slot.
    RemovePlayerSession {
        request_id: RequestId,
        player_session_id: String,
    },
    /// Query player sessions with a filter and pagination.
    DescribePlayerSessions {
        request_id: RequestId,
        request: DescribePlayerSessionsRequest,
    },
    /// Result of a health check, reported on the agent's cadence.
    HealthStatus { healthy: bool },
    /// The process is releasing its channel.
    Goodbye,
}

impl HostMessage {
    /// The correlation ID, for request variants. Notifications
    /// (`HealthStatus`, `Goodbye`) expect no reply and have none.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::RegisterProcess { request_id, .. }
            | Self::ProcessEnding { request_id }
            | Self::ActivateGameSession { request_id }
            | Self::TerminateGameSession { request_id }
            | Self::StartMatchBackfill { request_id, .. }
            | Self::StopMatchBackfill { request_id, .. }
            | Self::AcceptPlayerSession { request_id, .. }
            | Self::RemovePlayerSession { request_id, .. }
            | Self::DescribePlayerSessions { request_id, .. } => Some(*request_id),
            Self::HealthStatus { .. } | Self::Goodbye => None,
        }
    }
}

/// Messages sent by the fleet agent to the hosted process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AgentMessage {
    /// Answer to a pending host request.
    Reply {
        request_id: RequestId,
        reply: AgentReply,
    },
    /// Unsolicited lifecycle event.
    Event(LifecycleEvent),
}

/// The agent's answer to one host request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AgentReply {
    /// Request accepted; no payload.
    Ack,
    /// Request refused by the agent or orchestrator.
    Refused { name: String, message: String },
    /// Backfill accepted under this ticket.
    BackfillTicket { ticket_id: String },
    /// One page of player sessions.
    PlayerSessionPage(PlayerSessionPage),
}

/// Lifecycle events pushed by the agent, delivered to callbacks in strict
/// arrival order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// The orchestrator placed a session on this process.
    StartGameSession { game_session: GameSession },
    /// A new snapshot of the active session.
    UpdateGameSession {
        game_session: GameSession,
        update_reason: UpdateReason,
    },
    /// The process must begin graceful shutdown.
    TerminateProcess,
    /// The agent wants a health verdict.
    HealthCheck,
}

/// Request to start matchmaking backfill for the active session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StartMatchBackfillRequest {
    /// Caller-chosen ticket ID; the orchestrator assigns one when absent.
    pub ticket_id: Option<String>,
    pub matchmaking_configuration_arn: Option<String>,
    pub game_session_arn: Option<String>,
    pub players: Option<Vec<Player>>,
}

/// Request to stop a previously started backfill.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StopMatchBackfillRequest {
    pub ticket_id: Option<String>,
    pub matchmaking_configuration_arn: Option<String>,
    pub game_session_arn: Option<String>,
}

/// Player session query. Exactly the filter fields that are set apply.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribePlayerSessionsRequest {
    pub game_session_id: Option<String>,
    pub player_id: Option<String>,
    pub player_session_id: Option<String>,
    /// One of the declared `PlayerSessionStatus` names.
    pub player_session_status_filter: Option<String>,
    pub limit: Option<u32>,
    /// Opaque pagination token from a previous page.
    pub next_token: Option<String>,
}

/// One page of a player session query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSessionPage {
    pub player_sessions: Vec<PlayerSession>,
    /// Token for the next page; `None` when the result set is exhausted.
    pub next_token: Option<String>,
}
