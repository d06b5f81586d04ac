// Error taxonomy for boundary operations.
//
// Every public SDK operation returns `Outcome<T>` — the error side is the
// sole error channel, nothing panics on a boundary path. Local validation
// failures (`InvalidState`, `InvalidArgument`, `AlreadyReleased`) are
// detected before any channel round trip and leave no partial side effects.
// `Channel` failures may leave the orchestrator side partially applied;
// callers reconcile by re-querying (`describe_player_sessions`).

use thiserror::Error;

use fleetward_protocol::MatchmakerParseError;

use crate::state::ProcessState;

/// Result of a boundary operation.
pub type Outcome<T> = Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    /// Operation attempted outside its required `ProcessState`.
    #[error("{operation} is not valid in state {current}")]
    InvalidState {
        operation: &'static str,
        current: ProcessState,
    },

    /// Malformed or missing required request fields, detected locally.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed matchmaker payload.
    #[error(transparent)]
    Parse(#[from] MatchmakerParseError),

    /// The control channel reported failure: I/O error, reply timeout, or
    /// an orchestrator-side refusal.
    #[error("control channel failure: {0}")]
    Channel(String),

    /// Operation attempted after `destroy` completed.
    #[error("the SDK handle has already been destroyed")]
    AlreadyReleased,
}

impl HostError {
    /// Stable category name for logs and agent-facing reporting.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Channel(_) => "CHANNEL_ERROR",
            Self::AlreadyReleased => "ALREADY_RELEASED",
        }
    }
}
