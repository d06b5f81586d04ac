// Host-process integration SDK for the fleetward orchestrator.
//
// A game server process links this crate, connects to its local fleet agent
// with `ServerProcess::init`, registers lifecycle callbacks via
// `process_ready`, and from then on the orchestrator drives session
// placement, updates, health checks, and termination through the callback
// interface while the process calls back in for activation, player
// admission, and matchmaking backfill.
//
// Module map:
// - `state`: the lifecycle state machine, sole authority on legality.
// - `error`: `HostError` / `Outcome`, the one error channel.
// - `callbacks`: the `ProcessEvents` trait the game server implements.
// - `channel`: the `ControlChannel` transport seam and its TCP impl.
// - `process`: the `ServerProcess` handle tying the above together.

pub mod callbacks;
pub mod channel;
pub mod error;
pub mod process;
pub mod state;

pub use callbacks::ProcessEvents;
pub use channel::{ControlChannel, REPLY_TIMEOUT, TcpChannel};
pub use error::{HostError, Outcome};
pub use process::ServerProcess;
pub use state::ProcessState;
