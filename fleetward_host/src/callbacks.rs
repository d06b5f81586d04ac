// Lifecycle callback registry.
//
// The hosting game server supplies one `ProcessEvents` implementation at
// `process_ready` time; all four handlers are required (they are trait
// methods, so a partial registration cannot exist). The dispatcher thread
// in `process.rs` invokes them one at a time in event arrival order — no
// two callbacks ever run concurrently.

use fleetward_protocol::{GameSession, GameSessionUpdate};

/// The four lifecycle handlers a hosted process must provide.
///
/// All methods run on the SDK's dispatcher thread. They may call back into
/// a cloned [`ServerProcess`](crate::process::ServerProcess) handle (for
/// example `activate_game_session` from within `on_start_game_session`),
/// but they must not block indefinitely: while a handler runs, no further
/// lifecycle events or health checks are delivered.
pub trait ProcessEvents: Send {
    /// A session was placed on this process. Prepare it, then acknowledge
    /// with `activate_game_session` within the orchestrator's activation
    /// deadline.
    fn on_start_game_session(&mut self, game_session: GameSession);

    /// A new snapshot of the active session, with the reason it changed.
    /// Delivered zero or more times while the session is Active.
    fn on_update_game_session(&mut self, update: GameSessionUpdate);

    /// The process must begin graceful shutdown. Invoked at most once.
    fn on_process_terminate(&mut self);

    /// Report whether the process is healthy. The verdict is forwarded to
    /// the agent; returning `false` is an expected outcome, not an error.
    fn on_health_check(&mut self) -> bool;
}
