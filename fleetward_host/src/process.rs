// The SDK handle.
//
// `ServerProcess` is a cloneable handle over shared internals; there is no
// process-wide singleton. `init()` connects to the fleet agent, then the
// hosting game server drives its side of the lifecycle through boundary
// methods while a dispatcher thread delivers agent events to the callbacks
// registered in `process_ready`.
//
// Concurrency shape:
// - `state` mutex guards the lifecycle state machine. It is held only for
//   the check-or-transition itself, never across a channel round trip or a
//   callback, so a callback can call back in through a cloned handle.
// - `channel` mutex serializes requests on the wire. `destroy()` takes the
//   channel out of the option, which is what makes its close-exactly-once
//   guarantee hold and makes later calls fail with `AlreadyReleased`.
// - The dispatcher thread owns the callbacks and the event queue; it exits
//   when the queue disconnects or when `destroy()` raises the shutdown
//   flag. The event sender belongs to the transport and may outlive
//   `ControlChannel::close()`, so the flag is what lets `destroy()` join
//   the dispatcher for every transport, not just TCP.
//
// Gated operations validate state and arguments locally before anything is
// written to the channel; a rejected call produces no wire traffic.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use fleetward_protocol::message::{
    AgentReply, DescribePlayerSessionsRequest, HostMessage, LifecycleEvent, PlayerSessionPage,
    StartMatchBackfillRequest, StopMatchBackfillRequest,
};
use fleetward_protocol::model::PlayerSessionStatus;
use fleetward_protocol::types::RequestId;
use fleetward_protocol::{GameSessionUpdate, PROTOCOL_VERSION};

use crate::callbacks::ProcessEvents;
use crate::channel::{ControlChannel, TcpChannel};
use crate::error::{HostError, Outcome};
use crate::state::{LifecycleState, ProcessState};

/// How often the dispatcher re-checks the shutdown flag while the event
/// queue is idle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

struct Shared {
    state: Mutex<LifecycleState>,
    channel: Mutex<Option<Box<dyn ControlChannel>>>,
    /// The event queue, parked here between `init` and `process_ready`.
    /// Taken exactly once; also serves as the double-registration guard.
    pending_events: Mutex<Option<Receiver<LifecycleEvent>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    /// Raised by `destroy()`; the dispatcher polls it so the join below
    /// terminates even when the transport keeps its event sender alive.
    shutdown: AtomicBool,
    next_request: AtomicU64,
}

/// Handle to this process's integration with the fleet agent.
///
/// Cheap to clone; all clones share one lifecycle and one channel. Typical
/// use: `init`, then `process_ready` with the game server's callbacks, then
/// react to events until `on_process_terminate`, then `process_ending` and
/// `destroy`.
#[derive(Clone)]
pub struct ServerProcess {
    shared: Arc<Shared>,
}

impl ServerProcess {
    /// Connect to the fleet agent at `addr`.
    pub fn init(addr: &str) -> Outcome<Self> {
        let (channel, events) = TcpChannel::connect(addr)?;
        info!("connected to fleet agent at {addr}");
        Ok(Self::with_channel(Box::new(channel), events))
    }

    /// Build a handle over an already-open channel. Tests and alternative
    /// transports use this; `init` is the TCP front door.
    pub fn with_channel(
        channel: Box<dyn ControlChannel>,
        events: Receiver<LifecycleEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LifecycleState::new()),
                channel: Mutex::new(Some(channel)),
                pending_events: Mutex::new(Some(events)),
                dispatcher: Mutex::new(None),
                shutdown: AtomicBool::new(false),
                next_request: AtomicU64::new(0),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        lock(&self.shared.state).current()
    }

    /// Register this process with the agent and start event dispatch.
    ///
    /// `port` is where the agent routes players; `log_path` is an optional
    /// server log location for the orchestrator to collect. Succeeds at most
    /// once per handle: a second call fails with `InvalidState` and the
    /// original callbacks stay in place.
    pub fn process_ready(
        &self,
        callbacks: Box<dyn ProcessEvents>,
        port: u16,
        log_path: Option<String>,
    ) -> Outcome<()> {
        let events = match lock(&self.shared.pending_events).take() {
            Some(events) => events,
            None => {
                return Err(HostError::InvalidState {
                    operation: "process_ready",
                    current: self.state(),
                });
            }
        };

        let register = |request_id| HostMessage::RegisterProcess {
            request_id,
            protocol_version: PROTOCOL_VERSION,
            port,
            log_path: log_path.clone(),
        };
        if let Err(e) = self.call(register).and_then(|_| lock(&self.shared.state).mark_ready()) {
            // Registration failed; put the queue back so a retry can work.
            *lock(&self.shared.pending_events) = Some(events);
            return Err(e);
        }
        info!("process registered with agent on port {port}");

        let shared = Arc::clone(&self.shared);
        let handle = thread::spawn(move || dispatch_loop(&shared, &events, callbacks));
        *lock(&self.shared.dispatcher) = Some(handle);
        Ok(())
    }

    /// Announce graceful shutdown. The state becomes `Terminated` whether or
    /// not the agent acknowledged.
    pub fn process_ending(&self) -> Outcome<()> {
        let result = self.call(|request_id| HostMessage::ProcessEnding { request_id });
        lock(&self.shared.state).end_process();
        result.map(|_| ())
    }

    /// Acknowledge the session delivered via `on_start_game_session`; the
    /// agent starts routing reserved players here.
    ///
    /// A terminate event arriving during the channel round trip can move
    /// the state machine out from under this call; it then fails with
    /// `InvalidState` even though the agent accepted the request. Treat
    /// that like the `Channel` partial-application case and reconcile via
    /// [`state`](Self::state).
    pub fn activate_game_session(&self) -> Outcome<()> {
        self.require_state("activate_game_session", &[ProcessState::Activating])?;
        self.call(|request_id| HostMessage::ActivateGameSession { request_id })?;
        lock(&self.shared.state).activate()
    }

    /// End the current session without ending the process.
    ///
    /// As with [`activate_game_session`](Self::activate_game_session), a
    /// terminate event racing the round trip yields `InvalidState` for a
    /// request the agent accepted; reconcile via [`state`](Self::state).
    pub fn terminate_game_session(&self) -> Outcome<()> {
        self.require_state(
            "terminate_game_session",
            &[ProcessState::Active, ProcessState::Activating],
        )?;
        self.call(|request_id| HostMessage::TerminateGameSession { request_id })?;
        lock(&self.shared.state).terminate_session()
    }

    /// Ask the matchmaker to fill empty slots in the active session.
    /// Returns the backfill ticket ID.
    pub fn start_match_backfill(&self, request: StartMatchBackfillRequest) -> Outcome<String> {
        self.require_state("start_match_backfill", &[ProcessState::Active])?;
        validate_backfill_start(&request)?;
        let reply = self.call(|request_id| HostMessage::StartMatchBackfill {
            request_id,
            request: request.clone(),
        })?;
        match reply {
            AgentReply::BackfillTicket { ticket_id } => Ok(ticket_id),
            other => Err(unexpected_reply("start_match_backfill", &other)),
        }
    }

    /// Abort a previously started backfill ticket.
    pub fn stop_match_backfill(&self, request: StopMatchBackfillRequest) -> Outcome<()> {
        self.require_state("stop_match_backfill", &[ProcessState::Active])?;
        validate_backfill_stop(&request)?;
        self.call(|request_id| HostMessage::StopMatchBackfill {
            request_id,
            request: request.clone(),
        })
        .map(|_| ())
    }

    /// Admit a player whose session the orchestrator reserved here.
    pub fn accept_player_session(&self, player_session_id: &str) -> Outcome<()> {
        self.require_state("accept_player_session", &[ProcessState::Active])?;
        non_empty("player_session_id", player_session_id)?;
        let id = player_session_id.to_owned();
        self.call(|request_id| HostMessage::AcceptPlayerSession {
            request_id,
            player_session_id: id.clone(),
        })
        .map(|_| ())
    }

    /// Free a departed player's slot.
    pub fn remove_player_session(&self, player_session_id: &str) -> Outcome<()> {
        self.require_state("remove_player_session", &[ProcessState::Active])?;
        non_empty("player_session_id", player_session_id)?;
        let id = player_session_id.to_owned();
        self.call(|request_id| HostMessage::RemovePlayerSession {
            request_id,
            player_session_id: id.clone(),
        })
        .map(|_| ())
    }

    /// Query player sessions. Pass the returned `next_token` back in a
    /// follow-up request to fetch the next page.
    pub fn describe_player_sessions(
        &self,
        request: DescribePlayerSessionsRequest,
    ) -> Outcome<PlayerSessionPage> {
        self.require_state("describe_player_sessions", &[ProcessState::Active])?;
        validate_describe(&request)?;
        let reply = self.call(|request_id| HostMessage::DescribePlayerSessions {
            request_id,
            request: request.clone(),
        })?;
        match reply {
            AgentReply::PlayerSessionPage(page) => Ok(page),
            other => Err(unexpected_reply("describe_player_sessions", &other)),
        }
    }

    /// Release the channel and stop event dispatch. Safe to call more than
    /// once: the channel closes exactly once and later calls succeed as
    /// no-ops. Every other boundary method fails with `AlreadyReleased`
    /// afterwards.
    pub fn destroy(&self) -> Outcome<()> {
        if let Some(mut channel) = lock(&self.shared.channel).take() {
            channel.close();
            debug!("handle destroyed, channel released");
        }
        lock(&self.shared.state).end_process();
        self.shared.shutdown.store(true, Ordering::Relaxed);

        // Joining our own thread would deadlock; a callback calling destroy
        // runs on the dispatcher, so skip the join there.
        if let Some(handle) = lock(&self.shared.dispatcher).take() {
            if handle.thread().id() == thread::current().id() {
                debug!("destroy called from the dispatcher thread, not joining");
            } else {
                let _ = handle.join();
            }
        }
        Ok(())
    }

    /// Assign a request ID and run one request/reply round trip.
    fn call(&self, build: impl FnOnce(RequestId) -> HostMessage) -> Outcome<AgentReply> {
        let request_id = RequestId(self.shared.next_request.fetch_add(1, Ordering::Relaxed));
        let mut guard = lock(&self.shared.channel);
        match guard.as_mut() {
            Some(channel) => channel.call(build(request_id)),
            None => Err(HostError::AlreadyReleased),
        }
    }

    /// Check state without transitioning. Fails with `AlreadyReleased` once
    /// the handle is destroyed so the two cases stay distinguishable.
    fn require_state(&self, operation: &'static str, allowed: &[ProcessState]) -> Outcome<()> {
        if lock(&self.shared.channel).is_none() {
            return Err(HostError::AlreadyReleased);
        }
        let current = self.state();
        if allowed.contains(&current) {
            Ok(())
        } else {
            Err(HostError::InvalidState { operation, current })
        }
    }
}

/// Drain the event queue in arrival order, transitioning state first and
/// invoking the callback after the lock is dropped. Exits when the queue
/// disconnects or the shutdown flag is raised.
fn dispatch_loop(
    shared: &Arc<Shared>,
    events: &Receiver<LifecycleEvent>,
    mut callbacks: Box<dyn ProcessEvents>,
) {
    loop {
        let event = match events.recv_timeout(SHUTDOWN_POLL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => {
                if shared.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match event {
            LifecycleEvent::StartGameSession { game_session } => {
                // Bind the result so the state guard drops before the
                // callback runs; a guard living in a match scrutinee would
                // deadlock a callback that calls back in.
                let admitted = lock(&shared.state).begin_session();
                match admitted {
                    Ok(()) => {
                        info!("session {} placed on this process", game_session.id);
                        callbacks.on_start_game_session(game_session);
                    }
                    Err(e) => warn!("dropping start-session event: {e}"),
                }
            }
            LifecycleEvent::UpdateGameSession {
                game_session,
                update_reason,
            } => {
                let current = lock(&shared.state).current();
                if current == ProcessState::Active {
                    callbacks.on_update_game_session(GameSessionUpdate {
                        game_session,
                        update_reason,
                    });
                } else {
                    warn!("dropping update-session event outside Active");
                }
            }
            LifecycleEvent::TerminateProcess => {
                let admitted = lock(&shared.state).begin_shutdown();
                match admitted {
                    Ok(()) => {
                        info!("terminate event received, notifying process");
                        callbacks.on_process_terminate();
                        // The callback may have destroyed the handle already.
                        let _ = lock(&shared.state).finish_shutdown();
                    }
                    Err(e) => warn!("dropping terminate event: {e}"),
                }
            }
            LifecycleEvent::HealthCheck => {
                let healthy = callbacks.on_health_check();
                let mut guard = lock(&shared.channel);
                if let Some(channel) = guard.as_mut() {
                    if let Err(e) = channel.notify(HostMessage::HealthStatus { healthy }) {
                        warn!("health status report failed: {e}");
                    }
                }
            }
        }
    }
    debug!("dispatcher exiting");
}

/// A mutex here only guards short critical sections; a panic inside one is
/// a test-only event and the data stays usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unexpected_reply(operation: &'static str, reply: &AgentReply) -> HostError {
    HostError::Channel(format!("unexpected reply to {operation}: {reply:?}"))
}

fn non_empty(field: &'static str, value: &str) -> Outcome<()> {
    if value.is_empty() {
        Err(HostError::InvalidArgument(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn non_empty_opt(field: &'static str, value: Option<&String>) -> Outcome<()> {
    match value {
        Some(value) => non_empty(field, value),
        None => Err(HostError::InvalidArgument(format!("{field} is required"))),
    }
}

fn validate_backfill_start(request: &StartMatchBackfillRequest) -> Outcome<()> {
    non_empty_opt(
        "matchmaking_configuration_arn",
        request.matchmaking_configuration_arn.as_ref(),
    )?;
    non_empty_opt("game_session_arn", request.game_session_arn.as_ref())?;
    match request.players.as_ref() {
        Some(players) if !players.is_empty() => {}
        Some(_) => {
            return Err(HostError::InvalidArgument(
                "players must not be empty".into(),
            ));
        }
        None => return Err(HostError::InvalidArgument("players is required".into())),
    }
    if let Some(ticket_id) = request.ticket_id.as_ref() {
        non_empty("ticket_id", ticket_id)?;
    }
    Ok(())
}

fn validate_backfill_stop(request: &StopMatchBackfillRequest) -> Outcome<()> {
    non_empty_opt("ticket_id", request.ticket_id.as_ref())?;
    non_empty_opt(
        "matchmaking_configuration_arn",
        request.matchmaking_configuration_arn.as_ref(),
    )?;
    non_empty_opt("game_session_arn", request.game_session_arn.as_ref())
}

fn validate_describe(request: &DescribePlayerSessionsRequest) -> Outcome<()> {
    let ids = [
        request.game_session_id.as_ref(),
        request.player_id.as_ref(),
        request.player_session_id.as_ref(),
    ];
    if !ids.iter().any(|id| id.is_some_and(|id| !id.is_empty())) {
        return Err(HostError::InvalidArgument(
            "one of game_session_id, player_id, player_session_id is required".into(),
        ));
    }
    if let Some(limit) = request.limit {
        if limit == 0 {
            return Err(HostError::InvalidArgument("limit must be at least 1".into()));
        }
    }
    if let Some(filter) = request.player_session_status_filter.as_ref() {
        if PlayerSessionStatus::from_filter(filter).is_none() {
            return Err(HostError::InvalidArgument(format!(
                "unknown player session status filter: {filter}"
            )));
        }
    }
    Ok(())
}
