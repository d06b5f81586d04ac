// Process lifecycle state machine.
//
// `LifecycleState` tracks where this process sits in the session lifecycle
// and is the single authority on operation legality. Every transition method
// validates the current state first and mutates only on success — a rejected
// transition returns `InvalidState` and leaves the state exactly as it was.
//
// The orchestrator drives session start/update/terminate asynchronously over
// the control channel while the hosted process drives activation and
// termination through explicit calls; the table below is the union of both.
//
//   Uninitialized --process_ready--> Ready
//   Ready         --start event----> Activating
//   Activating    --activate-------> Active
//   Active        --update event---> Active            (dispatch only)
//   Active|Activating --terminate_game_session--> Terminated
//   any non-terminal  --terminate event--> Terminating --callback--> Terminated
//   any           --process_ending/destroy--> Terminated (destroy idempotent)
//
// Locking is the owner's job: `process.rs` wraps this in a `Mutex` so the
// dispatcher thread and caller threads never observe a torn state.

use std::fmt;

use crate::error::{HostError, Outcome};

/// This process's local view of the session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// Channel open, callbacks not yet registered.
    Uninitialized,
    /// Registered with the agent, waiting for a session.
    Ready,
    /// A session was delivered; `activate_game_session` not yet called.
    Activating,
    /// Session running; player admission and backfill are legal.
    Active,
    /// Terminate event received; `on_process_terminate` is running.
    Terminating,
    /// Final state. Also entered by `destroy`.
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Ready => "Ready",
            Self::Activating => "Activating",
            Self::Active => "Active",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

/// The lifecycle state machine. One instance per process handle.
#[derive(Debug)]
pub struct LifecycleState {
    current: ProcessState,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            current: ProcessState::Uninitialized,
        }
    }

    pub fn current(&self) -> ProcessState {
        self.current
    }

    /// `process_ready` succeeded: Uninitialized → Ready.
    pub fn mark_ready(&mut self) -> Outcome<()> {
        self.step("process_ready", &[ProcessState::Uninitialized], ProcessState::Ready)
    }

    /// Agent delivered a start-session event: Ready → Activating.
    pub fn begin_session(&mut self) -> Outcome<()> {
        self.step(
            "start-session event",
            &[ProcessState::Ready],
            ProcessState::Activating,
        )
    }

    /// Local `activate_game_session`: Activating → Active.
    pub fn activate(&mut self) -> Outcome<()> {
        self.step(
            "activate_game_session",
            &[ProcessState::Activating],
            ProcessState::Active,
        )
    }

    /// Local `terminate_game_session`: Active or Activating → Terminated.
    /// Calling it without a session (Ready, Uninitialized) is an error, not
    /// a no-op.
    pub fn terminate_session(&mut self) -> Outcome<()> {
        self.step(
            "terminate_game_session",
            &[ProcessState::Active, ProcessState::Activating],
            ProcessState::Terminated,
        )
    }

    /// Agent delivered a terminate event: any non-terminal state → Terminating.
    pub fn begin_shutdown(&mut self) -> Outcome<()> {
        self.step(
            "terminate event",
            &[
                ProcessState::Uninitialized,
                ProcessState::Ready,
                ProcessState::Activating,
                ProcessState::Active,
            ],
            ProcessState::Terminating,
        )
    }

    /// `on_process_terminate` returned: Terminating → Terminated.
    pub fn finish_shutdown(&mut self) -> Outcome<()> {
        self.step(
            "terminate callback return",
            &[ProcessState::Terminating],
            ProcessState::Terminated,
        )
    }

    /// `process_ending` or `destroy`: unconditionally Terminated.
    pub fn end_process(&mut self) {
        self.current = ProcessState::Terminated;
    }

    /// Gate for operations legal only while a session is Active.
    pub fn require_active(&self, operation: &'static str) -> Outcome<()> {
        if self.current == ProcessState::Active {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn step(
        &mut self,
        operation: &'static str,
        from: &[ProcessState],
        to: ProcessState,
    ) -> Outcome<()> {
        if from.contains(&self.current) {
            self.current = to;
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> HostError {
        HostError::InvalidState {
            operation,
            current: self.current,
        }
    }
}
