// Control channel to the fleet agent.
//
// `ControlChannel` is the seam between the state machine and the transport:
// the SDK only ever talks to the agent through this trait, so tests can
// substitute a mock and assert that gated operations never reach the wire.
//
// `TcpChannel` is the production implementation. Architecture (same shape
// as a blocking TCP client with a background reader):
// - `connect()` opens the TCP stream on the calling thread, then spawns a
//   reader thread.
// - The reader thread calls `read_frame()` in a loop, deserializes
//   `AgentMessage`, and routes: replies into a reply mpsc consumed by
//   `call()`, lifecycle events into the event mpsc returned from
//   `connect()` and drained by the dispatcher thread. One reader, so
//   events keep strict arrival order.
// - `call()` writes a request frame and blocks on the reply mpsc until the
//   matching `RequestId` arrives or `REPLY_TIMEOUT` expires. The SDK
//   serializes requests, so at most one reply is ever outstanding; stale
//   IDs from an aborted earlier call are skipped.
//
// When the stream breaks, the reader thread exits and drops both senders:
// pending `call()`s fail with a channel error and the dispatcher sees its
// event queue close.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use fleetward_protocol::framing::{read_frame, write_frame};
use fleetward_protocol::message::{AgentMessage, AgentReply, HostMessage, LifecycleEvent};
use fleetward_protocol::types::RequestId;

use crate::error::{HostError, Outcome};

/// How long `call()` waits for the agent's reply before giving up.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport seam between the SDK and the fleet agent.
pub trait ControlChannel: Send {
    /// Send a request and block for its reply. May block for the channel
    /// round trip, bounded by [`REPLY_TIMEOUT`]. An orchestrator-side
    /// refusal surfaces as [`HostError::Channel`].
    fn call(&mut self, message: HostMessage) -> Outcome<AgentReply>;

    /// Fire-and-forget notification (`HealthStatus`, `Goodbye`).
    fn notify(&mut self, message: HostMessage) -> Outcome<()>;

    /// Release the underlying transport. The owner guarantees at most one
    /// call.
    fn close(&mut self);
}

/// Blocking TCP implementation of [`ControlChannel`].
pub struct TcpChannel {
    writer: BufWriter<TcpStream>,
    replies: Receiver<(RequestId, AgentReply)>,
    _reader: Option<JoinHandle<()>>,
}

impl TcpChannel {
    /// Connect to the agent. Returns the channel and the lifecycle event
    /// queue its reader thread feeds.
    pub fn connect(addr: &str) -> Outcome<(Self, Receiver<LifecycleEvent>)> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| HostError::Channel(format!("connect to agent failed: {e}")))?;
        let reader_stream = stream
            .try_clone()
            .map_err(|e| HostError::Channel(format!("clone stream failed: {e}")))?;
        let writer = BufWriter::new(stream);

        let (reply_tx, reply_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            reader_loop(BufReader::new(reader_stream), reply_tx, event_tx);
        });

        Ok((
            Self {
                writer,
                replies: reply_rx,
                _reader: Some(reader),
            },
            event_rx,
        ))
    }

    fn send_frame(&mut self, message: &HostMessage) -> Outcome<()> {
        let json = serde_json::to_vec(message)
            .map_err(|e| HostError::Channel(format!("serialize request failed: {e}")))?;
        write_frame(&mut self.writer, &json)
            .map_err(|e| HostError::Channel(format!("write to agent failed: {e}")))
    }
}

impl ControlChannel for TcpChannel {
    fn call(&mut self, message: HostMessage) -> Outcome<AgentReply> {
        let Some(expected) = message.request_id() else {
            return Err(HostError::Channel(
                "message is a notification, not a request".into(),
            ));
        };
        self.send_frame(&message)?;

        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok((request_id, reply)) if request_id == expected => {
                    return match reply {
                        AgentReply::Refused { name, message } => {
                            Err(HostError::Channel(format!("agent refused ({name}): {message}")))
                        }
                        other => Ok(other),
                    };
                }
                Ok((request_id, _)) => {
                    // Reply to an earlier call that timed out — skip it.
                    warn!("discarding stale reply for request {request_id:?}");
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(HostError::Channel(format!(
                        "timed out waiting for reply to request {expected:?}"
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(HostError::Channel("control channel closed".into()));
                }
            }
        }
    }

    fn notify(&mut self, message: HostMessage) -> Outcome<()> {
        self.send_frame(&message)
    }

    fn close(&mut self) {
        // Best-effort Goodbye so the agent drops the process record promptly.
        let _ = self.send_frame(&HostMessage::Goodbye);
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        debug!("control channel closed");
    }
}

/// Reader thread: deserialize frames and route replies vs. events.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    reply_tx: Sender<(RequestId, AgentReply)>,
    event_tx: Sender<LifecycleEvent>,
) {
    loop {
        let bytes = match read_frame(&mut reader) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("agent stream closed: {e}");
                break;
            }
        };
        match serde_json::from_slice::<AgentMessage>(&bytes) {
            Ok(AgentMessage::Reply { request_id, reply }) => {
                if reply_tx.send((request_id, reply)).is_err() {
                    break; // Channel handle dropped.
                }
            }
            Ok(AgentMessage::Event(event)) => {
                if event_tx.send(event).is_err() {
                    break; // Dispatcher gone.
                }
            }
            Err(e) => {
                warn!("malformed frame from agent: {e}");
                break;
            }
        }
    }
}
