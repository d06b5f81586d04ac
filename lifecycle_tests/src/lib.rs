// Test-only fleet agent for end-to-end lifecycle tests.
//
// `StubAgent` is a real TCP endpoint speaking the real wire protocol: the
// SDK under test connects through `ServerProcess::init` and exercises the
// same framing, reader thread, and dispatcher code paths production uses.
// The only test-specific behavior is the scripted reply table (every
// request is answered immediately) and the `push_event` hook that injects
// lifecycle events on demand.
//
// See also: `tests/lifecycle.rs` for the scenarios.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;

use fleetward_host::ProcessEvents;
use fleetward_protocol::message::{AgentMessage, AgentReply, HostMessage, LifecycleEvent};
use fleetward_protocol::model::{
    GameSession, GameSessionStatus, GameSessionUpdate, PlayerSession, PlayerSessionStatus,
};
use fleetward_protocol::{PlayerSessionPage, read_frame, write_frame};

/// Default timeout for blocking waits in tests.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A scripted fleet agent on a real TCP socket.
pub struct StubAgent {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<HostMessage>>>,
    writer: Arc<Mutex<Option<BufWriter<TcpStream>>>>,
}

impl StubAgent {
    /// Bind an ephemeral port and accept one SDK connection in the
    /// background.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub agent");
        let addr = listener.local_addr().expect("stub agent addr");
        let received = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::new(Mutex::new(None));

        let thread_received = Arc::clone(&received);
        let thread_writer = Arc::clone(&writer);
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept SDK connection");
            let mut reader =
                BufReader::new(stream.try_clone().expect("clone stub agent stream"));
            *thread_writer.lock().unwrap() = Some(BufWriter::new(stream));

            while let Ok(bytes) = read_frame(&mut reader) {
                let message: HostMessage =
                    serde_json::from_slice(&bytes).expect("decode host message");
                let reply = Self::reply_for(&message);
                thread_received.lock().unwrap().push(message);
                if let Some((request_id, reply)) = reply {
                    let frame = serde_json::to_vec(&AgentMessage::Reply { request_id, reply })
                        .expect("encode reply");
                    let mut guard = thread_writer.lock().unwrap();
                    if let Some(writer) = guard.as_mut() {
                        write_frame(writer, &frame).expect("write reply");
                    }
                }
            }
        });

        Self {
            addr,
            received,
            writer,
        }
    }

    /// The reply table: every request gets an immediate answer,
    /// notifications get none.
    fn reply_for(message: &HostMessage) -> Option<(fleetward_protocol::RequestId, AgentReply)> {
        let request_id = message.request_id()?;
        let reply = match message {
            HostMessage::StartMatchBackfill { .. } => AgentReply::BackfillTicket {
                ticket_id: format!("ticket-{}", request_id.0),
            },
            HostMessage::DescribePlayerSessions { .. } => {
                AgentReply::PlayerSessionPage(PlayerSessionPage {
                    player_sessions: vec![sample_player_session()],
                    next_token: None,
                })
            }
            _ => AgentReply::Ack,
        };
        Some((request_id, reply))
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Inject a lifecycle event onto the wire. Blocks until the SDK has
    /// connected.
    pub fn push_event(&self, event: LifecycleEvent) {
        let frame = serde_json::to_vec(&AgentMessage::Event(event)).expect("encode event");
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            {
                let mut guard = self.writer.lock().unwrap();
                if let Some(writer) = guard.as_mut() {
                    write_frame(writer, &frame).expect("write event");
                    return;
                }
            }
            assert!(Instant::now() < deadline, "SDK never connected");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Snapshot of every host message received so far, in arrival order.
    pub fn received(&self) -> Vec<HostMessage> {
        self.received.lock().unwrap().clone()
    }

    /// Block until a received message matches, or panic with `what` after
    /// the timeout.
    pub fn wait_for(&self, what: &str, pred: impl Fn(&HostMessage) -> bool) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            if self.received.lock().unwrap().iter().any(&pred) {
                return;
            }
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Callbacks that forward each invocation as a label for ordering asserts.
pub struct RecordingCallbacks {
    pub log: Sender<String>,
    pub healthy: bool,
}

impl ProcessEvents for RecordingCallbacks {
    fn on_start_game_session(&mut self, game_session: GameSession) {
        self.log
            .send(format!("start:{}", game_session.id))
            .expect("record start");
    }

    fn on_update_game_session(&mut self, update: GameSessionUpdate) {
        self.log
            .send(format!("update:{:?}", update.update_reason))
            .expect("record update");
    }

    fn on_process_terminate(&mut self) {
        self.log.send("terminate".into()).expect("record terminate");
    }

    fn on_health_check(&mut self) -> bool {
        self.log
            .send(format!("health:{}", self.healthy))
            .expect("record health");
        self.healthy
    }
}

pub fn sample_game_session() -> GameSession {
    GameSession {
        id: "gsess-e2e".into(),
        name: "arena".into(),
        fleet_id: "fleet-e2e".into(),
        maximum_player_session_count: 16,
        status: GameSessionStatus::Activating,
        ip_address: "127.0.0.1".into(),
        port: 7777,
        game_session_data: String::new(),
        matchmaker_data: String::new(),
    }
}

pub fn sample_player_session() -> PlayerSession {
    PlayerSession {
        player_session_id: "psess-1".into(),
        player_id: "p-1".into(),
        game_session_id: "gsess-e2e".into(),
        fleet_id: "fleet-e2e".into(),
        creation_time: Utc::now(),
        termination_time: None,
        status: PlayerSessionStatus::Reserved,
        ip_address: "127.0.0.1".into(),
        port: 7777,
        player_data: String::new(),
        dns_name: "host.example".into(),
    }
}
