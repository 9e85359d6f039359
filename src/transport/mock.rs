//! Scripted in-memory transport for session-level tests.

use super::{Transport, TransportHandle};
use crate::messaging::{Frame, FrameCommand};
use crate::types::{Result, StatusError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub(crate) enum ConnectOutcome {
    /// Open a connection and answer CONNECT with CONNECTED
    Accept,
    /// Fail the connection attempt outright
    Refuse,
}

/// Transport double that scripts connect outcomes, records every frame the
/// client sends, and lets tests inject server frames or drop the connection.
pub(crate) struct MockTransport {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    connect_calls: AtomicUsize,
    sent: Arc<Mutex<Vec<String>>>,
    server_tx: Arc<Mutex<Option<mpsc::Sender<String>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            connect_calls: AtomicUsize::new(0),
            sent: Arc::new(Mutex::new(Vec::new())),
            server_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Queues outcomes for upcoming connect calls; once the script runs out,
    /// further attempts are accepted
    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.outcomes.lock().unwrap().extend(outcomes);
    }

    pub fn refuse_next(&self, n: usize) {
        self.script((0..n).map(|_| ConnectOutcome::Refuse));
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Parsed frames the client has sent, heartbeats excluded
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|raw| Frame::parse(raw).ok().flatten())
            .collect()
    }

    pub fn sent_with_command(&self, command: FrameCommand) -> Vec<Frame> {
        self.sent_frames()
            .into_iter()
            .filter(|f| f.command == command)
            .collect()
    }

    /// Injects a raw server-to-client payload on the current connection
    pub async fn send_from_server(&self, raw: impl Into<String>) {
        let tx = self
            .server_tx
            .lock()
            .unwrap()
            .clone()
            .expect("no open mock connection");
        tx.send(raw.into()).await.expect("client went away");
    }

    /// Simulates abrupt closure of the current connection
    pub fn drop_connection(&self) {
        self.server_tx.lock().unwrap().take();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _endpoint: &str) -> Result<TransportHandle> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectOutcome::Accept);

        if matches!(outcome, ConnectOutcome::Refuse) {
            return Err(StatusError::Connection("connection refused".to_string()));
        }

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(100);
        let (incoming_tx, incoming_rx) = mpsc::channel::<String>(100);
        *self.server_tx.lock().unwrap() = Some(incoming_tx);

        // The pump holds no sender of its own, so dropping `server_tx` is
        // enough to end the client's incoming stream.
        let sent = Arc::clone(&self.sent);
        let server_tx = Arc::clone(&self.server_tx);
        tokio::spawn(async move {
            while let Some(raw) = outgoing_rx.recv().await {
                let is_connect = raw.starts_with("CONNECT\n");
                sent.lock().unwrap().push(raw);
                if is_connect {
                    let tx = server_tx.lock().unwrap().clone();
                    if let Some(tx) = tx {
                        let reply = "CONNECTED\nversion:1.2\nheart-beat:4000,4000\n\n\0";
                        let _ = tx.send(reply.to_string()).await;
                    }
                }
            }
        });

        Ok(TransportHandle {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }
}
