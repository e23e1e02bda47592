// In-memory transport for driving the supervisor without sockets

use crate::codec::{InboundFragment, OutboundChunk};
use crate::error::NotificationError;
use crate::transport::{Channel, Connector};

use common::ErrorLocation;

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

/// What the connector does on one connect attempt.
pub(crate) enum Step {
    Fail,
    Open(ScriptedChannel),
    Hang,
}

pub(crate) struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    pub(crate) attempts: Arc<AtomicUsize>,
    /// When each connect attempt started, on the tokio clock.
    pub(crate) attempt_times: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedConnector {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            attempts: Arc::new(AtomicUsize::new(0)),
            attempt_times: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Connector for ScriptedConnector {
    type Channel = ScriptedChannel;

    async fn connect(&self, endpoint: &str) -> Result<ScriptedChannel, NotificationError> {
        self.attempt_times.lock().unwrap().push(Instant::now());
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            Some(Step::Open(channel)) => Ok(channel),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Fail) | None => Err(NotificationError::Connect {
                message: format!("connection to {endpoint} refused"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

pub(crate) struct ScriptedChannel {
    inbound: mpsc::UnboundedReceiver<Result<InboundFragment, NotificationError>>,
    sent: mpsc::UnboundedSender<OutboundChunk>,
    closed: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

/// Test side of a [`ScriptedChannel`].
pub(crate) struct Peer {
    pub(crate) inbound: mpsc::UnboundedSender<Result<InboundFragment, NotificationError>>,
    pub(crate) sent: mpsc::UnboundedReceiver<OutboundChunk>,
    pub(crate) closed: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

impl Peer {
    /// Stop reading: every later `send_chunk` and the closing handshake on the
    /// channel never complete.
    pub(crate) fn stall_sends(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn push(&self, fragment: InboundFragment) {
        self.inbound.send(Ok(fragment)).unwrap();
    }

    pub(crate) fn push_text(&self, text: &str) {
        self.push(InboundFragment::text(text, true));
    }

    pub(crate) fn fail_read(&self) {
        self.inbound
            .send(Err(NotificationError::Read {
                message: String::from("connection reset"),
                location: ErrorLocation::from(Location::caller()),
            }))
            .unwrap();
    }

    /// Collect chunks until one marked final arrives; returns the joined text.
    pub(crate) async fn next_message(&mut self) -> (String, Vec<OutboundChunk>) {
        let mut chunks = Vec::new();
        loop {
            let chunk = tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
                .await
                .expect("timed out waiting for outbound chunk")
                .expect("channel dropped");
            let is_final = chunk.is_final;
            chunks.push(chunk);
            if is_final {
                break;
            }
        }
        let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.data.clone()).collect();
        (String::from_utf8(bytes).unwrap(), chunks)
    }
}

pub(crate) fn scripted_channel() -> (ScriptedChannel, Peer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    let stalled = Arc::new(AtomicBool::new(false));

    let channel = ScriptedChannel {
        inbound: inbound_rx,
        sent: sent_tx,
        closed: Arc::clone(&closed),
        stalled: Arc::clone(&stalled),
    };
    let peer = Peer {
        inbound: inbound_tx,
        sent: sent_rx,
        closed,
        stalled,
    };
    (channel, peer)
}

impl Channel for ScriptedChannel {
    async fn send_chunk(&mut self, chunk: OutboundChunk) -> Result<(), NotificationError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.sent.send(chunk).map_err(|_| NotificationError::Send {
            message: String::from("peer gone"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn next_fragment(&mut self) -> Option<Result<InboundFragment, NotificationError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub(crate) async fn eventually<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
