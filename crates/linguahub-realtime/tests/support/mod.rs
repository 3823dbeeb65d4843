//! Shared test support: a scripted in-memory transport and connector.

// Each test binary exercises a different subset of the helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use linguahub_core::config::realtime::RealtimeConfig;
use linguahub_core::error::AppError;
use linguahub_core::result::AppResult;
use linguahub_core::traits::token::StaticTokenProvider;
use linguahub_realtime::transport::{CloseReason, Connector, Incoming, Transport};
use linguahub_realtime::RealtimeClient;

/// Script entry consumed by one `Connector::open` call.
pub enum Step {
    /// Complete the handshake and hand the test a [`ServerHandle`].
    Accept,
    /// Fail the handshake.
    Refuse(&'static str),
    /// Never complete (exercises the connect timeout).
    Stall,
}

/// The server side of an accepted fake connection.
pub struct ServerHandle {
    /// Pushes frames or a close event to the client.
    pub inbound: mpsc::UnboundedSender<Incoming>,
    /// Receives everything the client sent.
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Resolves with the close code when the client closes the transport.
    pub closed: oneshot::Receiver<u16>,
}

impl ServerHandle {
    /// Sends a text frame to the client.
    pub fn push_frame(&self, raw: &str) {
        self.inbound
            .send(Incoming::Frame(raw.to_string()))
            .expect("client transport gone");
    }

    /// Closes the connection with a close frame.
    pub fn close_with(&self, code: u16, reason: &str) {
        self.inbound
            .send(Incoming::Closed(Some(CloseReason {
                code,
                reason: reason.to_string(),
            })))
            .expect("client transport gone");
    }

    /// Drops the connection without a close frame (abnormal closure).
    pub fn drop_abnormally(&self) {
        self.inbound
            .send(Incoming::Closed(None))
            .expect("client transport gone");
    }

    /// Drains everything the client has sent so far.
    pub fn drain_outbound(&mut self) -> Vec<String> {
        let mut sent = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            sent.push(text);
        }
        sent
    }
}

struct FakeTransport {
    inbound: mpsc::UnboundedReceiver<Incoming>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Option<oneshot::Sender<u16>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, text: String) -> AppResult<()> {
        self.outbound
            .send(text)
            .map_err(|_| AppError::connection("fake transport receiver dropped"))
    }

    async fn recv(&mut self) -> Incoming {
        match self.inbound.recv().await {
            Some(incoming) => incoming,
            None => Incoming::Closed(None),
        }
    }

    async fn close(&mut self, code: u16) -> AppResult<()> {
        if let Some(closed) = self.closed.take() {
            let _ = closed.send(code);
        }
        Ok(())
    }
}

/// Connector that follows a script of [`Step`]s and records every open.
pub struct FakeConnector {
    script: Mutex<VecDeque<Step>>,
    handles: mpsc::UnboundedSender<ServerHandle>,
    opens: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FakeConnector {
    /// Builds a connector plus the receiver on which accepted connections'
    /// server handles arrive.
    pub fn new(
        steps: impl IntoIterator<Item = Step>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerHandle>) {
        let (handles, handle_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            handles,
            opens: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        });
        (connector, handle_rx)
    }

    /// Number of `open` calls observed so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// URLs passed to `open`, in order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, url: &str) -> AppResult<Box<dyn Transport>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());

        let step = self.script.lock().pop_front().unwrap_or(Step::Accept);
        match step {
            Step::Accept => {
                let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let (closed_tx, closed_rx) = oneshot::channel();
                let _ = self.handles.send(ServerHandle {
                    inbound: inbound_tx,
                    outbound: outbound_rx,
                    closed: closed_rx,
                });
                Ok(Box::new(FakeTransport {
                    inbound: inbound_rx,
                    outbound: outbound_tx,
                    closed: Some(closed_tx),
                }))
            }
            Step::Refuse(reason) => Err(AppError::connection(reason)),
            Step::Stall => {
                futures::future::pending::<()>().await;
                unreachable!("stalled handshake never completes")
            }
        }
    }
}

/// Test endpoint; tests assert on the derived connection URL.
pub const ENDPOINT: &str = "ws://campus.test/realtime/ws";

/// Builds a client over the given connector with default settings and a
/// fixed token.
pub fn client_over(connector: Arc<FakeConnector>) -> RealtimeClient {
    RealtimeClient::new(
        ENDPOINT,
        RealtimeConfig::default(),
        connector,
        Arc::new(StaticTokenProvider::new("tok-123")),
    )
}

/// Lets spawned connection tasks run to completion without advancing the
/// paused clock.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
