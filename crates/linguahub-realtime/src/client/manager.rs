//! Connection manager — owns the single realtime connection, its
//! lifecycle, reconnection policy, and event fan-out.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, info, warn};

use linguahub_core::config::realtime::RealtimeConfig;
use linguahub_core::error::AppError;
use linguahub_core::result::AppResult;
use linguahub_core::traits::token::TokenProvider;

use crate::client::backoff::ReconnectPolicy;
use crate::client::listeners::{Listeners, Subscription};
use crate::client::state::ConnectionState;
use crate::endpoint;
use crate::message::types::{ClientMessage, ServerMessage};
use crate::transport::{close_code, CloseReason, Connector, Incoming, Transport};

/// In-flight connection attempt, shared between concurrent callers.
type ConnectFuture = Shared<BoxFuture<'static, Result<(), AppError>>>;

/// Manages the single realtime connection to the LinguaHub server.
///
/// Owns connect/disconnect lifecycle, the authentication handshake,
/// keep-alive, reconnection with exponential backoff, and fan-out of
/// inbound events to registered listeners. Constructed once by the
/// application's composition root and shared from there.
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("endpoint", &self.inner.endpoint)
            .finish()
    }
}

struct ClientInner {
    /// Normalized base endpoint URL.
    endpoint: String,
    /// Client settings.
    config: RealtimeConfig,
    /// Reconnection schedule.
    policy: ReconnectPolicy,
    /// Transport factory.
    connector: Arc<dyn Connector>,
    /// Bearer token accessor.
    tokens: Arc<dyn TokenProvider>,
    /// Listener registries.
    listeners: Listeners,
    /// Mutable lifecycle state, never locked across an await point.
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    state: ConnectionState,
    reconnect_attempts: u32,
    intentional_close: bool,
    /// Generation counter; events from a superseded transport are ignored.
    epoch: u64,
    pending: Option<ConnectFuture>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    shutdown: Option<oneshot::Sender<u16>>,
}

/// What [`ClientInner::handle_frame`] decided about a frame.
#[derive(Debug, PartialEq, Eq)]
enum FrameDisposition {
    Handled,
    AuthFailure,
}

/// How a close event affects the reconnection decision.
enum CloseClass {
    Abnormal,
    AuthFailure,
    Other,
}

fn classify_close(reason: &Option<CloseReason>) -> CloseClass {
    match reason {
        None => CloseClass::Abnormal,
        Some(r) if r.code == close_code::ABNORMAL => CloseClass::Abnormal,
        Some(r) if r.code == close_code::POLICY_VIOLATION || r.code == close_code::AUTH_FAILURE => {
            CloseClass::AuthFailure
        }
        Some(_) => CloseClass::Other,
    }
}

impl RealtimeClient {
    /// Creates a client for the given endpoint. No connection is opened
    /// until [`connect`](Self::connect) is called.
    pub fn new(
        endpoint: &str,
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let policy = ReconnectPolicy::from_config(&config);
        Self {
            inner: Arc::new(ClientInner {
                endpoint: endpoint::normalize_endpoint(endpoint),
                config,
                policy,
                connector,
                tokens,
                listeners: Listeners::new(),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    /// Opens the connection.
    ///
    /// Resolves immediately when already open; a call made while another
    /// attempt is in flight awaits that same attempt instead of opening a
    /// duplicate transport.
    ///
    /// # Errors
    ///
    /// Fails when no token is available, when the transport handshake
    /// fails, or when the attempt times out. Later failures of an
    /// established connection are reported through the error listeners,
    /// not here.
    pub async fn connect(&self) -> AppResult<()> {
        ClientInner::connect_shared(&self.inner).await
    }

    /// Closes the connection intentionally; no reconnection is attempted.
    /// Safe to call when already disconnected.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Serializes and sends a message if the connection is open; drops it
    /// with a logged warning otherwise.
    pub fn send<T: Serialize>(&self, message: &T) {
        self.inner.send_serialized(message);
    }

    /// Returns whether the connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.inner.lifecycle.lock().state.is_open()
    }

    /// Returns the current lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.lifecycle.lock().state
    }

    /// Returns the number of reconnection attempts since the last
    /// successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lifecycle.lock().reconnect_attempts
    }

    /// Registers a handler for every inbound application message.
    pub fn on_message(
        &self,
        handler: impl Fn(&ServerMessage) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.on_message(handler)
    }

    /// Registers a handler for connection-level errors.
    pub fn on_error(&self, handler: impl Fn(&AppError) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.on_error(handler)
    }

    /// Registers a handler for connected/disconnected transitions.
    pub fn on_status_change(
        &self,
        handler: impl Fn(bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.on_status_change(handler)
    }

    /// Registers a handler for authentication failures. These terminate
    /// the connection without retrying; the embedding application should
    /// prompt for a fresh login.
    pub fn on_auth_error(
        &self,
        handler: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.on_auth_error(handler)
    }
}

impl ClientInner {
    /// Returns the in-flight attempt, starting one if needed.
    fn connect_shared(self: &Arc<Self>) -> ConnectFuture {
        let (stale, attempt) = {
            let mut lc = self.lifecycle.lock();
            if lc.state.is_open() {
                return futures::future::ready(Ok::<(), AppError>(())).boxed().shared();
            }
            if let Some(pending) = &lc.pending {
                return pending.clone();
            }

            // Credential check happens before any transport work.
            let token = match self.tokens.access_token() {
                Some(token) if !token.is_empty() => token,
                _ => {
                    drop(lc);
                    let err = AppError::authentication(
                        "no access token available for realtime connection",
                    );
                    warn!(error = %err, "realtime connect refused");
                    self.listeners.notify_error(&err);
                    return futures::future::ready(Err(err)).boxed().shared();
                }
            };

            lc.intentional_close = false;
            lc.state = ConnectionState::Connecting;
            // Supersede any previous transport before opening a new one.
            lc.epoch += 1;
            lc.outbound = None;
            let stale = lc.shutdown.take();

            let task = tokio::spawn(Self::establish(Arc::clone(self), token, lc.epoch));
            let attempt: ConnectFuture = async move {
                match task.await {
                    Ok(result) => result,
                    Err(e) => Err(AppError::internal(format!("connection task failed: {e}"))),
                }
            }
            .boxed()
            .shared();
            lc.pending = Some(attempt.clone());

            (stale, attempt)
        };

        if let Some(shutdown) = stale {
            let _ = shutdown.send(close_code::NORMAL);
        }

        attempt
    }

    /// Runs one connection attempt: build the URL, open the transport
    /// within the configured timeout, and hand the socket to a driver
    /// task.
    async fn establish(inner: Arc<Self>, token: String, my_epoch: u64) -> AppResult<()> {
        let url = endpoint::connection_url(&inner.endpoint, &token);
        debug!(endpoint = %inner.endpoint, "opening realtime transport");

        let timeout = Duration::from_secs(inner.config.connect_timeout_seconds);
        let mut transport = match time::timeout(timeout, inner.connector.open(&url)).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(err)) => {
                inner.fail_attempt(my_epoch, &err);
                return Err(err);
            }
            Err(_) => {
                let err = AppError::timeout(format!(
                    "realtime connection not established within {}s",
                    inner.config.connect_timeout_seconds
                ));
                inner.fail_attempt(my_epoch, &err);
                return Err(err);
            }
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let registered = {
            let mut lc = inner.lifecycle.lock();
            if lc.intentional_close || lc.epoch != my_epoch {
                false
            } else {
                lc.state = ConnectionState::Open;
                lc.reconnect_attempts = 0;
                lc.pending = None;
                lc.outbound = Some(outbound_tx);
                lc.shutdown = Some(shutdown_tx);
                true
            }
        };

        if !registered {
            // A disconnect or newer attempt raced the handshake.
            let _ = transport.close(close_code::NORMAL).await;
            return Err(AppError::connection("connection attempt superseded"));
        }

        tokio::spawn(Self::drive(
            Arc::clone(&inner),
            transport,
            outbound_rx,
            shutdown_rx,
            my_epoch,
        ));

        info!(endpoint = %inner.endpoint, "realtime connection open");
        inner.listeners.notify_status(true);
        Ok(())
    }

    /// Records a failed attempt and feeds the reconnection path.
    fn fail_attempt(self: &Arc<Self>, my_epoch: u64, err: &AppError) {
        {
            let mut lc = self.lifecycle.lock();
            if lc.epoch != my_epoch {
                return;
            }
            lc.pending = None;
            lc.state = ConnectionState::Closed;
        }
        warn!(error = %err, "realtime connection attempt failed");
        self.listeners.notify_error(err);
        self.schedule_reconnect();
    }

    /// Socket owner: pumps outbound messages, inbound frames, and the
    /// keep-alive timer until the connection ends.
    async fn drive(
        inner: Arc<Self>,
        mut transport: Box<dyn Transport>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        mut shutdown_rx: oneshot::Receiver<u16>,
        epoch: u64,
    ) {
        let period = Duration::from_secs(inner.config.keepalive_interval_seconds);
        let mut keepalive = time::interval_at(time::Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        let close_reason = loop {
            tokio::select! {
                requested = &mut shutdown_rx => {
                    let code = requested.unwrap_or(close_code::NORMAL);
                    let _ = transport.close(code).await;
                    debug!("realtime transport closed on request");
                    return;
                }

                Some(text) = outbound_rx.recv() => {
                    if let Err(err) = transport.send(text).await {
                        // Send failures are warnings; the close event is
                        // authoritative for the connection's fate.
                        warn!(error = %err, "failed to send realtime message");
                        inner.listeners.notify_error(&err);
                    }
                }

                incoming = transport.recv() => {
                    match incoming {
                        Incoming::Frame(raw) => {
                            if inner.handle_frame(&raw) == FrameDisposition::AuthFailure {
                                // Retrying with the same credential would
                                // fail identically; tear down for good.
                                inner.disconnect();
                                let _ = transport.close(close_code::NORMAL).await;
                                return;
                            }
                        }
                        Incoming::Closed(reason) => {
                            let mut lc = inner.lifecycle.lock();
                            if lc.epoch == epoch && lc.state.is_open() {
                                lc.state = ConnectionState::Closing;
                            }
                            drop(lc);
                            break reason;
                        }
                    }
                }

                _ = keepalive.tick() => {
                    match serde_json::to_string(&ClientMessage::Ping) {
                        Ok(ping) => {
                            if let Err(err) = transport.send(ping).await {
                                warn!(error = %err, "failed to send keepalive ping");
                            } else {
                                debug!("keepalive ping sent");
                            }
                        }
                        Err(err) => warn!(error = %err, "failed to serialize keepalive ping"),
                    }
                }
            }
        };

        inner.on_closed(epoch, close_reason);
    }

    /// Parses and dispatches one inbound frame.
    fn handle_frame(&self, raw: &str) -> FrameDisposition {
        let message = match ServerMessage::parse(raw) {
            Ok(message) => message,
            Err(err) => {
                // Malformed frames are dropped without disturbing the
                // connection.
                warn!(error = %err, "dropping unparseable realtime frame");
                self.listeners.notify_error(&err);
                return FrameDisposition::Handled;
            }
        };

        if message.is_auth_failure() {
            let reason = message
                .message
                .clone()
                .unwrap_or_else(|| "authentication rejected by server".to_string());
            warn!(reason = %reason, "server rejected realtime credentials");
            self.listeners.notify_auth_error(&reason);
            return FrameDisposition::AuthFailure;
        }

        debug!(kind = %message.kind, "realtime message received");
        self.listeners.notify_message(&message);
        FrameDisposition::Handled
    }

    /// Handles the end of an unexpectedly closed connection.
    fn on_closed(self: &Arc<Self>, epoch: u64, reason: Option<CloseReason>) {
        let intentional = {
            let mut lc = self.lifecycle.lock();
            if lc.epoch != epoch {
                // A superseded transport's close must not affect its
                // replacement.
                return;
            }
            lc.state = ConnectionState::Closed;
            lc.outbound = None;
            lc.shutdown = None;
            lc.pending = None;
            lc.intentional_close
        };

        match &reason {
            Some(r) => info!(code = r.code, reason = %r.reason, "realtime connection closed"),
            None => info!("realtime connection dropped without close frame"),
        }
        self.listeners.notify_status(false);

        if intentional {
            return;
        }

        match classify_close(&reason) {
            CloseClass::AuthFailure => {
                let why = reason
                    .as_ref()
                    .filter(|r| !r.reason.is_empty())
                    .map(|r| r.reason.clone())
                    .unwrap_or_else(|| "authentication rejected by server".to_string());
                warn!(reason = %why, "realtime connection closed for authentication failure");
                self.listeners.notify_auth_error(&why);
            }
            CloseClass::Abnormal => {
                self.listeners.notify_error(&AppError::connection(
                    "realtime connection lost before a close frame was received",
                ));
                self.schedule_reconnect();
            }
            CloseClass::Other => {
                self.schedule_reconnect();
            }
        }
    }

    /// Schedules the next reconnection attempt, or reports a terminal
    /// error once the attempt budget is spent.
    fn schedule_reconnect(self: &Arc<Self>) {
        let attempt = {
            let mut lc = self.lifecycle.lock();
            if lc.intentional_close {
                return;
            }
            if self.policy.exhausted(lc.reconnect_attempts) {
                drop(lc);
                error!(
                    attempts = self.policy.max_attempts,
                    "reconnect attempts exhausted, giving up"
                );
                self.listeners.notify_error(&AppError::connection(format!(
                    "reconnect attempts exhausted after {} tries",
                    self.policy.max_attempts
                )));
                return;
            }
            lc.reconnect_attempts += 1;
            lc.reconnect_attempts
        };

        let delay = self.policy.delay_for(attempt);
        info!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling realtime reconnect"
        );

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            time::sleep(delay).await;
            if inner.lifecycle.lock().intentional_close {
                debug!("reconnect cancelled, connection was closed intentionally");
                return;
            }
            // A failed retry is already surfaced through the error
            // listeners; the rejection itself is swallowed here.
            let _ = Self::connect_shared(&inner).await;
        });
    }

    fn disconnect(&self) {
        let shutdown = {
            let mut lc = self.lifecycle.lock();
            lc.intentional_close = true;
            lc.pending = None;
            lc.outbound = None;
            if lc.state != ConnectionState::NotInitialized {
                lc.state = ConnectionState::Closed;
            }
            lc.shutdown.take()
        };

        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(close_code::NORMAL);
        }

        info!("realtime connection closed by caller");
        self.listeners.notify_status(false);
    }

    fn send_serialized<T: Serialize>(&self, message: &T) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound realtime message");
                return;
            }
        };

        let lc = self.lifecycle.lock();
        match (lc.state, lc.outbound.as_ref()) {
            (ConnectionState::Open, Some(outbound)) => {
                if outbound.send(text).is_err() {
                    warn!("realtime send queue closed, message dropped");
                }
            }
            (state, _) => {
                warn!(state = %state, "realtime connection not open, message dropped");
            }
        }
    }
}
