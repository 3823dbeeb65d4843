//! Transport abstraction between the connection manager and the socket.
//!
//! The manager never touches the socket directly; it drives a
//! [`Transport`] obtained from a [`Connector`]. Tests substitute a
//! scripted in-memory implementation to exercise reconnection and
//! keep-alive logic without a network.

pub mod tungstenite;

use async_trait::async_trait;

use linguahub_core::result::AppResult;

/// Well-known WebSocket close codes used by the connection manager.
pub mod close_code {
    /// Normal closure, sent on intentional disconnect.
    pub const NORMAL: u16 = 1000;
    /// Abnormal closure: the peer vanished without a close frame.
    pub const ABNORMAL: u16 = 1006;
    /// Policy violation, treated as an authentication failure.
    pub const POLICY_VIOLATION: u16 = 1008;
    /// Application-defined authentication-failure close code.
    pub const AUTH_FAILURE: u16 = 4001;
}

/// Close frame detail reported by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// WebSocket close code.
    pub code: u16,
    /// Reason text supplied by the peer, possibly empty.
    pub reason: String,
}

/// A single event produced by [`Transport::recv`].
#[derive(Debug)]
pub enum Incoming {
    /// A complete text frame.
    Frame(String),
    /// The connection ended. `None` means it dropped without a close
    /// frame (abnormal closure).
    Closed(Option<CloseReason>),
}

/// A live full-duplex text-frame channel to the server.
#[async_trait]
pub trait Transport: Send {
    /// Sends a text frame.
    async fn send(&mut self, text: String) -> AppResult<()>;

    /// Waits for the next inbound event.
    ///
    /// Must be cancel safe: the manager polls it inside a `select!` loop
    /// alongside the outbound queue and keep-alive timer.
    async fn recv(&mut self) -> Incoming;

    /// Closes the connection with the given close code.
    async fn close(&mut self, code: u16) -> AppResult<()>;
}

/// Opens transports for a connection URL.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Performs the handshake and returns a live transport.
    async fn open(&self, url: &str) -> AppResult<Box<dyn Transport>>;
}
