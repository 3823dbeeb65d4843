//! # linguahub-realtime
//!
//! Client-side realtime engine for LinguaHub. Provides:
//!
//! - A single managed WebSocket connection with token authentication
//! - Idempotent connect with in-flight attempt coalescing
//! - Exponential-backoff reconnection with a bounded attempt count
//! - Keep-alive pings while the connection is open
//! - Fan-out of messages, errors, status changes, and auth failures to
//!   independently registered listeners
//! - A transport seam so the manager is testable without a network

pub mod client;
pub mod endpoint;
pub mod message;
pub mod transport;

pub use client::listeners::Subscription;
pub use client::manager::RealtimeClient;
pub use client::state::ConnectionState;
pub use message::types::{ClientMessage, MessageKind, ServerMessage};
pub use transport::tungstenite::WsConnector;
pub use transport::{close_code, CloseReason, Connector, Incoming, Transport};
