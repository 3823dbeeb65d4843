//! Connection lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the realtime connection.
///
/// Tracked explicitly rather than derived from the live socket so
/// transitions stay checkable against any transport implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport has ever been opened.
    #[default]
    NotInitialized,
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is open and usable.
    Open,
    /// A close was observed and teardown is in progress.
    Closing,
    /// The connection is closed.
    Closed,
}

impl ConnectionState {
    /// Returns true if the connection is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the connection is in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "not_initialized"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_checks() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Closed.is_open());

        assert!(ConnectionState::Connecting.is_transitioning());
        assert!(ConnectionState::Closing.is_transitioning());
        assert!(!ConnectionState::Open.is_transitioning());
    }

    #[test]
    fn test_default_is_not_initialized() {
        assert_eq!(ConnectionState::default(), ConnectionState::NotInitialized);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(
            ConnectionState::NotInitialized.to_string(),
            "not_initialized"
        );
    }
}
