//! Reader session lifecycle states.
//!
//! # Valid Transitions
//!
//! - Uninitialized/Disconnected/Failed → Connecting → ConnectedIdle/Failed
//! - ConnectedIdle → Scanning → ConnectedIdle/Failed
//! - any state except Connecting/Disconnecting → Disconnecting → Disconnected
//!
//! # Examples
//!
//! ```
//! use handheld_uhf::SessionState;
//!
//! assert!(SessionState::ConnectedIdle.can_transition_to(&SessionState::Scanning));
//! assert!(!SessionState::Uninitialized.can_transition_to(&SessionState::Scanning));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the reader session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No reader has been acquired yet.
    #[default]
    Uninitialized,

    /// Initialization handshake in progress.
    Connecting,

    /// Reader ready, no inventory running.
    ConnectedIdle,

    /// Inventory running, poll loop active.
    Scanning,

    /// Teardown in progress.
    Disconnecting,

    /// Reader released by the operator.
    Disconnected,

    /// Connect failed or the reader was lost while scanning.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::Connecting => "Connecting",
            SessionState::ConnectedIdle => "ConnectedIdle",
            SessionState::Scanning => "Scanning",
            SessionState::Disconnecting => "Disconnecting",
            SessionState::Disconnected => "Disconnected",
            SessionState::Failed => "Failed",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            // Connect
            (
                SessionState::Uninitialized | SessionState::Disconnected | SessionState::Failed,
                SessionState::Connecting
            )
            | (SessionState::Connecting, SessionState::ConnectedIdle | SessionState::Failed)
            // Inventory
            | (SessionState::ConnectedIdle, SessionState::Scanning)
            | (SessionState::Scanning, SessionState::ConnectedIdle | SessionState::Failed)
            // Disconnect
            | (
                SessionState::Uninitialized
                    | SessionState::ConnectedIdle
                    | SessionState::Scanning
                    | SessionState::Disconnected
                    | SessionState::Failed,
                SessionState::Disconnecting
            )
            | (SessionState::Disconnecting, SessionState::Disconnected)
        )
    }

    /// Whether a reader is connected and accepts commands.
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::ConnectedIdle | SessionState::Scanning)
    }

    /// Whether a connect request has to initialize the reader.
    pub fn needs_connect(&self) -> bool {
        matches!(
            self,
            SessionState::Uninitialized | SessionState::Disconnected | SessionState::Failed
        )
    }
}
