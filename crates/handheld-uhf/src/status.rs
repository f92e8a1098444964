//! Human-readable status line shown next to the reader controls.

use std::fmt;

use handheld_hardware::ReaderVersion;

/// Status text published on the status channel.
///
/// The status is derived from session state and recomputed on every change;
/// it is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    /// No reader connected.
    NotInitialized,
    /// Connect in progress.
    Initializing,
    /// Reader connected.
    Initialized { version: ReaderVersion },
    /// No reader module could be acquired.
    ReaderUnavailable,
    /// The reader rejected the initialization handshake.
    InitializationFailed,
    /// Inventory started.
    Scanning,
    /// Tags aggregated so far.
    Found { count: usize },
    /// The reader refused to start the inventory.
    FailedToStartInventory,
    /// Inventory stopped.
    Stopped { count: usize },
    /// The reader refused to stop the inventory.
    FailedToStopInventory,
    /// Connected and idle with an empty tag list.
    Ready,
    /// Reader released.
    Disconnected,
    /// Reader released but the release call reported an error.
    DisconnectedWithError { message: String },
    /// Any other failure.
    Error { message: String },
}

impl StatusMessage {
    /// Create a generic error status.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("Not initialized"),
            Self::Initializing => f.write_str("Initializing..."),
            Self::Initialized { version } => write!(f, "Initialized - Version: {version}"),
            Self::ReaderUnavailable => f.write_str("Failed to get reader instance"),
            Self::InitializationFailed => f.write_str("Initialization failed"),
            Self::Scanning => f.write_str("Scanning..."),
            Self::Found { count } => write!(f, "Found {count} tags"),
            Self::FailedToStartInventory => f.write_str("Failed to start inventory"),
            Self::Stopped { count } => write!(f, "Stopped - {count} tags found"),
            Self::FailedToStopInventory => f.write_str("Failed to stop inventory"),
            Self::Ready => f.write_str("Ready"),
            Self::Disconnected => f.write_str("Disconnected"),
            Self::DisconnectedWithError { message } => {
                write!(f, "Disconnected - release failed: {message}")
            }
            Self::Error { message } => write!(f, "Error: {message}"),
        }
    }
}
