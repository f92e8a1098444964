//! Error types for reader hardware operations.
//!
//! This module defines the errors a UHF reader backend can report, covering
//! a missing reader module, a rejected initialization handshake, commands the
//! radio refused, malformed tag data and a reader that went away mid-session.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during reader hardware operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// The reader module could not be acquired at all.
    #[error("Reader unavailable: {message}")]
    Unavailable { message: String },

    /// The reader was acquired but its initialization handshake failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// The reader is no longer usable (released, powered off, cable pulled).
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The reader answered a command with a failure status.
    #[error("Command rejected: {operation}")]
    Rejected { operation: String },

    /// Low-level communication error with the reader module.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from or destined to a tag.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl HardwareError {
    /// Create a new unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new rejected command error.
    pub fn rejected(operation: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Whether the reader can no longer be used after this error.
    ///
    /// Inventory polling treats every other error as transient.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected { .. } | Self::Unavailable { .. })
    }
}
