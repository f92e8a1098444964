//! Error types returned by session commands.

use std::time::Duration;

use handheld_hardware::HardwareError;
use thiserror::Error;

/// Result type alias for session commands.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors returned by [`UhfSession`](crate::UhfSession) commands.
///
/// Every reader failure is converted into one of these kinds at the session
/// boundary; none of them leaves the session in an unusable state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The command needs a connected reader.
    #[error("Reader not initialized")]
    NotConnected,

    /// An inventory is already running.
    #[error("Already scanning")]
    AlreadyScanning,

    /// The reader was found but its initialization handshake failed.
    #[error("Failed to initialize UHF reader: {message}")]
    DeviceInitFailed { message: String },

    /// The reader rejected a command or returned no data.
    #[error("{operation} failed: {message}")]
    DeviceCommandFailed { operation: String, message: String },

    /// No reader module could be acquired.
    #[error("Failed to get UHF reader instance: {message}")]
    DeviceUnavailable { message: String },

    /// The reader did not answer within the configured timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    DeviceTimeout { operation: String, timeout_ms: u64 },
}

impl SessionError {
    /// Create a new command failure.
    pub fn command_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceCommandFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::DeviceTimeout {
            operation: operation.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the error came from the reader rather than from session state.
    pub fn is_device_error(&self) -> bool {
        !matches!(self, Self::NotConnected | Self::AlreadyScanning)
    }
}

/// Failure of a single blocking reader call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum DeviceCallError {
    /// The reader reported an error.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// The call did not finish within the timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    /// The blocking worker running the call panicked.
    #[error("reader call aborted: {0}")]
    Aborted(String),
}

impl DeviceCallError {
    /// Convert into the error reported for a reader command.
    pub(crate) fn into_command_error(self, operation: &str) -> SessionError {
        match self {
            Self::Hardware(error) => SessionError::command_failed(operation, error.to_string()),
            Self::TimedOut(timeout) => SessionError::timeout(operation, timeout),
            Self::Aborted(message) => SessionError::command_failed(operation, message),
        }
    }

    /// Convert into the error reported for a failed connect.
    pub(crate) fn into_init_error(self) -> SessionError {
        match self {
            Self::Hardware(HardwareError::Unavailable { message }) => {
                SessionError::DeviceUnavailable { message }
            }
            Self::Hardware(error) => SessionError::DeviceInitFailed {
                message: error.to_string(),
            },
            Self::TimedOut(timeout) => SessionError::timeout("init", timeout),
            Self::Aborted(message) => SessionError::DeviceInitFailed { message },
        }
    }

    /// Whether the reader is gone for good.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(self, Self::Hardware(error) if error.is_fatal())
    }
}
