//! Session configuration.

use std::time::Duration;

/// Delay between two poll loop iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound for a single reader call.
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Transient read failures tolerated in a row before polling gives up.
pub const DEFAULT_MAX_CONSECUTIVE_READ_FAILURES: u32 = 20;

/// Capacity of the transient event stream.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// How an inventory ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanMode {
    /// Poll until the operator stops the inventory.
    #[default]
    Continuous,

    /// Stop the inventory on its own after the first tag is read.
    SingleTag,
}

/// Configuration for a [`UhfSession`](crate::UhfSession).
///
/// # Example
///
/// ```
/// use handheld_uhf::{ScanMode, SessionConfig};
/// use std::time::Duration;
///
/// let config = SessionConfig::default()
///     .with_poll_interval(Duration::from_millis(20))
///     .with_scan_mode(ScanMode::SingleTag);
///
/// assert_eq!(config.device_timeout, Duration::from_millis(3000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Delay between poll loop iterations.
    pub poll_interval: Duration,

    /// Timeout applied to every reader call.
    pub device_timeout: Duration,

    /// Consecutive read failures after which the inventory is abandoned.
    pub max_consecutive_read_failures: u32,

    /// Scan mode used by `start_inventory`.
    pub scan_mode: ScanMode,

    /// Buffer size of the event stream; slow subscribers lose old events.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            device_timeout: DEFAULT_DEVICE_TIMEOUT,
            max_consecutive_read_failures: DEFAULT_MAX_CONSECUTIVE_READ_FAILURES,
            scan_mode: ScanMode::Continuous,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the reader call timeout.
    pub fn with_device_timeout(mut self, device_timeout: Duration) -> Self {
        self.device_timeout = device_timeout;
        self
    }

    /// Set how many read failures in a row end an inventory. Zero is treated as one.
    pub fn with_max_consecutive_read_failures(mut self, max: u32) -> Self {
        self.max_consecutive_read_failures = max.max(1);
        self
    }

    /// Set the default scan mode.
    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    /// Set the event stream capacity. Zero is treated as one.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.device_timeout, Duration::from_millis(3000));
        assert_eq!(config.max_consecutive_read_failures, 20);
        assert_eq!(config.scan_mode, ScanMode::Continuous);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_session_config_builders_clamp_zero() {
        let config = SessionConfig::default()
            .with_max_consecutive_read_failures(0)
            .with_event_capacity(0);

        assert_eq!(config.max_consecutive_read_failures, 1);
        assert_eq!(config.event_capacity, 1);
    }
}
