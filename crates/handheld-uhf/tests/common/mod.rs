//! Shared helpers for session integration tests.
#![allow(dead_code)]

use std::time::Duration;

use handheld_hardware::mock::{MockUhfHandle, MockUhfReader};
use handheld_hardware::{Epc, TagRead};
use handheld_uhf::{SessionConfig, SessionEvent, UhfSession};
use tokio::sync::{broadcast, watch};

/// Upper bound for any wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

pub fn fast_config() -> SessionConfig {
    SessionConfig::default()
        .with_poll_interval(Duration::from_millis(2))
        .with_device_timeout(Duration::from_secs(1))
}

pub fn mock_session(config: SessionConfig) -> (UhfSession<MockUhfReader>, MockUhfHandle) {
    let (reader, handle) = MockUhfReader::new();
    (UhfSession::new(reader, config), handle)
}

pub fn epc(value: &str) -> Epc {
    Epc::new(value).unwrap()
}

pub fn tag(value: &str) -> TagRead {
    TagRead::new(epc(value))
}

/// Wait until the watched value satisfies `condition`.
pub async fn wait_for<T>(receiver: &mut watch::Receiver<T>, condition: impl FnMut(&T) -> bool) {
    tokio::time::timeout(WAIT, receiver.wait_for(condition))
        .await
        .expect("Timed out waiting for session update")
        .map(|_| ())
        .expect("Session dropped");
}

/// Collect every event received so far.
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}
