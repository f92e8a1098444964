//! Integration tests for connect and disconnect.
//!
//! These tests drive a session over a scripted mock reader and check the
//! published state, status text and events.

mod common;

use common::{drain, fast_config, mock_session, tag, wait_for};
use handheld_hardware::mock::MockCall;
use handheld_uhf::{SessionError, SessionEvent, SessionState};

#[tokio::test]
async fn test_connect_publishes_version() {
    let (session, handle) = mock_session(fast_config());
    handle.set_firmware("V2.3.5");
    let mut connected = session.subscribe_connected();

    let version = session.connect().await.unwrap();

    assert_eq!(version.firmware, "V2.3.5");
    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert_eq!(version.model.as_deref(), Some("Mock UHF Reader"));
    assert_eq!(
        session.status(),
        "Initialized - Version: V2.3.5 (Mock UHF Reader)"
    );
    assert!(session.is_connected());
    assert!(*connected.borrow_and_update());
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let (session, handle) = mock_session(fast_config());

    let first = session.connect().await.unwrap();
    let second = session.connect().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(handle.call_count(MockCall::Init), 1);
}

#[tokio::test]
async fn test_connect_without_reader_fails() {
    let (session, handle) = mock_session(fast_config());
    handle.set_available(false);

    let error = session.connect().await.unwrap_err();

    assert!(matches!(error, SessionError::DeviceUnavailable { .. }));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.status(), "Failed to get reader instance");
    assert!(!session.is_connected());

    // A later connect may succeed once the module shows up
    handle.set_available(true);
    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::ConnectedIdle);
}

#[tokio::test]
async fn test_connect_rejected_handshake() {
    let (session, handle) = mock_session(fast_config());
    handle.fail_init("baud rate mismatch");
    let mut events = session.events();

    let error = session.connect().await.unwrap_err();

    assert_eq!(
        error,
        SessionError::DeviceInitFailed {
            message: "Initialization failed: baud rate mismatch".to_string()
        }
    );
    assert_eq!(session.status(), "Initialization failed");
    assert!(drain(&mut events).iter().any(|event| matches!(
        event,
        SessionEvent::CommandFailed { operation, .. } if operation == "init"
    )));
}

#[tokio::test]
async fn test_connect_emits_state_changes() {
    let (session, _handle) = mock_session(fast_config());
    let mut events = session.events();

    session.connect().await.unwrap();

    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::StateChanged {
                from: SessionState::Uninitialized,
                to: SessionState::Connecting,
            },
            SessionEvent::StateChanged {
                from: SessionState::Connecting,
                to: SessionState::ConnectedIdle,
            },
        ]
    );
}

#[tokio::test]
async fn test_disconnect_clears_everything() {
    let (session, handle) = mock_session(fast_config());
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;

    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.status(), "Disconnected");
    assert!(!session.is_connected());
    assert!(session.tags().is_empty());
    assert_eq!(handle.call_count(MockCall::StopInventory), 1);
    assert_eq!(handle.call_count(MockCall::Release), 1);
    assert!(!handle.is_initialized());
}

#[tokio::test]
async fn test_disconnect_while_scanning_with_failing_reader() {
    let (session, handle) = mock_session(fast_config());
    handle.set_fail_stop(true);
    handle.set_fail_release(true);
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();

    let error = session.disconnect().await.unwrap_err();

    assert_eq!(
        error,
        SessionError::command_failed("release", "Command rejected: release")
    );
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_connected());
    assert!(session.tags().is_empty());
    assert!(session.status().starts_with("Disconnected - release failed"));
}

#[tokio::test]
async fn test_disconnect_uninitialized_skips_release() {
    let (session, handle) = mock_session(fast_config());

    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(handle.call_count(MockCall::Release), 0);
}

#[tokio::test]
async fn test_disconnect_after_missing_reader_skips_release() {
    let (session, handle) = mock_session(fast_config());
    handle.set_available(false);
    session.connect().await.unwrap_err();
    assert_eq!(session.state(), SessionState::Failed);

    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.status(), "Disconnected");
    assert_eq!(handle.call_count(MockCall::Release), 0);
}

#[tokio::test]
async fn test_disconnect_after_rejected_handshake_releases() {
    let (session, handle) = mock_session(fast_config());
    handle.fail_init("baud rate mismatch");
    session.connect().await.unwrap_err();

    session.disconnect().await.unwrap();
    session.disconnect().await.unwrap();

    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(handle.call_count(MockCall::Release), 1);
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let (session, handle) = mock_session(fast_config());
    session.connect().await.unwrap();
    session.disconnect().await.unwrap();

    session.connect().await.unwrap();

    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert_eq!(handle.call_count(MockCall::Init), 2);
}

#[tokio::test]
async fn test_reader_lost_while_scanning() {
    let (session, handle) = mock_session(fast_config());
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();
    let mut events = session.events();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;

    handle.unplug();
    wait_for(&mut session.subscribe_state(), |state| {
        *state == SessionState::Failed
    })
    .await;

    assert!(!session.is_connected());
    assert!(session.status().starts_with("Error: reader lost"));
    // Results of the interrupted inventory stay visible
    assert_eq!(session.tags().len(), 1);
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, SessionEvent::PollLoopTerminated { .. })));

    let error = session.start_inventory().await.unwrap_err();
    assert_eq!(error, SessionError::NotConnected);

    session.disconnect().await.unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_clear_tags_before_connect() {
    let (session, _handle) = mock_session(fast_config());

    session.clear_tags();

    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(session.status(), "Not initialized");
    assert!(session.tags().is_empty());
}

#[tokio::test]
async fn test_init_error_kind_is_preserved() {
    let (session, handle) = mock_session(fast_config());
    handle.unplug();

    let error = session.connect().await.unwrap_err();

    assert!(error.is_device_error());
    assert_eq!(
        error,
        SessionError::DeviceUnavailable {
            message: "Mock UHF Reader not found".to_string()
        }
    );
    assert_eq!(session.state(), SessionState::Failed);
}
