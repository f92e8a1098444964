//! Integration tests for inventories and tag aggregation.

mod common;

use std::time::Duration;

use common::{drain, epc, fast_config, mock_session, tag, wait_for};
use handheld_hardware::HardwareError;
use handheld_hardware::mock::MockCall;
use handheld_uhf::{ScanMode, SessionError, SessionEvent, SessionState, StopOutcome};
use rstest::rstest;

#[tokio::test]
async fn test_reads_are_aggregated_by_epc() {
    let (session, handle) = mock_session(fast_config());
    for value in ["E1", "E2", "E1"] {
        handle.push_tag(tag(value));
    }
    session.connect().await.unwrap();

    session.start_inventory().await.unwrap();
    assert_eq!(session.state(), SessionState::Scanning);
    wait_for(&mut session.subscribe_tags(), |tags| {
        tags.iter().map(|tag| tag.observation_count).sum::<u32>() == 3
    })
    .await;

    let outcome = session.stop_inventory().await.unwrap();
    assert_eq!(outcome, StopOutcome::Stopped { tag_count: 2 });
    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert_eq!(session.status(), "Stopped - 2 tags found");

    let tags = session.tags();
    let e1 = tags.iter().find(|tag| tag.epc == epc("E1")).unwrap();
    let e2 = tags.iter().find(|tag| tag.epc == epc("E2")).unwrap();
    assert_eq!(e1.observation_count, 2);
    assert_eq!(e2.observation_count, 1);
    assert_eq!(e1.signal_strength, "0");
    assert_eq!(e1.tid, "");
    // E1 was read last
    assert_eq!(tags[0].epc, epc("E1"));
}

#[tokio::test]
async fn test_start_while_scanning_is_rejected() {
    let (session, handle) = mock_session(fast_config());
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;

    let error = session.start_inventory().await.unwrap_err();

    assert_eq!(error, SessionError::AlreadyScanning);
    assert_eq!(session.state(), SessionState::Scanning);
    assert_eq!(session.tags().len(), 1);
    assert_eq!(handle.call_count(MockCall::StartInventory), 1);
}

#[tokio::test]
async fn test_concurrent_starts_reach_reader_once() {
    let (session, handle) = mock_session(fast_config());
    session.connect().await.unwrap();

    let (first, second) = tokio::join!(session.start_inventory(), session.start_inventory());

    let results = [first, second];
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.contains(&Err(SessionError::AlreadyScanning)));
    assert_eq!(handle.call_count(MockCall::StartInventory), 1);
}

#[rstest]
#[case::uninitialized(false)]
#[case::disconnected(true)]
#[tokio::test]
async fn test_start_requires_connection(#[case] disconnect_first: bool) {
    let (session, handle) = mock_session(fast_config());
    if disconnect_first {
        session.connect().await.unwrap();
        session.disconnect().await.unwrap();
    }

    let error = session.start_inventory().await.unwrap_err();

    assert_eq!(error, SessionError::NotConnected);
    assert_eq!(handle.call_count(MockCall::StartInventory), 0);
}

#[tokio::test]
async fn test_stop_when_not_scanning_is_noop() {
    let (session, handle) = mock_session(fast_config());

    let outcome = session.stop_inventory().await.unwrap();

    assert_eq!(outcome, StopOutcome::NotScanning);
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(session.status(), "Not initialized");
    assert_eq!(handle.call_count(MockCall::StopInventory), 0);
}

#[tokio::test]
async fn test_failed_start_keeps_previous_results() {
    let (session, handle) = mock_session(fast_config());
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;
    session.stop_inventory().await.unwrap();

    handle.set_fail_start(true);
    let error = session.start_inventory().await.unwrap_err();

    assert!(matches!(
        error,
        SessionError::DeviceCommandFailed { ref operation, .. } if operation == "start_inventory"
    ));
    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert_eq!(session.status(), "Failed to start inventory");
    assert_eq!(session.tags().len(), 1);
}

#[tokio::test]
async fn test_new_inventory_starts_empty() {
    let (session, handle) = mock_session(fast_config());
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;
    session.stop_inventory().await.unwrap();

    session.start_inventory().await.unwrap();

    assert!(session.tags().is_empty());
    session.stop_inventory().await.unwrap();
}

#[tokio::test]
async fn test_failed_stop_still_ends_inventory() {
    let (session, handle) = mock_session(fast_config());
    handle.set_fail_stop(true);
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();

    let error = session.stop_inventory().await.unwrap_err();

    assert_eq!(
        error,
        SessionError::command_failed("stop_inventory", "Command rejected: stop_inventory")
    );
    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert_eq!(session.status(), "Failed to stop inventory");
}

#[tokio::test]
async fn test_no_reads_merged_after_stop() {
    let (session, handle) = mock_session(fast_config());
    handle.set_field(vec![tag("E1")]);
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| {
        tags.first().is_some_and(|tag| tag.observation_count >= 3)
    })
    .await;

    session.stop_inventory().await.unwrap();
    let stopped = session.tags();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(session.tags(), stopped);
    assert!(!handle.is_inventory_running());
}

#[tokio::test]
async fn test_clear_tags_while_connected() {
    let (session, handle) = mock_session(fast_config());
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;
    session.stop_inventory().await.unwrap();

    session.clear_tags();

    assert!(session.tags().is_empty());
    assert_eq!(session.status(), "Ready");
    assert_eq!(session.state(), SessionState::ConnectedIdle);
}

#[tokio::test]
async fn test_transient_read_errors_are_tolerated() {
    let (session, handle) = mock_session(fast_config());
    handle.push_read_error(HardwareError::communication("CRC mismatch"));
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();

    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;

    assert_eq!(session.state(), SessionState::Scanning);
    session.stop_inventory().await.unwrap();
}

#[tokio::test]
async fn test_repeated_read_errors_end_inventory() {
    let config = fast_config().with_max_consecutive_read_failures(3);
    let (session, handle) = mock_session(config);
    for _ in 0..3 {
        handle.push_read_error(HardwareError::communication("CRC mismatch"));
    }
    session.connect().await.unwrap();
    let mut events = session.events();

    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_state(), |state| {
        *state == SessionState::ConnectedIdle
    })
    .await;

    assert!(session.is_connected());
    assert!(session.status().starts_with("Error: 3 consecutive tag reads failed"));
    assert_eq!(handle.call_count(MockCall::StopInventory), 1);
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, SessionEvent::PollLoopTerminated { .. })));
    assert_eq!(
        session.stop_inventory().await.unwrap(),
        StopOutcome::NotScanning
    );
}

#[tokio::test]
async fn test_slow_reader_times_out() {
    let config = fast_config()
        .with_device_timeout(Duration::from_millis(10))
        .with_max_consecutive_read_failures(2);
    let (session, handle) = mock_session(config);
    session.connect().await.unwrap();
    handle.set_read_delay(Duration::from_millis(50));

    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_state(), |state| {
        *state == SessionState::ConnectedIdle
    })
    .await;

    assert!(session.status().contains("timed out after 10ms"));
    assert!(session.is_connected());
}

#[tokio::test]
async fn test_late_read_after_timeout_is_kept() {
    let config = fast_config().with_device_timeout(Duration::from_millis(40));
    let (session, handle) = mock_session(config);
    handle.push_tag(tag("E1"));
    session.connect().await.unwrap();
    handle.set_read_delay(Duration::from_millis(100));

    session.start_inventory().await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    handle.set_read_delay(Duration::ZERO);
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 1).await;

    assert_eq!(session.tags()[0].epc, epc("E1"));
    assert_eq!(session.state(), SessionState::Scanning);
    assert_eq!(handle.pending_reads(), 0);
    session.stop_inventory().await.unwrap();
}

#[tokio::test]
async fn test_stop_after_stop_keeps_results() {
    let (session, handle) = mock_session(fast_config());
    handle.push_tag(tag("E1"));
    handle.push_tag(tag("E2"));
    session.connect().await.unwrap();
    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| tags.len() == 2).await;
    assert_eq!(
        session.stop_inventory().await.unwrap(),
        StopOutcome::Stopped { tag_count: 2 }
    );
    let tags = session.tags();
    let status = session.status();

    let outcome = session.stop_inventory().await.unwrap();

    assert_eq!(outcome, StopOutcome::NotScanning);
    assert_eq!(session.tags(), tags);
    assert_eq!(session.status(), status);
    assert_eq!(session.status(), "Stopped - 2 tags found");
    assert_eq!(session.state(), SessionState::ConnectedIdle);
    assert_eq!(handle.call_count(MockCall::StopInventory), 1);
}

#[tokio::test]
async fn test_single_tag_mode_stops_after_first_read() {
    let (session, handle) = mock_session(fast_config());
    handle.set_field(vec![tag("E1"), tag("E2")]);
    session.connect().await.unwrap();

    session
        .start_inventory_with_mode(ScanMode::SingleTag)
        .await
        .unwrap();
    wait_for(&mut session.subscribe_state(), |state| {
        *state == SessionState::ConnectedIdle
    })
    .await;

    assert_eq!(session.tags().len(), 1);
    assert_eq!(session.tags()[0].epc, epc("E1"));
    assert_eq!(session.status(), "Stopped - 1 tags found");
    assert!(!handle.is_inventory_running());
}

#[tokio::test]
async fn test_tag_discovered_events() {
    let (session, handle) = mock_session(fast_config());
    for value in ["E1", "E2", "E1"] {
        handle.push_tag(tag(value));
    }
    session.connect().await.unwrap();
    let mut events = session.events();

    session.start_inventory().await.unwrap();
    wait_for(&mut session.subscribe_tags(), |tags| {
        tags.iter().map(|tag| tag.observation_count).sum::<u32>() == 3
    })
    .await;
    session.stop_inventory().await.unwrap();

    let discovered: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::TagDiscovered { epc } => Some(epc),
            _ => None,
        })
        .collect();
    assert_eq!(discovered, vec![epc("E1"), epc("E2")]);
}
