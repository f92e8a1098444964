//! Background poll loop draining the reader's tag buffer.
//!
//! At most one loop runs per session. It is spawned by `start_inventory`
//! and owns a [`CancellationToken`]; commands that end the inventory cancel
//! the token and await the task, so once `shutdown` returns no further read
//! can reach the inventory.

use std::fmt;
use std::sync::Arc;

use handheld_hardware::{TagRead, UhfDevice};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ScanMode;
use crate::device::PendingCall;
use crate::error::DeviceCallError;
use crate::events::SessionEvent;
use crate::inventory::RecordOutcome;
use crate::session::Shared;
use crate::state::SessionState;
use crate::status::StatusMessage;

/// Why a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollExit {
    /// A command cancelled the loop.
    Cancelled,
    /// Single tag mode read its tag.
    TargetReached { tag_count: usize },
    /// Too many transient read failures in a row.
    ReadFailures { count: u32, last_error: String },
    /// The reader went away.
    DeviceLost { error: String },
    /// The loop task panicked.
    Crashed(String),
}

impl PollExit {
    /// Whether the loop stopped without a command asking it to.
    pub(crate) fn ended_on_its_own(&self) -> bool {
        matches!(
            self,
            Self::TargetReached { .. } | Self::ReadFailures { .. } | Self::DeviceLost { .. }
        )
    }
}

impl fmt::Display for PollExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::TargetReached { tag_count } => write!(f, "target reached with {tag_count} tags"),
            Self::ReadFailures { count, last_error } => {
                write!(f, "{count} consecutive tag reads failed: {last_error}")
            }
            Self::DeviceLost { error } => write!(f, "reader lost: {error}"),
            Self::Crashed(message) => write!(f, "poll loop crashed: {message}"),
        }
    }
}

pub(crate) struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollExit>,
}

impl PollerHandle {
    pub(crate) fn spawn<D: UhfDevice>(shared: Arc<Shared<D>>, mode: ScanMode) -> Self {
        let cancel = shared.lifetime.child_token();
        let task = tokio::spawn(run(shared, mode, cancel.clone()));
        Self { cancel, task }
    }

    /// Cancel the loop and wait until it has exited.
    pub(crate) async fn shutdown(self) -> PollExit {
        self.cancel.cancel();
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => {
                warn!("Poll loop task failed: {}", e);
                PollExit::Crashed(e.to_string())
            }
        }
    }
}

async fn run<D: UhfDevice>(
    shared: Arc<Shared<D>>,
    mode: ScanMode,
    cancel: CancellationToken,
) -> PollExit {
    debug!("Poll loop started in {:?} mode", mode);
    let exit = poll(&shared, mode, &cancel).await;

    if exit.ended_on_its_own() {
        info!("Poll loop ended: {}", exit);
        settle(&shared, &exit).await;
    } else {
        debug!("Poll loop ended: {}", exit);
    }
    exit
}

async fn poll<D: UhfDevice>(
    shared: &Shared<D>,
    mode: ScanMode,
    cancel: &CancellationToken,
) -> PollExit {
    let max_failures = shared.config.max_consecutive_read_failures;
    let mut failures = 0u32;
    // A timed-out read may still return a tag, so it is awaited again.
    let mut pending: Option<PendingCall<Option<TagRead>>> = None;

    loop {
        let call = pending.get_or_insert_with(|| {
            shared
                .device
                .spawn(|device| device.read_buffered_tag())
        });
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollExit::Cancelled,
            result = shared.device.wait("read_buffered_tag", call) => result,
        };
        if !matches!(result, Err(DeviceCallError::TimedOut(_))) {
            pending = None;
        }

        match result {
            Ok(Some(read)) => {
                failures = 0;
                let Some((epc, outcome, tag_count)) = shared.merge_read(read, cancel) else {
                    return PollExit::Cancelled;
                };
                if outcome == RecordOutcome::New {
                    debug!("New tag {}", epc);
                    shared
                        .publisher
                        .emit(SessionEvent::TagDiscovered { epc });
                }
                if mode == ScanMode::SingleTag {
                    return PollExit::TargetReached { tag_count };
                }
            }
            Ok(None) => failures = 0,
            Err(error) if error.is_fatal() => {
                return PollExit::DeviceLost {
                    error: error.to_string(),
                };
            }
            Err(error) => {
                failures += 1;
                warn!(
                    "Buffered tag read failed ({}/{}): {}",
                    failures, max_failures, error
                );
                if failures >= max_failures {
                    return PollExit::ReadFailures {
                        count: failures,
                        last_error: error.to_string(),
                    };
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollExit::Cancelled,
            _ = tokio::time::sleep(shared.config.poll_interval) => {}
        }
    }
}

/// Bring the session out of `Scanning` after the loop stopped by itself.
async fn settle<D: UhfDevice>(shared: &Shared<D>, exit: &PollExit) {
    let publisher = &shared.publisher;

    match exit {
        PollExit::TargetReached { tag_count } => {
            match shared
                .device
                .call("stop_inventory", |device| device.stop_inventory())
                .await
            {
                Ok(()) => {
                    if publisher.leave_scanning(SessionState::ConnectedIdle) {
                        publisher.set_status(StatusMessage::Stopped { count: *tag_count });
                    }
                }
                Err(error) => {
                    warn!("Failed to stop inventory after single tag read: {}", error);
                    let lost = error.is_fatal();
                    publisher.emit(SessionEvent::CommandFailed {
                        operation: "stop_inventory".to_string(),
                        message: error.to_string(),
                    });
                    if lost {
                        if publisher.leave_scanning(SessionState::Failed) {
                            publisher.set_connected(false);
                            publisher.set_status(StatusMessage::error(error.to_string()));
                        }
                    } else if publisher.leave_scanning(SessionState::ConnectedIdle) {
                        publisher.set_status(StatusMessage::FailedToStopInventory);
                    }
                }
            }
        }
        PollExit::ReadFailures { .. } => {
            if let Err(error) = shared
                .device
                .call("stop_inventory", |device| device.stop_inventory())
                .await
            {
                warn!("Failed to stop inventory after read failures: {}", error);
            }
            if publisher.leave_scanning(SessionState::ConnectedIdle) {
                publisher.set_status(StatusMessage::error(exit.to_string()));
            }
            publisher.emit(SessionEvent::PollLoopTerminated {
                reason: exit.to_string(),
            });
        }
        PollExit::DeviceLost { .. } => {
            if publisher.leave_scanning(SessionState::Failed) {
                publisher.set_connected(false);
                publisher.set_status(StatusMessage::error(exit.to_string()));
            }
            publisher.emit(SessionEvent::PollLoopTerminated {
                reason: exit.to_string(),
            });
        }
        PollExit::Cancelled | PollExit::Crashed(_) => {}
    }
}
