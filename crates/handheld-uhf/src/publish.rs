//! Observable session state.
//!
//! The session publishes four independent `watch` channels (lifecycle state,
//! tag snapshot, status text, connected flag) and one `broadcast` stream of
//! [`SessionEvent`]s. Each channel is replaced atomically, but the channels
//! are not updated together: an observer may briefly see the connected flag
//! drop before the status text catches up.

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::events::SessionEvent;
use crate::inventory::TagSnapshot;
use crate::state::SessionState;
use crate::status::StatusMessage;

pub(crate) struct Publisher {
    state: watch::Sender<SessionState>,
    tags: watch::Sender<TagSnapshot>,
    status: watch::Sender<String>,
    connected: watch::Sender<bool>,
    events: broadcast::Sender<SessionEvent>,
}

impl Publisher {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let empty: TagSnapshot = Vec::new().into();

        Self {
            state: watch::Sender::new(SessionState::Uninitialized),
            tags: watch::Sender::new(empty),
            status: watch::Sender::new(StatusMessage::NotInitialized.to_string()),
            connected: watch::Sender::new(false),
            events: broadcast::Sender::new(event_capacity),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Move to `to`, announcing the change.
    pub(crate) fn transition(&self, to: SessionState) {
        let from = self.state.send_replace(to);
        if from == to {
            return;
        }
        if !from.can_transition_to(&to) {
            warn!("Unexpected session state change {} -> {}", from, to);
        }
        self.announce(from, to);
    }

    /// Move out of `Scanning` unless a command already did.
    ///
    /// Returns `true` if this call performed the transition.
    pub(crate) fn leave_scanning(&self, to: SessionState) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if *state == SessionState::Scanning {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            self.announce(SessionState::Scanning, to);
        }
        changed
    }

    fn announce(&self, from: SessionState, to: SessionState) {
        info!("Session state {} -> {}", from, to);
        self.emit(SessionEvent::StateChanged { from, to });
    }

    pub(crate) fn tags(&self) -> TagSnapshot {
        self.tags.borrow().clone()
    }

    pub(crate) fn publish_tags(&self, snapshot: TagSnapshot) {
        self.tags.send_replace(snapshot);
    }

    pub(crate) fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub(crate) fn set_status(&self, status: StatusMessage) {
        self.status.send_replace(status.to_string());
    }

    pub(crate) fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.send_replace(connected);
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn subscribe_tags(&self) -> watch::Receiver<TagSnapshot> {
        self.tags.subscribe()
    }

    pub(crate) fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub(crate) fn subscribe_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
