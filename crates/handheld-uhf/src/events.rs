//! Transient session events.
//!
//! Events complement the state channels: they tell a UI *that* something
//! happened (a command failed, a new tag appeared) so it can flash a toast
//! and dismiss it after a few seconds. Slow subscribers lose the oldest
//! events; the state channels remain authoritative.

use handheld_hardware::Epc;
use serde::Serialize;

use crate::state::SessionState;

/// Event broadcast by a [`UhfSession`](crate::UhfSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// The lifecycle state changed.
    StateChanged {
        from: SessionState,
        to: SessionState,
    },

    /// An EPC was read for the first time in this inventory.
    TagDiscovered { epc: Epc },

    /// A command returned an error.
    CommandFailed { operation: String, message: String },

    /// The poll loop ended without being asked to.
    PollLoopTerminated { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::StateChanged {
            from: SessionState::ConnectedIdle,
            to: SessionState::Scanning,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["from"], "connected_idle");
        assert_eq!(json["to"], "scanning");

        let event = SessionEvent::TagDiscovered {
            epc: Epc::new("3000abcd").unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["epc"], "3000ABCD");
    }
}
