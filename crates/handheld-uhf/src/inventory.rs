//! Tag aggregation.
//!
//! Every buffered read is folded into a [`TagInventory`] keyed by EPC: the
//! first read of an EPC creates a [`TagObservation`], later reads bump its
//! count and replace signal strength and timestamp. Observers never see the
//! map itself, only immutable [`TagSnapshot`]s sorted most recent first.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use handheld_hardware::{Epc, TagRead};
use serde::Serialize;

/// Immutable copy of the aggregated tag set, most recently seen first.
pub type TagSnapshot = Arc<[TagObservation]>;

/// One physical tag as currently known to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagObservation {
    /// Tag EPC, unique within the inventory.
    pub epc: Epc,

    /// Tag identifier, empty if the reader did not report one.
    pub tid: String,

    /// Last reported signal strength.
    pub signal_strength: String,

    /// Buffer reads of this EPC since the inventory was last cleared.
    pub observation_count: u32,

    /// Timestamp of the most recent read.
    pub last_seen_at: DateTime<Utc>,

    #[serde(skip)]
    sequence: u64,
}

impl TagObservation {
    fn first(read: TagRead, sequence: u64) -> Self {
        Self {
            signal_strength: read.rssi_or_default().to_string(),
            tid: read.tid.unwrap_or_default(),
            epc: read.epc,
            observation_count: 1,
            last_seen_at: read.timestamp,
            sequence,
        }
    }

    fn update(&mut self, read: TagRead, sequence: u64) {
        self.observation_count = self.observation_count.saturating_add(1);
        self.signal_strength = read.rssi_or_default().to_string();
        if let Some(tid) = read.tid {
            self.tid = tid;
        }
        self.last_seen_at = read.timestamp;
        self.sequence = sequence;
    }
}

/// Result of folding one read into the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First read of this EPC.
    New,
    /// EPC already known; carries the new observation count.
    Updated { observation_count: u32 },
}

/// Aggregated tag set of the current inventory.
///
/// # Examples
///
/// ```
/// use handheld_hardware::{Epc, TagRead};
/// use handheld_uhf::inventory::{RecordOutcome, TagInventory};
///
/// let mut inventory = TagInventory::new();
/// let e1 = Epc::new("E1").unwrap();
///
/// assert_eq!(inventory.record(TagRead::new(e1.clone())), RecordOutcome::New);
/// assert_eq!(
///     inventory.record(TagRead::new(e1.clone())),
///     RecordOutcome::Updated { observation_count: 2 }
/// );
/// assert_eq!(inventory.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TagInventory {
    tags: HashMap<Epc, TagObservation>,
    next_sequence: u64,
}

impl TagInventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one buffered read into the inventory.
    pub fn record(&mut self, read: TagRead) -> RecordOutcome {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        match self.tags.get_mut(&read.epc) {
            Some(observation) => {
                observation.update(read, sequence);
                RecordOutcome::Updated {
                    observation_count: observation.observation_count,
                }
            }
            None => {
                self.tags
                    .insert(read.epc.clone(), TagObservation::first(read, sequence));
                RecordOutcome::New
            }
        }
    }

    /// Look up the observation of one EPC.
    pub fn get(&self, epc: &Epc) -> Option<&TagObservation> {
        self.tags.get(epc)
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether no tag has been seen.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Drop every observation.
    pub fn clear(&mut self) {
        self.tags.clear();
    }

    /// Copy the current set, most recently seen first.
    pub fn snapshot(&self) -> TagSnapshot {
        let mut tags: Vec<TagObservation> = self.tags.values().cloned().collect();
        tags.sort_by(|a, b| {
            b.last_seen_at
                .cmp(&a.last_seen_at)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });
        tags.into()
    }
}
