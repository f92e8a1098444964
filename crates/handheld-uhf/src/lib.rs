//! Session management for handheld UHF RFID readers.
//!
//! This crate turns a blocking [`UhfDevice`](handheld_hardware::UhfDevice)
//! into an async session with a strict lifecycle:
//!
//! - connect and disconnect the reader
//! - run inventories with a background poll loop
//! - aggregate tag reads by EPC
//! - read and write tag memory
//!
//! State is observable through `tokio::sync::watch` channels and a
//! broadcast stream of [`SessionEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use handheld_hardware::mock::MockUhfReader;
//! use handheld_uhf::{SessionConfig, UhfSession};
//!
//! # async fn example() -> handheld_uhf::Result<()> {
//! let (reader, _handle) = MockUhfReader::new();
//! let session = UhfSession::new(reader, SessionConfig::default());
//!
//! let version = session.connect().await?;
//! println!("Reader firmware {version}");
//!
//! session.start_inventory().await?;
//! // ... operator scans ...
//! session.stop_inventory().await?;
//!
//! for tag in session.tags().iter() {
//!     println!("{} seen {} times", tag.epc, tag.observation_count);
//! }
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod inventory;
pub mod state;
pub mod status;

mod device;
mod poller;
mod publish;
mod session;

pub use config::{ScanMode, SessionConfig};
pub use error::{Result, SessionError};
pub use events::SessionEvent;
pub use inventory::{TagObservation, TagSnapshot};
pub use session::{StopOutcome, UhfSession};
pub use state::SessionState;
pub use status::StatusMessage;
