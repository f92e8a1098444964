//! Reader hardware abstraction layer for the handheld UHF scanner.
//!
//! This crate defines the capability the session core consumes from a UHF
//! RFID reader module: initialization, continuous inventory with a tag
//! buffer, point reads and writes of tag memory, and release. The vendor
//! SDK's serial transport and radio protocol stay behind the
//! [`UhfDevice`] trait.
//!
//! # Design
//!
//! - **Blocking**: reader modules answer over a serial link with no
//!   cancellation, so the trait is synchronous. Callers move calls onto a
//!   blocking worker.
//! - **Error-aware**: all operations return [`Result<T>`][error::Result] with
//!   a [`HardwareError`] that tells transient failures from a lost reader.
//! - **Mockable**: [`mock::MockUhfReader`] scripts tag reads and failures for
//!   development and tests.
//!
//! # Example
//!
//! ```
//! use handheld_hardware::mock::MockUhfReader;
//! use handheld_hardware::traits::{TagRead, UhfDevice};
//! use handheld_hardware::{Epc, MemoryLocation};
//!
//! let (mut reader, handle) = MockUhfReader::new();
//! let epc = Epc::new("E2801160600002084F5E1A2B").unwrap();
//! handle.push_tag(TagRead::new(epc.clone()));
//!
//! reader.init().unwrap();
//! reader.start_inventory().unwrap();
//! let read = reader.read_buffered_tag().unwrap().unwrap();
//! reader.stop_inventory().unwrap();
//!
//! reader
//!     .write_memory(&read.epc, MemoryLocation::default(), "0123456789ABCDEF")
//!     .unwrap();
//! ```

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyUhfDevice;
pub use error::{HardwareError, Result};
pub use traits::{DEFAULT_RSSI, TagRead, TagReadBuilder, UhfDevice};
pub use types::{Epc, HEX_CHARS_PER_WORD, MAX_EPC_LENGTH, MemoryBank, MemoryLocation, ReaderVersion};
