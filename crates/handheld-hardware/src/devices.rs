//! Enum wrapper for reader backend dispatch.
//!
//! The session core is generic over [`UhfDevice`]; applications that pick a
//! backend at runtime (mock for demos, vendor UART module on the handheld)
//! hold an [`AnyUhfDevice`] instead, which dispatches to the concrete reader
//! without boxing.
//!
//! # Examples
//!
//! ```
//! use handheld_hardware::devices::AnyUhfDevice;
//! use handheld_hardware::mock::MockUhfReader;
//! use handheld_hardware::traits::UhfDevice;
//!
//! let (reader, _handle) = MockUhfReader::new();
//! let mut any_reader = AnyUhfDevice::Mock(reader);
//!
//! let version = any_reader.init().unwrap();
//! assert_eq!(version.firmware, "MOCK-UHF-1.0");
//! ```

use crate::mock::MockUhfReader;
use crate::traits::{TagRead, UhfDevice};
use crate::{Epc, MemoryLocation, ReaderVersion, Result};

/// Enum wrapper for UHF reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyUhfDevice {
    /// Mock reader for development and testing.
    Mock(MockUhfReader),
    // TODO: add a `Uart` variant wrapping the vendor module once the
    // `hardware-uart` backend lands.
}

impl UhfDevice for AnyUhfDevice {
    fn init(&mut self) -> Result<ReaderVersion> {
        match self {
            Self::Mock(device) => device.init(),
        }
    }

    fn start_inventory(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.start_inventory(),
        }
    }

    fn read_buffered_tag(&mut self) -> Result<Option<TagRead>> {
        match self {
            Self::Mock(device) => device.read_buffered_tag(),
        }
    }

    fn stop_inventory(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.stop_inventory(),
        }
    }

    fn read_memory(&mut self, epc: &Epc, location: MemoryLocation) -> Result<Option<String>> {
        match self {
            Self::Mock(device) => device.read_memory(epc, location),
        }
    }

    fn write_memory(&mut self, epc: &Epc, location: MemoryLocation, data: &str) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_memory(epc, location, data),
        }
    }

    fn release(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.release(),
        }
    }
}

impl From<MockUhfReader> for AnyUhfDevice {
    fn from(reader: MockUhfReader) -> Self {
        Self::Mock(reader)
    }
}
