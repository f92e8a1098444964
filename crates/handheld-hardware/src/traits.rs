//! Reader device trait definitions.
//!
//! This module defines the contract between the session core and a UHF
//! reader module. Vendor SDKs expose blocking calls with boolean or nullable
//! results and no cancellation; [`UhfDevice`] mirrors that shape with
//! `Result`s so the session can run each call on a blocking worker and bound
//! it with a timeout.

use crate::error::Result;
use crate::types::{Epc, MemoryLocation, ReaderVersion};

/// Default signal indicator when the reader does not report RSSI.
pub const DEFAULT_RSSI: &str = "0";

/// One tag taken from the reader's inventory buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRead {
    /// Tag EPC.
    pub epc: Epc,

    /// Tag identifier, if the reader was configured to fetch it.
    pub tid: Option<String>,

    /// Signal strength as reported by the module (dBm or vendor units).
    pub rssi: Option<String>,

    /// Timestamp when the tag was taken from the buffer.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl TagRead {
    /// Create a new tag read with the current timestamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use handheld_hardware::{Epc, TagRead};
    ///
    /// let read = TagRead::new(Epc::new("3000ABCD").unwrap());
    /// assert_eq!(read.rssi_or_default(), "0");
    /// ```
    pub fn new(epc: Epc) -> Self {
        TagReadBuilder::new(epc).build()
    }

    /// Create a builder for tag reads with optional fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use handheld_hardware::{Epc, TagRead};
    ///
    /// let read = TagRead::builder(Epc::new("3000ABCD").unwrap())
    ///     .tid("E2003412")
    ///     .rssi("-61.5")
    ///     .build();
    ///
    /// assert_eq!(read.tid.as_deref(), Some("E2003412"));
    /// ```
    pub fn builder(epc: Epc) -> TagReadBuilder {
        TagReadBuilder::new(epc)
    }

    /// Signal strength, falling back to [`DEFAULT_RSSI`].
    pub fn rssi_or_default(&self) -> &str {
        self.rssi.as_deref().unwrap_or(DEFAULT_RSSI)
    }
}

/// Builder for [`TagRead`].
#[derive(Debug, Clone)]
pub struct TagReadBuilder {
    epc: Epc,
    tid: Option<String>,
    rssi: Option<String>,
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl TagReadBuilder {
    /// Create a new builder for the given EPC.
    pub fn new(epc: Epc) -> Self {
        Self {
            epc,
            tid: None,
            rssi: None,
            timestamp: None,
        }
    }

    /// Set the tag identifier. Empty strings are treated as absent.
    pub fn tid(mut self, tid: impl Into<String>) -> Self {
        let tid = tid.into();
        self.tid = (!tid.is_empty()).then_some(tid);
        self
    }

    /// Set the reported signal strength.
    pub fn rssi(mut self, rssi: impl Into<String>) -> Self {
        self.rssi = Some(rssi.into());
        self
    }

    /// Set a custom timestamp for the read.
    ///
    /// If not set, the current time is used when `build()` is called.
    pub fn timestamp(mut self, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build the TagRead instance.
    pub fn build(self) -> TagRead {
        TagRead {
            epc: self.epc,
            tid: self.tid,
            rssi: self.rssi,
            timestamp: self.timestamp.unwrap_or_else(chrono::Utc::now),
        }
    }
}

/// Trait for UHF RFID reader modules.
///
/// All methods are blocking: a call may sit on the serial link for as long
/// as the module takes to answer. Callers are expected to run them off any
/// interactive thread (e.g. `tokio::task::spawn_blocking`).
///
/// # Examples
///
/// ```
/// use handheld_hardware::traits::UhfDevice;
/// use handheld_hardware::error::Result;
///
/// fn drain<D: UhfDevice>(reader: &mut D) -> Result<usize> {
///     reader.start_inventory()?;
///     let mut count = 0;
///     while let Some(_tag) = reader.read_buffered_tag()? {
///         count += 1;
///     }
///     reader.stop_inventory()?;
///     Ok(count)
/// }
/// ```
pub trait UhfDevice: Send + 'static {
    /// Acquire the module and run its initialization handshake.
    ///
    /// Returns the firmware version reported by the module.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::Unavailable`] if no module could be acquired
    /// - [`HardwareError::InitializationFailed`] if the handshake was rejected
    ///
    /// [`HardwareError::Unavailable`]: crate::HardwareError::Unavailable
    /// [`HardwareError::InitializationFailed`]: crate::HardwareError::InitializationFailed
    fn init(&mut self) -> Result<ReaderVersion>;

    /// Start continuous inventory; tags accumulate in the module buffer.
    fn start_inventory(&mut self) -> Result<()>;

    /// Take one tag from the inventory buffer, `None` if the buffer is empty.
    fn read_buffered_tag(&mut self) -> Result<Option<TagRead>>;

    /// Stop continuous inventory.
    fn stop_inventory(&mut self) -> Result<()>;

    /// Read a word range from the memory of the tag with the given EPC.
    ///
    /// Returns the data as hex, `None` if the module returned nothing.
    fn read_memory(&mut self, epc: &Epc, location: MemoryLocation) -> Result<Option<String>>;

    /// Write hex data into a word range of the tag with the given EPC.
    fn write_memory(&mut self, epc: &Epc, location: MemoryLocation, data: &str) -> Result<()>;

    /// Release the module. The reader must be initialized again before reuse.
    fn release(&mut self) -> Result<()>;
}
