//! Common types shared across reader implementations.
//!
//! This module defines tag identifiers, reader version information and the
//! addressing used for tag memory operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HardwareError, Result};

/// Maximum EPC length in hex characters (496-bit Gen2 EPC).
pub const MAX_EPC_LENGTH: usize = 124;

/// Number of hex characters in one tag memory word (16 bits).
pub const HEX_CHARS_PER_WORD: usize = 4;

/// Electronic Product Code of a UHF tag, as an uppercase hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Epc(String);

impl Epc {
    /// Create a new EPC with validation.
    ///
    /// The value is normalized (trimmed and converted to uppercase) before
    /// validation.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InvalidData`] if the EPC is empty, longer than
    /// [`MAX_EPC_LENGTH`] or contains non-hex characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use handheld_hardware::Epc;
    ///
    /// let epc = Epc::new(" e2801160600002084f5e1a2b ").unwrap();
    /// assert_eq!(epc.as_str(), "E2801160600002084F5E1A2B");
    /// assert!(Epc::new("").is_err());
    /// ```
    pub fn new(value: &str) -> Result<Self> {
        let value = value.trim().to_uppercase();

        if value.is_empty() {
            return Err(HardwareError::invalid_data("EPC cannot be empty"));
        }

        if value.len() > MAX_EPC_LENGTH {
            return Err(HardwareError::invalid_data(format!(
                "EPC must be at most {MAX_EPC_LENGTH} hex chars, got {}",
                value.len()
            )));
        }

        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HardwareError::invalid_data(format!(
                "EPC must be hexadecimal, got {value}"
            )));
        }

        Ok(Self(value))
    }

    /// Get the EPC as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Epc {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self> {
        Epc::new(s)
    }
}

impl TryFrom<String> for Epc {
    type Error = HardwareError;

    fn try_from(value: String) -> Result<Self> {
        Epc::new(&value)
    }
}

impl From<Epc> for String {
    fn from(epc: Epc) -> Self {
        epc.0
    }
}

impl AsRef<str> for Epc {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Firmware/version information reported by the reader during initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderVersion {
    /// Firmware version string as reported by the module.
    pub firmware: String,

    /// Optional hardware model identifier.
    pub model: Option<String>,
}

impl ReaderVersion {
    /// Create a new ReaderVersion from the reported firmware string.
    pub fn new(firmware: impl Into<String>) -> Self {
        Self {
            firmware: firmware.into(),
            model: None,
        }
    }

    /// Version used when the module does not report one.
    pub fn unknown() -> Self {
        Self::new("Unknown")
    }

    /// Set the hardware model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl fmt::Display for ReaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} ({})", self.firmware, model),
            None => f.write_str(&self.firmware),
        }
    }
}

/// Gen2 tag memory banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBank {
    /// Kill and access passwords.
    Reserved,

    /// CRC, protocol control and EPC.
    Epc,

    /// Tag identifier.
    Tid,

    /// User memory.
    #[default]
    User,
}

impl MemoryBank {
    /// Numeric bank code used on the air interface.
    pub fn code(&self) -> u8 {
        match self {
            Self::Reserved => 0,
            Self::Epc => 1,
            Self::Tid => 2,
            Self::User => 3,
        }
    }
}

impl fmt::Display for MemoryBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reserved => "RESERVED",
            Self::Epc => "EPC",
            Self::Tid => "TID",
            Self::User => "USER",
        };
        f.write_str(name)
    }
}

/// Address of a word range inside one tag memory bank.
///
/// Offsets and lengths are counted in 16-bit words. The default addresses
/// the first four words of user memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryLocation {
    /// Memory bank to address.
    pub bank: MemoryBank,

    /// Word offset inside the bank.
    pub offset: u16,

    /// Number of words.
    pub length: u16,
}

impl MemoryLocation {
    /// Create a new memory location.
    pub fn new(bank: MemoryBank, offset: u16, length: u16) -> Self {
        Self {
            bank,
            offset,
            length,
        }
    }

    /// Number of hex characters covered by this location.
    pub fn hex_len(&self) -> usize {
        usize::from(self.length) * HEX_CHARS_PER_WORD
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new(MemoryBank::User, 0, 4)
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..+{}]", self.bank, self.offset, self.length)
    }
}
