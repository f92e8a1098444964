//! Mock UHF reader implementation for testing and development.
//!
//! This module provides a simulated reader module that can be scripted
//! programmatically: tags are pushed into its inventory buffer (or a
//! standing tag field is cycled), commands can be made to fail, and tag
//! memory is kept in an in-memory table.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{
    HardwareError, Result,
    traits::{TagRead, UhfDevice},
    types::{Epc, MemoryBank, MemoryLocation, ReaderVersion},
};

/// Device calls recorded by the mock reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    /// `init`
    Init,
    /// `start_inventory`
    StartInventory,
    /// `read_buffered_tag`
    ReadBufferedTag,
    /// `stop_inventory`
    StopInventory,
    /// `read_memory`
    ReadMemory,
    /// `write_memory`
    WriteMemory,
    /// `release`
    Release,
}

/// Entry in the simulated inventory buffer.
#[derive(Debug, Clone)]
enum BufferEntry {
    Tag(TagRead),
    Error(HardwareError),
}

#[derive(Debug)]
struct MockState {
    name: String,
    firmware: String,
    available: bool,
    init_failure: Option<String>,
    unplugged: bool,
    initialized: bool,
    inventory_running: bool,
    fail_start: bool,
    fail_stop: bool,
    fail_release: bool,
    fail_writes: bool,
    read_delay: Duration,
    buffer: VecDeque<BufferEntry>,
    field: Vec<TagRead>,
    field_cursor: usize,
    memory: HashMap<(Epc, MemoryBank), String>,
    calls: HashMap<MockCall, usize>,
}

impl MockState {
    fn new(name: String) -> Self {
        Self {
            name,
            firmware: "MOCK-UHF-1.0".to_string(),
            available: true,
            init_failure: None,
            unplugged: false,
            initialized: false,
            inventory_running: false,
            fail_start: false,
            fail_stop: false,
            fail_release: false,
            fail_writes: false,
            read_delay: Duration::ZERO,
            buffer: VecDeque::new(),
            field: Vec::new(),
            field_cursor: 0,
            memory: HashMap::new(),
            calls: HashMap::new(),
        }
    }

    fn record(&mut self, call: MockCall) {
        *self.calls.entry(call).or_default() += 1;
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.unplugged || !self.initialized {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        Ok(())
    }

    fn next_field_tag(&mut self) -> Option<TagRead> {
        if self.field.is_empty() {
            return None;
        }
        let template = &self.field[self.field_cursor % self.field.len()];
        self.field_cursor = self.field_cursor.wrapping_add(1);

        let mut read = template.clone();
        read.timestamp = chrono::Utc::now();
        Some(read)
    }
}

/// Mock UHF reader for testing and development.
///
/// # Examples
///
/// ```
/// use handheld_hardware::mock::MockUhfReader;
/// use handheld_hardware::traits::{TagRead, UhfDevice};
/// use handheld_hardware::Epc;
///
/// let (mut reader, handle) = MockUhfReader::new();
///
/// handle.push_tag(TagRead::new(Epc::new("3000ABCD").unwrap()));
///
/// reader.init().unwrap();
/// reader.start_inventory().unwrap();
///
/// let read = reader.read_buffered_tag().unwrap().unwrap();
/// assert_eq!(read.epc.as_str(), "3000ABCD");
/// assert!(reader.read_buffered_tag().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct MockUhfReader {
    state: Arc<Mutex<MockState>>,
}

impl MockUhfReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockUhfReader, MockUhfHandle) where the handle
    /// scripts the reader's behavior.
    pub fn new() -> (Self, MockUhfHandle) {
        Self::with_name("Mock UHF Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockUhfHandle) {
        let state = Arc::new(Mutex::new(MockState::new(name)));

        let reader = Self {
            state: Arc::clone(&state),
        };
        let handle = MockUhfHandle { state };

        (reader, handle)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UhfDevice for MockUhfReader {
    fn init(&mut self) -> Result<ReaderVersion> {
        let mut state = self.lock();
        state.record(MockCall::Init);

        if !state.available || state.unplugged {
            return Err(HardwareError::unavailable(format!(
                "{} not found",
                state.name
            )));
        }
        if let Some(message) = state.init_failure.clone() {
            return Err(HardwareError::initialization_failed(message));
        }

        state.initialized = true;
        Ok(ReaderVersion::new(state.firmware.clone()).with_model(state.name.clone()))
    }

    fn start_inventory(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.record(MockCall::StartInventory);
        state.ensure_ready()?;

        if state.fail_start {
            return Err(HardwareError::rejected("start_inventory"));
        }
        state.inventory_running = true;
        Ok(())
    }

    fn read_buffered_tag(&mut self) -> Result<Option<TagRead>> {
        let delay = self.lock().read_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.lock();
        state.record(MockCall::ReadBufferedTag);
        state.ensure_ready()?;

        if !state.inventory_running {
            return Ok(None);
        }

        match state.buffer.pop_front() {
            Some(BufferEntry::Tag(read)) => Ok(Some(read)),
            Some(BufferEntry::Error(error)) => Err(error),
            None => Ok(state.next_field_tag()),
        }
    }

    fn stop_inventory(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.record(MockCall::StopInventory);
        state.ensure_ready()?;

        if state.fail_stop {
            return Err(HardwareError::rejected("stop_inventory"));
        }
        state.inventory_running = false;
        Ok(())
    }

    fn read_memory(&mut self, epc: &Epc, location: MemoryLocation) -> Result<Option<String>> {
        let mut state = self.lock();
        state.record(MockCall::ReadMemory);
        state.ensure_ready()?;

        let Some(bank) = state.memory.get(&(epc.clone(), location.bank)) else {
            return Ok(None);
        };

        let start = usize::from(location.offset) * crate::types::HEX_CHARS_PER_WORD;
        let end = start + location.hex_len();
        Ok(bank.get(start..end).map(str::to_string))
    }

    fn write_memory(&mut self, epc: &Epc, location: MemoryLocation, data: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(MockCall::WriteMemory);
        state.ensure_ready()?;

        if state.fail_writes {
            return Err(HardwareError::rejected("write_memory"));
        }
        if data.len() != location.hex_len() || !data.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HardwareError::invalid_data(format!(
                "expected {} hex chars for {location}, got {data:?}",
                location.hex_len()
            )));
        }

        let start = usize::from(location.offset) * crate::types::HEX_CHARS_PER_WORD;
        let end = start + location.hex_len();
        let bank = state
            .memory
            .entry((epc.clone(), location.bank))
            .or_default();
        if bank.len() < end {
            bank.extend(std::iter::repeat_n('0', end - bank.len()));
        }
        bank.replace_range(start..end, &data.to_uppercase());
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.record(MockCall::Release);

        state.inventory_running = false;
        state.initialized = false;

        if state.fail_release {
            return Err(HardwareError::rejected("release"));
        }
        Ok(())
    }
}

/// Handle for scripting a mock UHF reader.
///
/// The handle shares state with its reader, so it keeps working after the
/// reader has been moved into a session.
///
/// # Examples
///
/// ```
/// use handheld_hardware::mock::{MockCall, MockUhfReader};
/// use handheld_hardware::traits::UhfDevice;
///
/// let (mut reader, handle) = MockUhfReader::new();
/// handle.set_fail_start(true);
///
/// reader.init().unwrap();
/// assert!(reader.start_inventory().is_err());
/// assert_eq!(handle.call_count(MockCall::StartInventory), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockUhfHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockUhfHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one tag in the inventory buffer.
    pub fn push_tag(&self, read: TagRead) {
        self.lock().buffer.push_back(BufferEntry::Tag(read));
    }

    /// Queue a read failure in the inventory buffer.
    pub fn push_read_error(&self, error: HardwareError) {
        self.lock().buffer.push_back(BufferEntry::Error(error));
    }

    /// Set the tags standing in front of the antenna.
    ///
    /// While inventory runs and the buffer is empty, every read returns the
    /// next tag of the field in round-robin order.
    pub fn set_field(&self, tags: Vec<TagRead>) {
        let mut state = self.lock();
        state.field = tags;
        state.field_cursor = 0;
    }

    /// Set the firmware version reported by `init`.
    pub fn set_firmware(&self, firmware: impl Into<String>) {
        self.lock().firmware = firmware.into();
    }

    /// Make the module (un)available for acquisition.
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Make the initialization handshake fail with the given message.
    pub fn fail_init(&self, message: impl Into<String>) {
        self.lock().init_failure = Some(message.into());
    }

    /// Make `start_inventory` fail.
    pub fn set_fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    /// Make `stop_inventory` fail.
    pub fn set_fail_stop(&self, fail: bool) {
        self.lock().fail_stop = fail;
    }

    /// Make `release` fail (the module is still released).
    pub fn set_fail_release(&self, fail: bool) {
        self.lock().fail_release = fail;
    }

    /// Make `write_memory` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Block every buffer read for the given duration.
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    /// Simulate the module disappearing: every call fails from now on.
    pub fn unplug(&self) {
        self.lock().unplugged = true;
    }

    /// Store hex data for a tag memory bank.
    pub fn set_memory(&self, epc: &Epc, bank: MemoryBank, hex: impl Into<String>) {
        self.lock()
            .memory
            .insert((epc.clone(), bank), hex.into().to_uppercase());
    }

    /// Current content of a tag memory bank.
    pub fn memory(&self, epc: &Epc, bank: MemoryBank) -> Option<String> {
        self.lock().memory.get(&(epc.clone(), bank)).cloned()
    }

    /// Whether the module is currently initialized.
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Whether inventory is currently running.
    pub fn is_inventory_running(&self) -> bool {
        self.lock().inventory_running
    }

    /// Number of entries still waiting in the inventory buffer.
    pub fn pending_reads(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Number of times the given device call was made.
    pub fn call_count(&self, call: MockCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Get the device name.
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }
}
