//! The reader session.
//!
//! [`UhfSession`] owns one reader and drives it through the lifecycle in
//! [`SessionState`]. Commands are serialized: a command holds the control
//! lock for its whole duration, so two `start_inventory` calls can never both
//! reach the reader. Observers read state without taking that lock, through
//! the snapshot getters or the `subscribe_*` channels.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use handheld_hardware::{Epc, HardwareError, MemoryLocation, ReaderVersion, TagRead, UhfDevice};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ScanMode, SessionConfig};
use crate::device::DeviceCell;
use crate::error::{DeviceCallError, Result, SessionError};
use crate::events::SessionEvent;
use crate::inventory::{RecordOutcome, TagInventory, TagSnapshot};
use crate::poller::PollerHandle;
use crate::publish::Publisher;
use crate::state::SessionState;
use crate::status::StatusMessage;

/// Result of a successful `stop_inventory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The inventory was running and has been stopped.
    Stopped { tag_count: usize },
    /// No inventory was running; nothing changed.
    NotScanning,
}

#[derive(Default)]
struct Control {
    version: Option<ReaderVersion>,
    poller: Option<PollerHandle>,
    /// The reader may hold driver resources that need a `release`.
    acquired: bool,
}

impl Control {
    /// Wait for a poll loop that already ended on its own.
    async fn reap_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            let exit = poller.shutdown().await;
            debug!("Reaped poll loop: {}", exit);
        }
    }
}

/// State shared between session handles and the poll loop.
pub(crate) struct Shared<D> {
    pub(crate) config: SessionConfig,
    pub(crate) device: DeviceCell<D>,
    pub(crate) publisher: Publisher,
    pub(crate) lifetime: CancellationToken,
    inventory: Mutex<TagInventory>,
    control: tokio::sync::Mutex<Control>,
}

impl<D: UhfDevice> Shared<D> {
    fn inventory(&self) -> MutexGuard<'_, TagInventory> {
        self.inventory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold a read into the inventory unless the loop was cancelled.
    ///
    /// The cancellation check and the publication happen under the inventory
    /// lock, so a read racing a stop is either fully visible before the stop
    /// completes or discarded.
    pub(crate) fn merge_read(
        &self,
        read: TagRead,
        cancel: &CancellationToken,
    ) -> Option<(Epc, RecordOutcome, usize)> {
        let mut inventory = self.inventory();
        if cancel.is_cancelled() {
            return None;
        }

        let epc = read.epc.clone();
        let outcome = inventory.record(read);
        let count = inventory.len();
        self.publisher.publish_tags(inventory.snapshot());
        self.publisher.set_status(StatusMessage::Found { count });
        Some((epc, outcome, count))
    }

    fn tag_count(&self) -> usize {
        self.inventory().len()
    }

    fn clear_inventory(&self) {
        let mut inventory = self.inventory();
        inventory.clear();
        self.publisher.publish_tags(inventory.snapshot());
    }

    /// Stop and release the reader after the last handle went away.
    async fn teardown(&self) {
        let mut control = self.control.lock().await;
        let publisher = &self.publisher;
        if publisher.state() == SessionState::Disconnected {
            return;
        }

        let scanning = publisher.state() == SessionState::Scanning;
        if let Some(poller) = control.poller.take() {
            let exit = poller.shutdown().await;
            debug!("Poll loop ended during teardown: {}", exit);
        }
        if scanning {
            if let Err(e) = self
                .device
                .call("stop_inventory", |device| device.stop_inventory())
                .await
            {
                warn!("Failed to stop inventory during teardown: {}", e);
            }
        }
        if control.acquired {
            if let Err(e) = self.device.call("release", |device| device.release()).await {
                warn!("Failed to release reader during teardown: {}", e);
            }
            control.acquired = false;
        }

        control.version = None;
        publisher.set_connected(false);
        publisher.transition(SessionState::Disconnected);
        publisher.set_status(StatusMessage::Disconnected);
        info!("UHF session dropped, reader released");
    }

    fn report_failure(&self, operation: &str, error: &SessionError) {
        warn!("{} failed: {}", operation, error);
        self.publisher.emit(SessionEvent::CommandFailed {
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }
}

/// Session manager for one UHF reader.
///
/// Cloning yields another handle to the same session. Call
/// [`disconnect`](Self::disconnect) to end a session; if the last handle is
/// dropped instead, the poll loop is cancelled and a background task stops
/// and releases the reader.
///
/// # Examples
///
/// ```
/// use handheld_hardware::mock::MockUhfReader;
/// use handheld_hardware::{Epc, TagRead};
/// use handheld_uhf::{SessionConfig, SessionState, StopOutcome, UhfSession};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> handheld_uhf::Result<()> {
/// let (reader, handle) = MockUhfReader::new();
/// handle.push_tag(TagRead::new(Epc::new("E200001").unwrap()));
///
/// let session = UhfSession::new(reader, SessionConfig::default());
/// session.connect().await?;
/// session.start_inventory().await?;
///
/// let mut tags = session.subscribe_tags();
/// tags.wait_for(|tags| !tags.is_empty()).await.unwrap();
///
/// assert!(matches!(session.stop_inventory().await?, StopOutcome::Stopped { tag_count: 1 }));
/// assert_eq!(session.state(), SessionState::ConnectedIdle);
/// # Ok(())
/// # }
/// ```
pub struct UhfSession<D: UhfDevice> {
    shared: Arc<Shared<D>>,
    _guard: Arc<SessionGuard<D>>,
}

impl<D: UhfDevice> Clone for UhfSession<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _guard: Arc::clone(&self._guard),
        }
    }
}

/// Dropped together with the last session handle.
struct SessionGuard<D: UhfDevice> {
    shared: Arc<Shared<D>>,
}

impl<D: UhfDevice> Drop for SessionGuard<D> {
    fn drop(&mut self) {
        self.shared.lifetime.cancel();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::clone(&self.shared);
                runtime.spawn(async move { shared.teardown().await });
            }
            Err(_) => {
                if self.shared.publisher.state() != SessionState::Disconnected {
                    warn!("UHF session dropped outside a runtime, reader not released");
                }
            }
        }
    }
}

impl<D: UhfDevice> UhfSession<D> {
    /// Create a session around a reader that has not been initialized yet.
    pub fn new(device: D, config: SessionConfig) -> Self {
        let shared = Arc::new(Shared {
            device: DeviceCell::new(device, config.device_timeout),
            publisher: Publisher::new(config.event_capacity),
            lifetime: CancellationToken::new(),
            inventory: Mutex::new(TagInventory::new()),
            control: tokio::sync::Mutex::new(Control::default()),
            config,
        });

        Self {
            _guard: Arc::new(SessionGuard {
                shared: Arc::clone(&shared),
            }),
            shared,
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Acquire and initialize the reader.
    ///
    /// Connecting an already connected session returns the cached version
    /// without touching the reader.
    pub async fn connect(&self) -> Result<ReaderVersion> {
        let mut control = self.shared.control.lock().await;
        let publisher = &self.shared.publisher;

        if !publisher.state().needs_connect() {
            debug!("UHF reader already connected");
            return Ok(control.version.clone().unwrap_or_else(ReaderVersion::unknown));
        }
        control.reap_poller().await;

        info!("Connecting to UHF reader");
        publisher.transition(SessionState::Connecting);
        publisher.set_status(StatusMessage::Initializing);

        match self.shared.device.call("init", |device| device.init()).await {
            Ok(version) => {
                info!("UHF reader initialized, version {}", version);
                control.acquired = true;
                control.version = Some(version.clone());
                publisher.set_connected(true);
                publisher.transition(SessionState::ConnectedIdle);
                publisher.set_status(StatusMessage::Initialized {
                    version: version.clone(),
                });
                Ok(version)
            }
            Err(error) => {
                let status = match &error {
                    DeviceCallError::Hardware(HardwareError::Unavailable { .. }) => {
                        StatusMessage::ReaderUnavailable
                    }
                    DeviceCallError::Hardware(HardwareError::InitializationFailed { .. }) => {
                        StatusMessage::InitializationFailed
                    }
                    other => StatusMessage::error(other.to_string()),
                };
                // Without an instance there is nothing to release.
                if !matches!(
                    error,
                    DeviceCallError::Hardware(HardwareError::Unavailable { .. })
                ) {
                    control.acquired = true;
                }
                let error = error.into_init_error();

                control.version = None;
                publisher.set_connected(false);
                publisher.transition(SessionState::Failed);
                publisher.set_status(status);
                self.shared.report_failure("init", &error);
                Err(error)
            }
        }
    }

    /// Start an inventory in the configured scan mode.
    pub async fn start_inventory(&self) -> Result<()> {
        self.start_inventory_with_mode(self.shared.config.scan_mode)
            .await
    }

    /// Start an inventory in the given scan mode.
    ///
    /// The tag set is cleared only once the reader has accepted the start;
    /// a refused start leaves the previous results in place.
    pub async fn start_inventory_with_mode(&self, mode: ScanMode) -> Result<()> {
        let mut control = self.shared.control.lock().await;
        let publisher = &self.shared.publisher;

        match publisher.state() {
            SessionState::ConnectedIdle => {}
            SessionState::Scanning => {
                let error = SessionError::AlreadyScanning;
                self.shared.report_failure("start_inventory", &error);
                return Err(error);
            }
            _ => {
                let error = SessionError::NotConnected;
                self.shared.report_failure("start_inventory", &error);
                return Err(error);
            }
        }
        control.reap_poller().await;

        if let Err(error) = self
            .shared
            .device
            .call("start_inventory", |device| device.start_inventory())
            .await
        {
            let error = error.into_command_error("start_inventory");
            publisher.set_status(StatusMessage::FailedToStartInventory);
            self.shared.report_failure("start_inventory", &error);
            return Err(error);
        }

        self.shared.clear_inventory();
        publisher.transition(SessionState::Scanning);
        publisher.set_status(StatusMessage::Scanning);
        control.poller = Some(PollerHandle::spawn(Arc::clone(&self.shared), mode));

        info!("Inventory started in {:?} mode", mode);
        Ok(())
    }

    /// Stop the running inventory.
    ///
    /// Returns [`StopOutcome::NotScanning`] without touching the reader when
    /// no inventory is running. Once this returns, no further read reaches
    /// the tag set.
    pub async fn stop_inventory(&self) -> Result<StopOutcome> {
        let mut control = self.shared.control.lock().await;
        let publisher = &self.shared.publisher;

        if publisher.state() != SessionState::Scanning {
            control.reap_poller().await;
            return Ok(StopOutcome::NotScanning);
        }

        if let Some(poller) = control.poller.take() {
            let exit = poller.shutdown().await;
            if exit.ended_on_its_own() {
                return Ok(StopOutcome::NotScanning);
            }
        }

        let tag_count = self.shared.tag_count();
        let result = self
            .shared
            .device
            .call("stop_inventory", |device| device.stop_inventory())
            .await;
        publisher.transition(SessionState::ConnectedIdle);

        match result {
            Ok(()) => {
                info!("Inventory stopped with {} tags", tag_count);
                publisher.set_status(StatusMessage::Stopped { count: tag_count });
                Ok(StopOutcome::Stopped { tag_count })
            }
            Err(error) => {
                let error = error.into_command_error("stop_inventory");
                publisher.set_status(StatusMessage::FailedToStopInventory);
                self.shared.report_failure("stop_inventory", &error);
                Err(error)
            }
        }
    }

    /// Empty the tag set. Allowed in every state.
    pub fn clear_tags(&self) {
        self.shared.clear_inventory();

        let publisher = &self.shared.publisher;
        let status = if publisher.is_connected() {
            StatusMessage::Ready
        } else {
            StatusMessage::NotInitialized
        };
        publisher.set_status(status);
    }

    /// Read tag memory as a hex string.
    pub async fn read_tag_data(&self, epc: &Epc, location: MemoryLocation) -> Result<String> {
        let _control = self.shared.control.lock().await;

        let result = self.read_memory(epc, location).await;
        if let Err(error) = &result {
            self.shared.report_failure("read_memory", error);
        }
        result
    }

    async fn read_memory(&self, epc: &Epc, location: MemoryLocation) -> Result<String> {
        if !self.shared.publisher.state().is_connected() {
            return Err(SessionError::NotConnected);
        }

        let target = epc.clone();
        let data = self
            .shared
            .device
            .call("read_memory", move |device| device.read_memory(&target, location))
            .await
            .map_err(|e| e.into_command_error("read_memory"))?;

        match data {
            Some(data) if !data.is_empty() => {
                debug!("Read {} from {}: {}", location, epc, data);
                Ok(data)
            }
            _ => Err(SessionError::command_failed(
                "read_memory",
                "no data available",
            )),
        }
    }

    /// Write a hex string to tag memory.
    pub async fn write_tag_data(
        &self,
        epc: &Epc,
        location: MemoryLocation,
        data: &str,
    ) -> Result<()> {
        let _control = self.shared.control.lock().await;

        if !self.shared.publisher.state().is_connected() {
            let error = SessionError::NotConnected;
            self.shared.report_failure("write_memory", &error);
            return Err(error);
        }

        let target = epc.clone();
        let payload = data.to_string();
        match self
            .shared
            .device
            .call("write_memory", move |device| {
                device.write_memory(&target, location, &payload)
            })
            .await
        {
            Ok(()) => {
                debug!("Wrote {} to {}", location, epc);
                Ok(())
            }
            Err(error) => {
                let error = error.into_command_error("write_memory");
                self.shared.report_failure("write_memory", &error);
                Err(error)
            }
        }
    }

    /// Stop any inventory, release the reader and clear all session data.
    ///
    /// The session always ends up `Disconnected`. A failed release is
    /// returned after the teardown completed; a failed stop is only logged.
    pub async fn disconnect(&self) -> Result<()> {
        let mut control = self.shared.control.lock().await;
        let publisher = &self.shared.publisher;

        let previous = publisher.state();
        info!("Disconnecting UHF reader from state {}", previous);
        publisher.transition(SessionState::Disconnecting);

        if let Some(poller) = control.poller.take() {
            let exit = poller.shutdown().await;
            if previous == SessionState::Scanning && !exit.ended_on_its_own() {
                if let Err(e) = self
                    .shared
                    .device
                    .call("stop_inventory", |device| device.stop_inventory())
                    .await
                {
                    warn!("Failed to stop inventory during disconnect: {}", e);
                }
            }
        }

        let release_error = if control.acquired {
            control.acquired = false;
            self.shared
                .device
                .call("release", |device| device.release())
                .await
                .err()
        } else {
            None
        };

        self.shared.clear_inventory();
        control.version = None;
        publisher.set_connected(false);
        publisher.transition(SessionState::Disconnected);

        match release_error {
            None => {
                publisher.set_status(StatusMessage::Disconnected);
                Ok(())
            }
            Some(error) => {
                publisher.set_status(StatusMessage::DisconnectedWithError {
                    message: error.to_string(),
                });
                let error = error.into_command_error("release");
                self.shared.report_failure("release", &error);
                Err(error)
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.publisher.state()
    }

    /// Current tag set, most recently seen first.
    pub fn tags(&self) -> TagSnapshot {
        self.shared.publisher.tags()
    }

    /// Current status text.
    pub fn status(&self) -> String {
        self.shared.publisher.status()
    }

    /// Whether a reader is connected.
    pub fn is_connected(&self) -> bool {
        self.shared.publisher.is_connected()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.publisher.subscribe_state()
    }

    pub fn subscribe_tags(&self) -> watch::Receiver<TagSnapshot> {
        self.shared.publisher.subscribe_tags()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.shared.publisher.subscribe_status()
    }

    pub fn subscribe_connected(&self) -> watch::Receiver<bool> {
        self.shared.publisher.subscribe_connected()
    }

    /// Subscribe to transient events emitted from now on.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.publisher.subscribe_events()
    }
}
