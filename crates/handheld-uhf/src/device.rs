//! Bounded access to the blocking reader.
//!
//! Reader drivers block the calling thread, so every call runs on the
//! blocking pool and is raced against the configured timeout. A call that
//! times out keeps running in the background while holding the device lock;
//! the next call waits for it and is itself subject to the timeout.
//!
//! Callers that cannot afford to lose a late result split the call into
//! [`DeviceCell::spawn`] and [`DeviceCell::wait`] and keep waiting on the
//! same [`PendingCall`] after a timeout.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use handheld_hardware::UhfDevice;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DeviceCallError;

/// A reader call running on the blocking pool.
pub(crate) type PendingCall<T> = JoinHandle<handheld_hardware::Result<T>>;

pub(crate) struct DeviceCell<D> {
    device: Arc<Mutex<D>>,
    timeout: Duration,
}

impl<D: UhfDevice> DeviceCell<D> {
    pub(crate) fn new(device: D, timeout: Duration) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            timeout,
        }
    }

    /// Run `f` against the reader on the blocking pool.
    pub(crate) async fn call<T, F>(
        &self,
        operation: &'static str,
        f: F,
    ) -> Result<T, DeviceCallError>
    where
        T: Send + 'static,
        F: FnOnce(&mut D) -> handheld_hardware::Result<T> + Send + 'static,
    {
        let mut call = self.spawn(f);
        self.wait(operation, &mut call).await
    }

    /// Start `f` on the blocking pool without waiting for it.
    pub(crate) fn spawn<T, F>(&self, f: F) -> PendingCall<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut D) -> handheld_hardware::Result<T> + Send + 'static,
    {
        let device = Arc::clone(&self.device);
        tokio::task::spawn_blocking(move || {
            let mut device = device.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut *device)
        })
    }

    /// Wait up to the timeout for a spawned call.
    ///
    /// On [`DeviceCallError::TimedOut`] the call is still running and may be
    /// waited on again; after any other outcome it is finished.
    pub(crate) async fn wait<T>(
        &self,
        operation: &'static str,
        call: &mut PendingCall<T>,
    ) -> Result<T, DeviceCallError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => {
                if let Err(error) = &result {
                    debug!("Reader call {} failed: {}", operation, error);
                }
                result.map_err(DeviceCallError::from)
            }
            Ok(Err(join_error)) => {
                warn!("Reader call {} aborted: {}", operation, join_error);
                Err(DeviceCallError::Aborted(join_error.to_string()))
            }
            Err(_) => {
                warn!(
                    "Reader call {} timed out after {}ms",
                    operation,
                    self.timeout.as_millis()
                );
                Err(DeviceCallError::TimedOut(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handheld_hardware::mock::{MockCall, MockUhfReader};
    use handheld_hardware::{Epc, HardwareError, TagRead};

    #[tokio::test]
    async fn test_call_returns_device_result() {
        let (reader, handle) = MockUhfReader::new();
        handle.set_firmware("V2.3.5");
        let cell = DeviceCell::new(reader, Duration::from_secs(1));

        let version = cell.call("init", |device| device.init()).await.unwrap();
        assert_eq!(version.firmware, "V2.3.5");
        assert_eq!(handle.call_count(MockCall::Init), 1);
    }

    #[tokio::test]
    async fn test_call_maps_hardware_error() {
        let (reader, _handle) = MockUhfReader::new();
        let cell = DeviceCell::new(reader, Duration::from_secs(1));

        let error = cell
            .call("start_inventory", |device| device.start_inventory())
            .await
            .unwrap_err();
        assert_eq!(
            error,
            DeviceCallError::Hardware(HardwareError::disconnected("Mock UHF Reader"))
        );
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let (reader, handle) = MockUhfReader::new();
        let cell = DeviceCell::new(reader, Duration::from_millis(20));
        cell.call("init", |device| device.init()).await.unwrap();

        handle.set_read_delay(Duration::from_millis(200));
        let error = cell
            .call("read_buffered_tag", |device| device.read_buffered_tag())
            .await
            .unwrap_err();
        assert_eq!(error, DeviceCallError::TimedOut(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_call_reports_panic() {
        let (reader, _handle) = MockUhfReader::new();
        let cell = DeviceCell::new(reader, Duration::from_secs(1));

        let error = cell
            .call("init", |_device| -> handheld_hardware::Result<()> {
                panic!("driver crashed")
            })
            .await
            .unwrap_err();
        assert!(matches!(error, DeviceCallError::Aborted(_)));
    }

    #[tokio::test]
    async fn test_timed_out_call_can_be_awaited_again() {
        let (reader, handle) = MockUhfReader::new();
        let cell = DeviceCell::new(reader, Duration::from_millis(50));
        cell.call("init", |device| device.init()).await.unwrap();
        cell.call("start_inventory", |device| device.start_inventory())
            .await
            .unwrap();
        handle.push_tag(TagRead::new(Epc::new("E1").unwrap()));
        handle.set_read_delay(Duration::from_millis(80));

        let mut call = cell.spawn(|device| device.read_buffered_tag());
        let error = cell.wait("read_buffered_tag", &mut call).await.unwrap_err();
        assert_eq!(error, DeviceCallError::TimedOut(Duration::from_millis(50)));

        let read = cell.wait("read_buffered_tag", &mut call).await.unwrap();
        assert_eq!(read.map(|read| read.epc), Some(Epc::new("E1").unwrap()));
        assert_eq!(handle.pending_reads(), 0);
    }
}
