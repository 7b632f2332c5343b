//! Owns the connection to the controller. The session is shared between the
//! pad read path, which only ever does short reads, and the session worker,
//! which does everything slow: initializing the USB context, discovering and
//! claiming the device and sending keep-alive reports.
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    config::{DeviceConfig, TimingConfig},
    drivers::dualsense::{driver::Driver, hid_report::RawDeviceReport},
    notify::Notifier,
    usb::{TransferErrorClass, TransportError, UsbTransport},
};

/// Creates the USB context. Called from the session worker until it succeeds.
pub type ContextInit<T> = Box<dyn Fn() -> Result<T, TransportError> + Send + Sync>;

/// Lifecycle of a [DeviceSession]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No USB context yet
    Uninitialized,
    /// USB context is ready but no device is claimed
    ContextReady,
    /// Opening and claiming a device
    Discovering,
    /// Device is claimed and reports can be read
    Connected,
    /// Torn down at unload, nothing will be opened again
    ShutDown,
}

struct SessionInner<T: UsbTransport> {
    state: SessionState,
    context: Option<Arc<T>>,
    driver: Option<Arc<Driver<T::Handle>>>,
    active: bool,
}

/// The single connection to a USB controller
pub struct DeviceSession<T: UsbTransport> {
    device: DeviceConfig,
    keep_alive_timeout: Duration,
    init: ContextInit<T>,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<SessionInner<T>>,
}

impl<T: UsbTransport> DeviceSession<T> {
    pub fn new(
        device: DeviceConfig,
        timing: &TimingConfig,
        init: ContextInit<T>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            device,
            keep_alive_timeout: timing.keep_alive_timeout(),
            init,
            notifier,
            inner: Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                context: None,
                driver: None,
                active: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner<T>> {
        // A panic while holding the lock cannot leave the inner state half
        // updated, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of the session
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Returns true if a claimed device is available for reads
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Initialize the USB context if it does not exist yet. On failure the
    /// session stays uninitialized and the next call tries again.
    pub fn ensure_context(&self) -> Result<(), TransportError> {
        {
            let inner = self.lock();
            if inner.context.is_some() || inner.state == SessionState::ShutDown {
                return Ok(());
            }
        }

        let context = (self.init)()?;

        let mut inner = self.lock();
        if inner.state == SessionState::ShutDown || inner.context.is_some() {
            return Ok(());
        }
        log::debug!("USB context initialized");
        inner.context = Some(Arc::new(context));
        inner.state = SessionState::ContextReady;

        Ok(())
    }

    /// Open and claim the configured device. Returns true if a device is
    /// connected once this returns. If the claim fails, the opened handle is
    /// closed again and the session goes back to waiting for a device.
    pub fn discover(&self) -> Result<bool, TransportError> {
        let context = {
            let mut inner = self.lock();
            match inner.state {
                SessionState::ShutDown => return Ok(false),
                SessionState::Connected if inner.driver.is_some() => return Ok(true),
                _ => (),
            }
            let Some(context) = inner.context.clone() else {
                log::trace!("USB context is not ready yet");
                return Ok(false);
            };
            inner.state = SessionState::Discovering;
            context
        };

        // Opening and claiming can be slow, so it happens without the lock
        let result = Driver::open(&*context, &self.device);

        let mut inner = self.lock();
        if inner.state == SessionState::ShutDown {
            return Ok(false);
        }
        match result {
            Ok(Some(driver)) => {
                inner.driver = Some(Arc::new(driver));
                inner.active = true;
                inner.state = SessionState::Connected;
                drop(inner);
                log::info!(
                    "Connected to DualSense {:04x}:{:04x}",
                    self.device.vendor_id,
                    self.device.product_id
                );
                self.notifier.notify("DualSense Connected");
                Ok(true)
            }
            Ok(None) => {
                inner.state = SessionState::ContextReady;
                Ok(false)
            }
            Err(e) => {
                inner.state = SessionState::ContextReady;
                Err(e)
            }
        }
    }

    /// Write the keep-alive report to the connected device. Failures are
    /// logged and otherwise ignored.
    pub fn keep_alive(&self) {
        let Some(driver) = self.lock().driver.clone() else {
            return;
        };
        if let Err(e) = driver.write_keep_alive(self.keep_alive_timeout) {
            log::debug!("Unable to write keep-alive report: {e}");
        }
    }

    /// Read one input report, waiting at most `timeout`. Returns `None` when
    /// no device is connected or no report arrived in time.
    pub fn read_frame(&self, timeout: Duration) -> Option<RawDeviceReport> {
        let driver = {
            let inner = self.lock();
            if !inner.active {
                return None;
            }
            inner.driver.clone()?
        };

        match driver.poll(timeout) {
            Ok(report) if !report.is_empty() => Some(report),
            Ok(_) => None,
            Err(e) => {
                self.transfer_failed(&driver, &e);
                None
            }
        }
    }

    /// Classify a transfer error on the current device. A fatal error tears
    /// the device down so the worker can discover it again.
    pub fn handle_transfer_error(&self, err: &TransportError) -> TransferErrorClass {
        let Some(driver) = self.lock().driver.clone() else {
            return err.classify();
        };
        self.transfer_failed(&driver, err)
    }

    fn transfer_failed(
        &self,
        driver: &Arc<Driver<T::Handle>>,
        err: &TransportError,
    ) -> TransferErrorClass {
        let class = err.classify();
        if class == TransferErrorClass::Transient {
            log::trace!("Transient transfer error: {err}");
            return class;
        }

        let removed = {
            let mut inner = self.lock();
            let current = inner
                .driver
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, driver));
            if !current {
                // A newer device was already claimed
                return class;
            }
            inner.active = false;
            if inner.state != SessionState::ShutDown {
                inner.state = SessionState::ContextReady;
            }
            inner.driver.take()
        };

        // The interface is released once the last reader drops its reference
        drop(removed);
        log::warn!("DualSense disconnected: {err}");
        self.notifier.notify("DualSense Disconnected");

        class
    }

    /// Release the device and the USB context. The session cannot be used
    /// again afterwards.
    pub fn shutdown(&self) {
        let (driver, context) = {
            let mut inner = self.lock();
            inner.state = SessionState::ShutDown;
            inner.active = false;
            (inner.driver.take(), inner.context.take())
        };
        drop(driver);
        drop(context);
        log::debug!("Device session shut down");
    }
}
