//! Plugin lifecycle. Loading creates the [Bridge] and hooks the pad read
//! function so every read the game does gets the DualSense state.
pub mod exports;


use std::{
    env, io,
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use thiserror::Error;

use crate::{
    config::BridgeConfig,
    drivers::orbis_pad::pad_data::OrbisPadData,
    hook::{detour::DetourPatcher, HookBinding, Patcher},
    input::{
        session::{ContextInit, DeviceSession},
        translator,
        worker::SessionWorker,
    },
    notify::{LogNotifier, Notifier, SilentNotifier},
    usb::{libusb::LibUsbTransport, UsbTransport},
};

/// Signature of the hooked pad read function
pub type PadReadFn =
    unsafe extern "C" fn(handle: i32, data: *mut OrbisPadData, count: i32) -> i32;

static BRIDGE: RwLock<Option<Box<dyn LoadedBridge>>> = RwLock::new(None);
static PAD_READ_HOOK: RwLock<Option<HookBinding<PadReadFn>>> = RwLock::new(None);

/// Possible errors loading the plugin
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin is already loaded")]
    AlreadyLoaded,
    #[error("Unable to start session worker: {0}")]
    Worker(#[from] io::Error),
}

/// Owns the device session and the worker that keeps it connected
pub struct Bridge<T: UsbTransport> {
    config: BridgeConfig,
    session: Arc<DeviceSession<T>>,
    worker: Option<SessionWorker>,
}

impl<T: UsbTransport> Bridge<T> {
    pub fn new(config: BridgeConfig, init: ContextInit<T>) -> Self {
        let notifier: Arc<dyn Notifier> = if config.notifications {
            Arc::new(LogNotifier)
        } else {
            Arc::new(SilentNotifier)
        };
        let session = DeviceSession::new(config.device.clone(), &config.timing, init, notifier);
        Self {
            config,
            session: Arc::new(session),
            worker: None,
        }
    }

    /// Start the session worker. Does nothing if it is already running.
    pub fn start(&mut self) -> io::Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let worker = SessionWorker::spawn(self.session.clone(), &self.config.timing)?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Stop the worker and release the device
    pub fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        self.session.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| worker.is_running())
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<DeviceSession<T>> {
        &self.session
    }

    pub fn read_timeout(&self) -> Duration {
        self.config.timing.read_timeout()
    }

    /// Read one report from the controller and write it over the given pad
    /// data. Returns false if no report was available.
    pub fn overlay(&self, pad: &mut OrbisPadData) -> bool {
        let Some(frame) = self.session.read_frame(self.read_timeout()) else {
            return false;
        };
        let applied = translator::translate(frame.as_bytes(), pad);
        log::trace!("Applied report: {applied}");
        applied
    }

    /// Overlay the first pad data entry of a pad read that returned
    /// `status`. Nothing is written unless the read succeeded.
    ///
    /// # Safety
    /// `data` must be null or point to at least `count` pad data entries.
    pub unsafe fn overlay_pad_read(&self, status: i32, data: *mut OrbisPadData, count: i32) -> bool {
        if status != 0 || data.is_null() || count < 1 {
            return false;
        }
        self.overlay(&mut *data)
    }
}

impl<T: UsbTransport> Drop for Bridge<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// [Bridge] of the loaded plugin, whatever USB transport it uses
trait LoadedBridge: Send + Sync {
    unsafe fn overlay_pad_read(&self, status: i32, data: *mut OrbisPadData, count: i32) -> bool;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

impl<T: UsbTransport> LoadedBridge for Bridge<T> {
    unsafe fn overlay_pad_read(&self, status: i32, data: *mut OrbisPadData, count: i32) -> bool {
        Bridge::overlay_pad_read(self, status, data, count)
    }

    fn stop(&mut self) {
        Bridge::stop(self)
    }

    fn is_running(&self) -> bool {
        Bridge::is_running(self)
    }
}

/// Initialize logging from the LOG_LEVEL environment variable. Safe to call
/// more than once.
pub fn init_logging() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    if env_logger::Builder::new()
        .parse_filters(&log_level)
        .try_init()
        .is_err()
    {
        log::debug!("Logger was already initialized");
    }
}

/// Load the plugin, hooking the pad read function with the default patcher
/// and reading the controller through libusb
pub fn load(config_path: Option<&Path>) -> Result<(), PluginError> {
    let config = BridgeConfig::load(config_path);
    let init: ContextInit<LibUsbTransport> = Box::new(LibUsbTransport::new);
    load_with(&DetourPatcher, config, init)
}

/// Load the plugin using the given patcher and USB context. If the hook
/// cannot be installed and enabled, the plugin stays loaded without touching
/// the controller.
pub fn load_with<P: Patcher, T: UsbTransport>(
    patcher: &P,
    config: BridgeConfig,
    init: ContextInit<T>,
) -> Result<(), PluginError> {
    let mut slot = BRIDGE.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(PluginError::AlreadyLoaded);
    }

    let notifications = config.notifications;
    let symbol = config.hook.symbol.clone();
    let mut bridge = Bridge::new(config, init);

    // SAFETY: the shim has the signature of the pad read function
    let hook = unsafe {
        HookBinding::prepare(patcher, &bridge.config().hook, pad_read_shim as PadReadFn)
    };
    let hooked = match hook {
        Ok(hook) => enable_hook(hook),
        Err(e) => {
            log::error!("Unable to hook {symbol}: {e}. Translation is inactive.");
            false
        }
    };

    // Without the hook nothing would read the controller, so leave it alone.
    // Until the bridge is stored the shim passes every read through.
    if hooked {
        if let Err(e) = bridge.start() {
            // The shim takes the hook lock before the bridge lock
            drop(slot);
            disable_hook();
            return Err(e.into());
        }
    }
    *slot = Some(Box::new(bridge));
    drop(slot);

    if notifications {
        LogNotifier.notify("DualSense Bridge Loaded");
    }
    log::info!("Started DualSense Bridge v{}", env!("CARGO_PKG_VERSION"));

    Ok(())
}

/// Store the hook and start redirecting. The hook is dropped again if it
/// cannot be enabled.
fn enable_hook(hook: HookBinding<PadReadFn>) -> bool {
    *PAD_READ_HOOK.write().unwrap_or_else(PoisonError::into_inner) = Some(hook);

    let result = {
        let hook_slot = PAD_READ_HOOK.read().unwrap_or_else(PoisonError::into_inner);
        match hook_slot.as_ref() {
            // SAFETY: the shim only reads the bridge through its lock
            Some(hook) => unsafe { hook.enable() },
            None => return false,
        }
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            log::error!("Unable to enable hook: {e}. Translation is inactive.");
            disable_hook();
            false
        }
    }
}

fn disable_hook() {
    let hook = PAD_READ_HOOK
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(hook) = hook {
        hook.release();
    }
}

/// Stop the worker, release the device and remove the hook. Does nothing if
/// the plugin is not loaded.
pub fn unload() {
    let bridge = BRIDGE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(mut bridge) = bridge {
        bridge.stop();
    }

    disable_hook();
    log::info!("Stopped DualSense Bridge");
}

/// Returns true if the plugin is loaded
pub fn is_loaded() -> bool {
    BRIDGE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Returns true if the session worker of the loaded plugin is running
pub fn is_running() -> bool {
    BRIDGE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .is_some_and(|bridge| bridge.is_running())
}

/// Returns true if pad reads are being redirected to the bridge
pub fn is_hooked() -> bool {
    PAD_READ_HOOK
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .is_some_and(|hook| hook.is_enabled())
}

/// Replacement for the pad read function. Calls the original and then
/// overwrites the result with the DualSense state if a report is available.
unsafe extern "C" fn pad_read_shim(handle: i32, data: *mut OrbisPadData, count: i32) -> i32 {
    // Held for the whole call so unloading waits for it
    let hook = PAD_READ_HOOK.read().unwrap_or_else(PoisonError::into_inner);
    let Some(original) = hook.as_ref().map(|hook| hook.original()) else {
        return 0;
    };
    let status = original(handle, data, count);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let bridge = BRIDGE.read().unwrap_or_else(PoisonError::into_inner);
        match bridge.as_ref() {
            Some(bridge) => bridge.overlay_pad_read(status, data, count),
            None => false,
        }
    }));
    if result.is_err() {
        log::error!("Panic while translating pad data");
    }

    status
}
