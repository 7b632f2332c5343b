//! Background thread that keeps the [DeviceSession] connected
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{config::TimingConfig, usb::UsbTransport};

use super::session::DeviceSession;

/// Name of the session worker thread
pub const WORKER_THREAD_NAME: &str = "dsbridge-session";

/// Handle to the running session worker. Dropping it stops the worker.
pub struct SessionWorker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SessionWorker {
    /// Spawn the worker thread. Until stopped, it initializes the USB context,
    /// discovers the device while disconnected and sends keep-alive reports
    /// while connected.
    pub fn spawn<T: UsbTransport>(
        session: Arc<DeviceSession<T>>,
        timing: &TimingConfig,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let discovery_interval = timing.discovery_interval();
        let keep_alive_interval = timing.keep_alive_interval();

        let thread = {
            let stop = stop.clone();
            thread::Builder::new()
                .name(WORKER_THREAD_NAME.to_string())
                .spawn(move || {
                    log::debug!("Session worker started");
                    while !stop.load(Ordering::Acquire) {
                        let interval = if run_once(&session) {
                            keep_alive_interval
                        } else {
                            discovery_interval
                        };
                        sleep(&stop, interval);
                    }
                    log::debug!("Session worker stopped");
                })?
        };

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Returns true while the worker thread is alive
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Signal the worker to stop and wait for it to exit
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        thread.thread().unpark();
        if thread.join().is_err() {
            log::error!("Session worker panicked");
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One worker cycle. Returns true if the device is connected afterwards.
fn run_once<T: UsbTransport>(session: &DeviceSession<T>) -> bool {
    if let Err(e) = session.ensure_context() {
        log::debug!("Unable to initialize USB context: {e}");
        return false;
    }

    if !session.is_active() {
        match session.discover() {
            Ok(true) => (),
            Ok(false) => return false,
            Err(e) => {
                log::debug!("Unable to claim DualSense: {e}");
                return false;
            }
        }
    }
    session.keep_alive();

    true
}

/// Sleep for the given duration or until the stop flag is set
fn sleep(stop: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}
