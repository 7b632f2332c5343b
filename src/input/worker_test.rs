use std::{
    error::Error,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crate::{
    config::{DeviceConfig, TimingConfig},
    input::{
        session::{DeviceSession, SessionState},
        worker::SessionWorker,
    },
    notify::SilentNotifier,
    usb::{mock::MockUsb, TransportError},
};

fn new_session(usb: &MockUsb) -> Arc<DeviceSession<MockUsb>> {
    let usb = usb.clone();
    let session: DeviceSession<MockUsb> = DeviceSession::new(
        DeviceConfig::default(),
        &TimingConfig::default(),
        Box::new(move || Ok(usb.clone())),
        Arc::new(SilentNotifier),
    );
    Arc::new(session)
}

fn fast_timing() -> TimingConfig {
    TimingConfig {
        keep_alive_interval_ms: 5,
        discovery_interval_ms: 5,
        ..Default::default()
    }
}

/// Wait until the condition holds or a second has passed
fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn test_worker_connects_and_keeps_alive() -> Result<(), Box<dyn Error>> {
    let usb = MockUsb::new();
    let session = new_session(&usb);
    let mut worker = SessionWorker::spawn(session.clone(), &fast_timing())?;
    assert!(worker.is_running());

    assert!(wait_for(|| session.is_active()));
    assert!(wait_for(|| usb.state().writes.len() >= 2));
    assert_eq!(usb.state().opened, 1);

    worker.stop();
    assert!(!worker.is_running());

    Ok(())
}

#[test]
fn test_worker_rediscovers_device() -> Result<(), Box<dyn Error>> {
    let usb = MockUsb::new();
    let session = new_session(&usb);
    let _worker = SessionWorker::spawn(session.clone(), &fast_timing())?;
    assert!(wait_for(|| session.is_active()));

    usb.push_read_error(TransportError::NoDevice);
    assert!(session.read_frame(Duration::from_millis(2)).is_none());

    assert!(wait_for(|| usb.state().opened == 2));
    assert!(wait_for(|| session.is_active()));

    Ok(())
}

#[test]
fn test_worker_stops_promptly() -> Result<(), Box<dyn Error>> {
    let usb = MockUsb::new();
    usb.state().attached = false;
    let session = new_session(&usb);

    // Long intervals must not delay the stop
    let timing = TimingConfig {
        discovery_interval_ms: 60_000,
        keep_alive_interval_ms: 60_000,
        ..Default::default()
    };
    let mut worker = SessionWorker::spawn(session.clone(), &timing)?;
    assert!(wait_for(|| session.state() == SessionState::ContextReady));

    let start = Instant::now();
    worker.stop();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(!worker.is_running());

    // Stopping twice is fine
    worker.stop();

    Ok(())
}

#[test]
fn test_worker_stops_on_drop() -> Result<(), Box<dyn Error>> {
    let usb = MockUsb::new();
    let session = new_session(&usb);
    let worker = SessionWorker::spawn(session.clone(), &fast_timing())?;
    assert!(wait_for(|| session.is_active()));
    drop(worker);

    // Nothing writes once the worker is gone
    let writes = usb.state().writes.len();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(usb.state().writes.len(), writes);
    assert_eq!(Arc::strong_count(&session), 1);

    Ok(())
}
