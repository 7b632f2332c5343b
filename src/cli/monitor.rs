use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dualsense_bridge::config::BridgeConfig;
use dualsense_bridge::drivers::orbis_pad::pad_data::OrbisPadData;
use dualsense_bridge::plugin::Bridge;
use dualsense_bridge::usb::libusb::LibUsbTransport;
use dualsense_bridge::usb::UsbTransport;

use super::report::format_pad;

/// How long to wait before polling again while disconnected
const IDLE_INTERVAL: Duration = Duration::from_millis(50);

/// Run the session against the real USB stack and print every translated
/// report until interrupted.
pub async fn handle_monitor(config: BridgeConfig) -> Result<(), Box<dyn Error>> {
    log::info!(
        "Waiting for DualSense {:04x}:{:04x}",
        config.device.vendor_id,
        config.device.product_id
    );
    let mut bridge: Bridge<LibUsbTransport> =
        Bridge::new(config, Box::new(LibUsbTransport::new));
    bridge.start()?;

    let running = Arc::new(AtomicBool::new(true));
    let task = {
        let running = running.clone();
        tokio::task::spawn_blocking(move || monitor(bridge, &running))
    };

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    running.store(false, Ordering::Release);
    task.await?;

    Ok(())
}

fn monitor<T: UsbTransport>(mut bridge: Bridge<T>, running: &AtomicBool) {
    let mut last: Option<OrbisPadData> = None;
    while running.load(Ordering::Acquire) {
        if !bridge.session().is_active() {
            last = None;
            thread::sleep(IDLE_INTERVAL);
            continue;
        }

        let mut pad = OrbisPadData::default();
        if !bridge.overlay(&mut pad) {
            continue;
        }
        // Only print changes
        if last.as_ref() == Some(&pad) {
            continue;
        }
        println!("{}", format_pad(&pad));
        last = Some(pad);
    }
    bridge.stop();
}
