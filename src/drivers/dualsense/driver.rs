use std::time::Duration;

use packed_struct::prelude::*;

use crate::{
    config::DeviceConfig,
    usb::{DeviceHandle, TransportError, UsbTransport},
};

use super::hid_report::{RawDeviceReport, UsbPackedOutputReport};

// Source: https://github.com/torvalds/linux/blob/master/drivers/hid/hid-playstation.c
pub const DS5_VID: u16 = 0x054c;
pub const DS5_PID: u16 = 0x0ce6;

/// Interface and endpoints used over USB
pub const DS5_INTERFACE: u8 = 0;
pub const DS5_EP_IN: u8 = 0x81;
pub const DS5_EP_OUT: u8 = 0x02;

pub const INPUT_REPORT_USB: u8 = 0x01;
pub const INPUT_REPORT_USB_SIZE: usize = 64;
/// Smallest input report that still carries every button byte
pub const INPUT_REPORT_MIN_SIZE: usize = 11;
pub const OUTPUT_REPORT_USB: u8 = 0x02;
pub const OUTPUT_REPORT_USB_SIZE: usize = 63;

/// PS5 DualSense controller driver for a device claimed over USB
pub struct Driver<H: DeviceHandle> {
    handle: H,
    interface: u8,
    endpoint_in: u8,
    endpoint_out: u8,
}

impl<H: DeviceHandle> Driver<H> {
    /// Open the first attached controller that matches the configured vendor
    /// and product ids and claim its interface. Returns `None` if no matching
    /// device is attached.
    pub fn open<T>(transport: &T, config: &DeviceConfig) -> Result<Option<Self>, TransportError>
    where
        T: UsbTransport<Handle = H>,
    {
        let Some(mut handle) =
            transport.open_device_with_vid_pid(config.vendor_id, config.product_id)?
        else {
            return Ok(None);
        };
        let interface = config.interface;

        // Platforms without kernel driver support report an error here
        if handle.kernel_driver_active(interface).unwrap_or(false) {
            log::debug!("Detaching kernel driver from interface {interface}");
            if let Err(e) = handle.detach_kernel_driver(interface) {
                log::warn!("Unable to detach kernel driver: {e}");
            }
        }
        handle.claim_interface(interface)?;
        log::debug!(
            "Claimed interface {interface} on {:04x}:{:04x}",
            config.vendor_id,
            config.product_id
        );

        Ok(Some(Self {
            handle,
            interface,
            endpoint_in: config.endpoint_in,
            endpoint_out: config.endpoint_out,
        }))
    }

    /// Read a single input report, waiting at most `timeout` for one to arrive
    pub fn poll(&self, timeout: Duration) -> Result<RawDeviceReport, TransportError> {
        let mut buf = [0; INPUT_REPORT_USB_SIZE];
        let bytes_read = self
            .handle
            .read_interrupt(self.endpoint_in, &mut buf[..], timeout)?;

        Ok(RawDeviceReport::new(buf, bytes_read))
    }

    /// Write the keep-alive output report to the gamepad so it keeps
    /// streaming input reports.
    pub fn write_keep_alive(&self, timeout: Duration) -> Result<(), TransportError> {
        let report = UsbPackedOutputReport::keep_alive();
        let buf = report
            .pack()
            .map_err(|e| TransportError::Other(format!("{e:?}")))?;
        let _bytes_written = self
            .handle
            .write_interrupt(self.endpoint_out, &buf, timeout)?;

        Ok(())
    }
}

impl<H: DeviceHandle> Drop for Driver<H> {
    fn drop(&mut self) {
        // The device may already be gone, so this is best-effort
        if let Err(e) = self.handle.release_interface(self.interface) {
            log::debug!("Unable to release interface {}: {e}", self.interface);
        }
        log::debug!("Closed DualSense device handle");
    }
}
