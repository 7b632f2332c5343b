use std::time::Duration;

use rusb::UsbContext;

use super::{DeviceHandle, TransportError, UsbTransport};

impl From<rusb::Error> for TransportError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::NoDevice => TransportError::NoDevice,
            rusb::Error::Timeout => TransportError::Timeout,
            rusb::Error::Busy => TransportError::Busy,
            rusb::Error::Access => TransportError::Access,
            rusb::Error::NotFound => TransportError::NotFound,
            rusb::Error::Io => TransportError::Io,
            err => TransportError::Other(err.to_string()),
        }
    }
}

/// libusb context
pub struct LibUsbTransport {
    context: rusb::Context,
}

impl LibUsbTransport {
    pub fn new() -> Result<Self, TransportError> {
        let context = rusb::Context::new()?;
        log::debug!("Initialized libusb context");
        Ok(Self { context })
    }
}

impl UsbTransport for LibUsbTransport {
    type Handle = LibUsbDevice;

    fn open_device_with_vid_pid(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Option<Self::Handle>, TransportError> {
        let handle = self
            .context
            .open_device_with_vid_pid(vendor_id, product_id)
            .map(|handle| LibUsbDevice { handle });
        Ok(handle)
    }
}

/// Device handle opened through libusb. Closed on drop.
pub struct LibUsbDevice {
    handle: rusb::DeviceHandle<rusb::Context>,
}

impl DeviceHandle for LibUsbDevice {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, TransportError> {
        Ok(self.handle.kernel_driver_active(interface)?)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError> {
        Ok(self.handle.detach_kernel_driver(interface)?)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        Ok(self.handle.claim_interface(interface)?)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        Ok(self.handle.release_interface(interface)?)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        Ok(self.handle.read_interrupt(endpoint, buf, timeout)?)
    }

    fn write_interrupt(
        &self,
        endpoint: u8,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        Ok(self.handle.write_interrupt(endpoint, buf, timeout)?)
    }
}
