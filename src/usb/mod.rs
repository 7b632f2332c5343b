//! USB transport used to reach the controller. The system USB stack is an
//! external capability, so it is modeled as a pair of traits with a libusb
//! backed implementation.
pub mod libusb;
#[cfg(test)]
pub mod mock;

use std::time::Duration;

use thiserror::Error;

/// Errors reported by the USB transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No such device (it may have been disconnected)")]
    NoDevice,
    #[error("Operation timed out")]
    Timeout,
    #[error("Resource busy")]
    Busy,
    #[error("Access denied (insufficient permissions)")]
    Access,
    #[error("Entity not found")]
    NotFound,
    #[error("Input/Output error")]
    Io,
    #[error("{0}")]
    Other(String),
}

/// How the session should react to a failed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorClass {
    /// The device is gone and the session must be torn down
    Fatal,
    /// No data this cycle, try again on the next one
    Transient,
}

impl TransportError {
    pub fn classify(&self) -> TransferErrorClass {
        match self {
            TransportError::NoDevice => TransferErrorClass::Fatal,
            _ => TransferErrorClass::Transient,
        }
    }
}

/// An open handle to a USB device
pub trait DeviceHandle: Send + Sync + 'static {
    /// Returns true if a kernel driver is bound to the given interface
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, TransportError>;
    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError>;
    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError>;
    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError>;
    /// Interrupt IN transfer. Returns the number of bytes read.
    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;
    /// Interrupt OUT transfer. Returns the number of bytes written.
    fn write_interrupt(
        &self,
        endpoint: u8,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;
}

/// An initialized USB context. Dropping it tears the context down.
pub trait UsbTransport: Send + Sync + 'static {
    type Handle: DeviceHandle;

    /// Open the first attached device with the given vendor and product id
    fn open_device_with_vid_pid(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Option<Self::Handle>, TransportError>;
}
