//! In-memory USB transport for exercising the session without hardware
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::drivers::dualsense::driver::{DS5_PID, DS5_VID};

use super::{DeviceHandle, TransportError, UsbTransport};

#[derive(Debug)]
pub struct MockState {
    pub attached: bool,
    pub kernel_driver_active: bool,
    pub claim_error: Option<TransportError>,
    pub write_error: Option<TransportError>,
    /// Results handed out by interrupt reads, a timeout once empty
    pub reads: VecDeque<Result<Vec<u8>, TransportError>>,
    pub writes: Vec<Vec<u8>>,
    pub opened: u32,
    pub closed: u32,
    pub detached: u32,
    pub claimed: u32,
    pub released: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            attached: true,
            kernel_driver_active: false,
            claim_error: None,
            write_error: None,
            reads: VecDeque::new(),
            writes: Vec::new(),
            opened: 0,
            closed: 0,
            detached: 0,
            claimed: 0,
            released: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockUsb {
    state: Arc<Mutex<MockState>>,
}

impl MockUsb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queue an input report for the next interrupt read
    pub fn push_read(&self, report: &[u8]) {
        self.state().reads.push_back(Ok(report.to_vec()));
    }

    pub fn push_read_error(&self, err: TransportError) {
        self.state().reads.push_back(Err(err));
    }
}

impl UsbTransport for MockUsb {
    type Handle = MockHandle;

    fn open_device_with_vid_pid(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Option<Self::Handle>, TransportError> {
        let mut state = self.state();
        if !state.attached || vendor_id != DS5_VID || product_id != DS5_PID {
            return Ok(None);
        }
        state.opened += 1;
        Ok(Some(MockHandle {
            state: self.state.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state().closed += 1;
    }
}

impl DeviceHandle for MockHandle {
    fn kernel_driver_active(&self, _interface: u8) -> Result<bool, TransportError> {
        Ok(self.state().kernel_driver_active)
    }

    fn detach_kernel_driver(&mut self, _interface: u8) -> Result<(), TransportError> {
        let mut state = self.state();
        state.detached += 1;
        state.kernel_driver_active = false;
        Ok(())
    }

    fn claim_interface(&mut self, _interface: u8) -> Result<(), TransportError> {
        let mut state = self.state();
        if let Some(err) = state.claim_error.clone() {
            return Err(err);
        }
        state.claimed += 1;
        Ok(())
    }

    fn release_interface(&mut self, _interface: u8) -> Result<(), TransportError> {
        self.state().released += 1;
        Ok(())
    }

    fn read_interrupt(
        &self,
        _endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let mut state = self.state();
        if !state.attached {
            return Err(TransportError::NoDevice);
        }
        match state.reads.pop_front() {
            Some(Ok(report)) => {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                Ok(len)
            }
            Some(Err(err)) => Err(err),
            None => Err(TransportError::Timeout),
        }
    }

    fn write_interrupt(
        &self,
        _endpoint: u8,
        buf: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let mut state = self.state();
        if !state.attached {
            return Err(TransportError::NoDevice);
        }
        if let Some(err) = state.write_error.clone() {
            return Err(err);
        }
        state.writes.push(buf.to_vec());
        Ok(buf.len())
    }
}
