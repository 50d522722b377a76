/*!
USB interrupt endpoint transport through libusb.
*/

use std::time::Duration;

use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info, warn};

use super::{ReadOutcome, TransportChannel, TransportError};

pub struct UsbInterruptChannel {
    handle: DeviceHandle<GlobalContext>,
    interface: u8,
    endpoint: u8,
}

impl UsbInterruptChannel {
    /// Find the device by bus number and device address, detach any kernel
    /// driver and claim `interface`
    pub fn open(bus: u8, address: u8, interface: u8, endpoint: u8) -> Result<Self, TransportError> {
        let device = rusb::devices()?
            .iter()
            .find(|device| device.bus_number() == bus && device.address() == address)
            .ok_or_else(|| TransportError::NotFound(format!("usb {:03}:{:03}", bus, address)))?;

        info!("Opening USB device {:03}:{:03}", bus, address);
        let mut handle = device.open()?;

        if handle.kernel_driver_active(interface).unwrap_or(false) {
            debug!("Kernel driver active on interface {}", interface);
            match handle.detach_kernel_driver(interface) {
                Ok(()) => debug!("Kernel driver detached"),
                Err(e) => warn!("Failed to detach kernel driver: {}", e),
            }
        }

        handle.claim_interface(interface)?;
        debug!("Claimed interface {}", interface);

        Ok(Self {
            handle,
            interface,
            endpoint,
        })
    }
}

impl TransportChannel for UsbInterruptChannel {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<ReadOutcome, TransportError> {
        match self.handle.read_interrupt(self.endpoint, buf, timeout) {
            Ok(0) | Err(rusb::Error::Timeout) => Ok(ReadOutcome::Timeout),
            Ok(len) => Ok(ReadOutcome::Data(len)),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, _data: &[u8]) -> Result<usize, TransportError> {
        Err(TransportError::Unsupported("writes to an interrupt IN endpoint"))
    }
}

impl Drop for UsbInterruptChannel {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            debug!("Failed to release interface {}: {}", self.interface, e);
        }
    }
}
