/*!
HID transport through hidapi.
*/

use std::ffi::CString;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::info;

use super::{timeout_millis, ReadOutcome, TransportChannel, TransportError};

pub struct HidChannel {
    device: Mutex<HidDevice>,
}

impl HidChannel {
    /// Open the device at a hidapi path (`bbbb:dddd:ii` for libusb backends)
    pub fn open(path: &str) -> Result<Self, TransportError> {
        info!("Opening HID device {}", path);

        let c_path = CString::new(path).map_err(|_| TransportError::NotFound(path.to_string()))?;
        let api = HidApi::new()?;
        let device = api.open_path(&c_path)?;

        Ok(Self {
            device: Mutex::new(device),
        })
    }
}

impl TransportChannel for HidChannel {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<ReadOutcome, TransportError> {
        let device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        match device.read_timeout(buf, timeout_millis(timeout))? {
            0 => Ok(ReadOutcome::Timeout),
            len => Ok(ReadOutcome::Data(len)),
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(device.write(data)?)
    }

    fn send_feature_report(&self, data: &[u8]) -> Result<(), TransportError> {
        let device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(device.send_feature_report(data)?)
    }
}
