/*!
Raw serial line transport (8 data bits, no parity, one stop bit).
*/

use std::io::{ErrorKind, Read, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use super::{ReadOutcome, TransportChannel, TransportError};

/// Serial port with separate read and write handles, so a blocked read never
/// holds up a keep-alive write. Writes are serialized by their own lock.
pub struct SerialChannel {
    reader: Mutex<Box<dyn SerialPort>>,
    writer: Mutex<Box<dyn SerialPort>>,
}

impl SerialChannel {
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        info!("Opening serial port {} at {} baud", path, baud_rate);

        let reader = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()?;
        let writer = reader.try_clone()?;

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }
}

impl TransportChannel for SerialChannel {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<ReadOutcome, TransportError> {
        let mut port = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        if port.timeout() != timeout {
            port.set_timeout(timeout)?;
        }

        match port.read(buf) {
            Ok(0) => Ok(ReadOutcome::Timeout),
            Ok(len) => Ok(ReadOutcome::Data(len)),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let mut port = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }
}
