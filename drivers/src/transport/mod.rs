/*!
Transport channels.

A [`TransportChannel`] is a byte-oriented source/sink owned by one device
instance: blocking reads with a timeout, best-effort writes. Reads and writes
take `&self` so the decode worker and the keep-alive worker can share one
channel; implementations serialize writes internally.

Opening a channel goes through a [`TransportFactory`], which lets hosts (and
tests) supply transports the system factory does not know about.
*/

use std::sync::Arc;
use std::time::Duration;

use shared::DeviceKey;
use thiserror::Error;

pub mod hid;
pub mod serial;
pub mod usb;

/// Result of a read with timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Number of bytes read, always > 0
    Data(usize),
    /// The timeout expired without data; not an error
    Timeout,
}

/// Errors raised by transport channels
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("device not found: {0}")]
    NotFound(String),

    #[error("{0} is not supported by this transport")]
    Unsupported(&'static str),
}

/// Byte-oriented source/sink of a single device
pub trait TransportChannel: Send + Sync {
    /// Read whatever is available into `buf`, waiting at most `timeout`
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<ReadOutcome, TransportError>;

    /// Write `data` to the device
    fn write(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Send an HID feature report; byte 0 is the report id
    fn send_feature_report(&self, _data: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("feature reports"))
    }
}

/// How a device is reached, resolved from its driver, id and address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Raw 8N1 serial line
    Serial { path: String, baud_rate: u32 },
    /// hidapi device path
    Hid { path: String },
    /// USB interrupt endpoint
    UsbInterrupt {
        bus: u8,
        device: u8,
        interface: u8,
        endpoint: u8,
    },
    /// Pair of cameras delivering frames; acquisition is external
    CameraPair,
}

/// Everything needed to open the transport of one instance
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub key: DeviceKey,
    pub kind: TransportKind,
    /// Default read timeout to configure on the channel
    pub timeout: Duration,
}

/// Opens transport channels
pub trait TransportFactory: Send + Sync {
    fn open(&self, request: &OpenRequest) -> Result<Arc<dyn TransportChannel>, TransportError>;
}

/// Factory backed by the system serial, HID and USB stacks
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTransports;

impl TransportFactory for SystemTransports {
    fn open(&self, request: &OpenRequest) -> Result<Arc<dyn TransportChannel>, TransportError> {
        match &request.kind {
            TransportKind::Serial { path, baud_rate } => Ok(Arc::new(serial::SerialChannel::open(
                path,
                *baud_rate,
                request.timeout,
            )?)),
            TransportKind::Hid { path } => Ok(Arc::new(hid::HidChannel::open(path)?)),
            TransportKind::UsbInterrupt {
                bus,
                device,
                interface,
                endpoint,
            } => Ok(Arc::new(usb::UsbInterruptChannel::open(
                *bus, *device, *interface, *endpoint,
            )?)),
            TransportKind::CameraPair => Err(TransportError::Unsupported("camera acquisition")),
        }
    }
}

/// Timeout in whole milliseconds for APIs taking an `i32`
pub(crate) fn timeout_millis(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX)
}
