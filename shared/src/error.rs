/*!
Common error types for the driver components.
*/

use thiserror::Error;

use crate::device::DeviceKey;

/// Common result type used throughout the drivers
pub type Result<T> = std::result::Result<T, DriverError>;

/// Error type for control-path operations and per-frame failures.
///
/// Only the control path (`start`, `stop`, parameter access) returns these to
/// a caller. Inside a worker they are turned into `Status` events.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The transport could not be opened; fatal to that start attempt
    #[error("failed to open transport for {key}: {reason}")]
    TransportOpen { key: DeviceKey, reason: String },

    /// A hard read error on an open transport
    #[error("transport read failed: {0}")]
    TransportRead(String),

    /// A frame failed its integrity check
    #[error("frame checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    FrameChecksum { expected: u8, actual: u8 },

    /// A frame's confidence byte did not exceed the configured minimum
    #[error("frame fiability {fiability} not above minimum {minimum}")]
    LowFiability { fiability: u8, minimum: u32 },

    /// `start` was called for a key that already has an instance
    #[error("instance {0} is already running")]
    InstanceExists(DeviceKey),

    /// `stop` was called for a key with no instance
    #[error("no instance registered for {0}")]
    UnknownInstance(DeviceKey),

    /// The device id is not in the driver's supported device table
    #[error("device {0} is not supported by this driver")]
    UnsupportedDevice(DeviceKey),

    /// The parameter key is not known to the driver
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Create a new transport open error
    pub fn transport_open(key: DeviceKey, reason: impl Into<String>) -> Self {
        Self::TransportOpen {
            key,
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
