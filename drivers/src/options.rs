use std::time::Duration;

/// Timing and transport settings shared by every instance of a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Bound on a blocking read, and therefore on stop latency
    pub read_timeout: Duration,
    /// Serial ports are `<serial_prefix><tty>`
    pub serial_prefix: String,
    /// Pause after a read timeout
    pub idle_backoff: Duration,
    /// Pause after a hard read error
    pub error_backoff: Duration,
    /// Delay between opening a Multiclass port and sending the init byte
    pub serial_settle: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(1000),
            serial_prefix: "/dev/ttyUSB".to_string(),
            idle_backoff: Duration::from_millis(10),
            error_backoff: Duration::from_millis(10),
            serial_settle: Duration::from_millis(1000),
        }
    }
}
