/*!
# Board Drivers

Device workers and protocol decoders for interactive whiteboards, pen tablets
and the dual-camera DViT board.

Each [`Driver`] is one device family. The host initializes it, registers an
event sink, sets parameters, then starts and stops instances by (device id,
address):

```no_run
use std::sync::Arc;
use crossbeam_channel::unbounded;
use drivers::{Driver, DriverKind};
use shared::ChannelSink;

let driver = Driver::init(DriverKind::WhiteBoard);
let (tx, rx) = unbounded();
driver.set_callback(Arc::new(ChannelSink::new(tx)));
driver.set_parameter("ebeam.filter", 0)?;
driver.start(0x26501311, 0x0001_0200)?;

for event in rx.iter().take(10) {
    println!("{:?}", event);
}
driver.stop(0x26501311, 0x0001_0200)?;
# Ok::<(), shared::DriverError>(())
```

## Modules

- [`driver`] - The plugin facade
- [`kind`] - Driver families and their device tables
- [`registry`] - Instance registry and lifecycle states
- [`worker`] - Decode worker thread
- [`keepalive`] - Heartbeat thread for boards that need one
- [`protocol`] - Per-family decoders
- [`transport`] - Serial, HID and USB interrupt channels
*/

pub mod dispatch;
pub mod driver;
pub mod keepalive;
pub mod kind;
pub mod options;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod worker;

pub use driver::Driver;
pub use kind::DriverKind;
pub use options::DriverOptions;
pub use registry::{DeviceStatus, InstanceState};
pub use transport::{
    OpenRequest, ReadOutcome, SystemTransports, TransportChannel, TransportError, TransportFactory,
    TransportKind,
};

/// Version of the drivers library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
