/*!
# Shared Types and Utilities

This crate contains the protocol primitives shared by every whiteboard, tablet
and camera driver. Nothing in here touches a transport: all of it works on byte
slices and scalars, so it can be exercised with synthetic frames.

## Core Types

- [`DeviceKey`] - (device id, address) identity of a running instance
- [`CanonicalEvent`] - Normalized pointer/status/data event
- [`EventSink`] - Capability used by workers to deliver events
- [`FrameBuffer`] - Rolling byte window for magic-headered serial frames
- [`ParameterTable`] - Process-wide dotted-key parameters with atomic access

## Modules

- [`device`] - Device identity and address encoding
- [`event`] - Canonical events and sinks
- [`checksum`] - Frame validity checks
- [`fields`] - Bit-packed field extraction and range normalization
- [`frame`] - Frame buffers and report views
- [`params`] - Parameter table
- [`centroid`] - Camera frame binarization and centroid extraction
- [`triangulation`] - Dual-camera position recovery
- [`error`] - Common error types
*/

pub mod centroid;
pub mod checksum;
pub mod device;
pub mod error;
pub mod event;
pub mod fields;
pub mod frame;
pub mod params;
pub mod triangulation;

// Re-export commonly used types
pub use device::{Address, DeviceId, DeviceKey, SupportedDevice};
pub use error::{DriverError, Result};
pub use event::{
    ButtonMask, CanonicalEvent, ChannelSink, CommErrorLatch, DataPayload, EventKind, EventSink,
    FnSink, PointerEvent, Status,
};
pub use frame::{FrameBuffer, Report};
pub use params::{ParamSpec, ParameterTable};
pub use triangulation::{Triangulation, TriangulationModel};

/// Version information for the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol constants
pub mod protocol {
    /// Size of a magic-headered serial frame in bytes
    pub const SERIAL_FRAME_LEN: usize = 8;

    /// Size of an HID or USB interrupt read
    pub const REPORT_LEN: usize = 64;

    /// Size of a Smart Board output report
    pub const SMART_OUTPUT_REPORT_LEN: usize = 17;

    /// Global parameter key present in every driver
    pub const COMMON_DEBUG: &str = "common.debug";
}
