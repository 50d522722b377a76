/*!
Canonical events and the sinks that deliver them to the host.

Every decoder, whatever its wire format, ends up producing one of the
[`EventKind`] variants. Workers hand them to an [`EventSink`], which is invoked
synchronously on the worker thread.
*/

use bitflags::bitflags;
use crossbeam_channel::Sender;
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::device::DeviceKey;

bitflags! {
    /// Button state of a pointer. Bit positions are stable within a device family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u8 {
        /// Tip or primary button
        const TIP = 0x01;
        /// Barrel or secondary button
        const BARREL = 0x02;
        /// Invert or eraser end
        const INVERT = 0x04;
    }
}

fn serialize_buttons<S: Serializer>(buttons: &ButtonMask, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(buttons.bits())
}

/// Device status reported through the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Ready,
    Shutdown,
    CommError,
}

/// A normalized pointer sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointerEvent {
    /// Distinguishes simultaneous pointers (pens, tools)
    pub pointer: u8,
    /// Horizontal position in [0, 1]
    pub x: f32,
    /// Vertical position in [0, 1]
    pub y: f32,
    /// Pressure in [0, 1], only for pressure-capable devices
    pub z: Option<f32>,
    #[serde(serialize_with = "serialize_buttons")]
    pub buttons: ButtonMask,
}

impl PointerEvent {
    /// Create a pointer sample, clamping the position into the unit square
    pub fn new(pointer: u8, x: f32, y: f32, buttons: ButtonMask) -> Self {
        Self {
            pointer,
            x: clamp_unit(x),
            y: clamp_unit(y),
            z: None,
            buttons,
        }
    }

    /// Attach a pressure value
    pub fn with_pressure(mut self, z: f32) -> Self {
        self.z = Some(clamp_unit(z));
        self
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Typed diagnostic payloads, used for calibration and debugging
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DataPayload {
    /// Pen picked up from a pen tray
    PenSelected(u32),
    /// Express key state with the mapped key codes of the pressed keys
    Keys { mask: u8, codes: [u32; 3] },
    /// Raw centroid positions of both cameras
    CentroidPair { c1: u32, c2: u32 },
    /// Horizontal extent of both centroid regions
    CentroidWidths { w1: u32, w2: u32 },
    /// Triangulation angles in degrees
    AnglePair { alpha: f32, beta: f32 },
}

/// Payload of a canonical event
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EventKind {
    Pointer(PointerEvent),
    Status(Status),
    Data(DataPayload),
}

/// An event tagged with the instance that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanonicalEvent {
    pub device: DeviceKey,
    pub kind: EventKind,
}

impl CanonicalEvent {
    pub fn new(device: DeviceKey, kind: EventKind) -> Self {
        Self { device, kind }
    }

    pub fn status(device: DeviceKey, status: Status) -> Self {
        Self::new(device, EventKind::Status(status))
    }

    /// Returns the pointer sample if this is a pointer event
    pub fn pointer(&self) -> Option<&PointerEvent> {
        match &self.kind {
            EventKind::Pointer(pointer) => Some(pointer),
            _ => None,
        }
    }

    /// Returns the status if this is a status event
    pub fn status_kind(&self) -> Option<Status> {
        match self.kind {
            EventKind::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Receiver of canonical events.
///
/// Sinks are shared by every worker of a driver and are called concurrently
/// from several threads.
pub trait EventSink: Send + Sync {
    fn dispatch(&self, event: CanonicalEvent);
}

/// Sink forwarding events into a crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<CanonicalEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<CanonicalEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn dispatch(&self, event: CanonicalEvent) {
        if self.tx.send(event).is_err() {
            trace!("Event receiver dropped, discarding {:?}", event.kind);
        }
    }
}

/// Sink wrapping a plain callback
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(CanonicalEvent) + Send + Sync,
{
    fn dispatch(&self, event: CanonicalEvent) {
        (self.0)(event)
    }
}

/// Sink used until the host registers a callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn dispatch(&self, event: CanonicalEvent) {
        trace!("No callback registered, dropping {:?}", event.kind);
    }
}

/// Rate limiter for CommError events: the first error of a burst is reported,
/// the rest are suppressed until the next success.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommErrorLatch {
    tripped: bool,
}

impl CommErrorLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Returns true if it opens a new burst.
    pub fn fail(&mut self) -> bool {
        let first = !self.tripped;
        self.tripped = true;
        first
    }

    /// Record a success, closing the current burst
    pub fn succeed(&mut self) {
        self.tripped = false;
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_pointer_clamps_into_unit_square() {
        let pointer = PointerEvent::new(0, 1.5, -0.25, ButtonMask::TIP).with_pressure(2.0);
        assert_eq!(pointer.x, 1.0);
        assert_eq!(pointer.y, 0.0);
        assert_eq!(pointer.z, Some(1.0));

        let pointer = PointerEvent::new(0, f32::NAN, 0.5, ButtonMask::empty());
        assert_eq!(pointer.x, 0.0);
    }

    #[test]
    fn test_comm_error_latch() {
        let mut latch = CommErrorLatch::new();
        assert!(latch.fail());
        assert!(!latch.fail());
        assert!(!latch.fail());
        latch.succeed();
        assert!(!latch.is_tripped());
        assert!(latch.fail());
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (tx, rx) = unbounded();
        let sink = ChannelSink::new(tx);
        let key = DeviceKey::new(0x0d480001, 0x0001_0200);
        sink.dispatch(CanonicalEvent::status(key, Status::Ready));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.device, key);
        assert_eq!(event.status_kind(), Some(Status::Ready));
    }

    #[test]
    fn test_event_json_shape() {
        let key = DeviceKey::new(0x07dd0001, 0x0002_0300);
        let event = CanonicalEvent::new(
            key,
            EventKind::Pointer(PointerEvent::new(0, 0.5, 0.25, ButtonMask::TIP | ButtonMask::BARREL)),
        );
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["kind"]["Pointer"]["buttons"], 3);
        assert_eq!(json["kind"]["Pointer"]["x"], 0.5);
        assert_eq!(json["device"]["id"], 0x07dd0001u32);
    }
}
