/*!
Protocol decoders.

One decoder per device family turns raw reads into canonical events. A decoder
never touches the event sink or the transport directly during decoding: it
pushes events and outbound writes into a [`DecodeContext`], and the worker
flushes both after every read. That keeps decoders testable with plain byte
slices.
*/

use std::sync::Arc;

use shared::{
    CommErrorLatch, DataPayload, DriverError, EventKind, ParameterTable, PointerEvent, Status,
};
use tracing::{debug, warn};

use crate::keepalive::KeepAlive;
use crate::transport::{TransportChannel, TransportError};

pub mod dvit;
pub mod iqboard;
pub mod multiclass;
pub mod promethean;
pub mod tablet;
pub mod whiteboard;

/// Per-family decode logic driven by the decode worker
pub trait ProtocolDecoder: Send {
    /// Size of the read buffer handed to the transport
    fn read_len(&self) -> usize;

    /// Session setup right after the transport opened (init writes, feature
    /// reports, settle delays). An error aborts the start like an open failure.
    fn open_session(&mut self, _channel: &dyn TransportChannel) -> Result<(), TransportError> {
        Ok(())
    }

    /// Hook run before every read, used for request/reply handshakes
    fn before_read(&mut self, _ctx: &mut DecodeContext) {}

    /// Decode the bytes of one read
    fn decode(&mut self, input: &[u8], ctx: &mut DecodeContext);

    /// A read timed out without data
    fn on_idle(&mut self) {}

    /// A queued write failed
    fn on_write_error(&mut self) {}

    /// Heartbeat this protocol needs, if any
    fn keep_alive(&self) -> Option<KeepAlive> {
        None
    }
}

/// Output buffer and shared state handed to a decoder for each read
pub struct DecodeContext {
    params: Arc<ParameterTable>,
    events: Vec<EventKind>,
    writes: Vec<Vec<u8>>,
    frame_errors: CommErrorLatch,
}

impl DecodeContext {
    pub fn new(params: Arc<ParameterTable>) -> Self {
        Self {
            params,
            events: Vec::new(),
            writes: Vec::new(),
            frame_errors: CommErrorLatch::new(),
        }
    }

    pub fn params(&self) -> &ParameterTable {
        &self.params
    }

    /// Parameter value, or `default` for keys this driver does not define
    pub fn param(&self, key: &str, default: u32) -> u32 {
        self.params.get_or(key, default)
    }

    pub fn debug_enabled(&self) -> bool {
        self.params.debug() != 0
    }

    pub fn pointer(&mut self, pointer: PointerEvent) {
        self.events.push(EventKind::Pointer(pointer));
    }

    pub fn data(&mut self, payload: DataPayload) {
        self.events.push(EventKind::Data(payload));
    }

    pub fn status(&mut self, status: Status) {
        self.events.push(EventKind::Status(status));
    }

    /// Queue bytes to write to the device after this read
    pub fn write(&mut self, bytes: impl Into<Vec<u8>>) {
        self.writes.push(bytes.into());
    }

    /// A frame passed its validity check; closes any CommError burst
    pub fn frame_valid(&mut self) {
        self.frame_errors.succeed();
    }

    /// A frame failed its validity check. The first failure of a burst is
    /// reported as CommError, the rest only logged.
    pub fn frame_invalid(&mut self, error: DriverError) {
        if self.frame_errors.fail() {
            warn!("Dropping frame: {}", error);
            self.status(Status::CommError);
        } else {
            debug!("Dropping frame: {}", error);
        }
    }

    pub fn take_events(&mut self) -> Vec<EventKind> {
        std::mem::take(&mut self.events)
    }

    pub fn take_writes(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.writes)
    }
}

/// Log a raw frame as hex when `common.debug` is on
pub(crate) fn dump(ctx: &DecodeContext, label: &str, bytes: &[u8]) {
    if ctx.debug_enabled() {
        debug!("{} {}", label, hex::encode(bytes));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use shared::ParamSpec;

    pub fn context(specs: &[ParamSpec]) -> DecodeContext {
        DecodeContext::new(Arc::new(ParameterTable::with_defaults(specs)))
    }

    pub fn pointers(events: &[EventKind]) -> Vec<PointerEvent> {
        events
            .iter()
            .filter_map(|event| match event {
                EventKind::Pointer(pointer) => Some(*pointer),
                _ => None,
            })
            .collect()
    }

    pub fn comm_errors(events: &[EventKind]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, EventKind::Status(Status::CommError)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_frame_errors_are_burst_latched() {
        let mut ctx = context(&[]);
        for _ in 0..3 {
            ctx.frame_invalid(DriverError::FrameChecksum {
                expected: 1,
                actual: 2,
            });
        }
        assert_eq!(comm_errors(&ctx.take_events()), 1);

        ctx.frame_valid();
        ctx.frame_invalid(DriverError::FrameChecksum {
            expected: 1,
            actual: 2,
        });
        assert_eq!(comm_errors(&ctx.take_events()), 1);
    }

    #[test]
    fn test_take_drains() {
        let mut ctx = context(&[]);
        ctx.write(vec![0xCC]);
        ctx.status(Status::Ready);
        assert_eq!(ctx.take_writes(), vec![vec![0xCC]]);
        assert!(ctx.take_writes().is_empty());
        assert_eq!(ctx.take_events().len(), 1);
        assert!(ctx.take_events().is_empty());
    }
}
