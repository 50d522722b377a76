/*!
Promethean ActiveBoard over a USB interrupt endpoint.
*/

use shared::fields::{le16, RawRange};
use shared::protocol::REPORT_LEN;
use shared::{ButtonMask, ParamSpec, PointerEvent, Report};
use tracing::{debug, trace};

use super::{dump, DecodeContext, ProtocolDecoder};

pub const ENDPOINT_IN: u8 = 0x81;
pub const INTERFACE: u8 = 0;

pub const RANGE: RawRange = RawRange::span(32767);

/// Shortest report that carries position and buttons
const MIN_REPORT_LEN: usize = 8;

const IN_RANGE: u8 = 0x04;

pub const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("activeboard.calibrate", 1),
    ParamSpec::new("activeboard.pointers", 1),
];

#[derive(Debug, Default)]
pub struct PrometheanDecoder;

impl PrometheanDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ProtocolDecoder for PrometheanDecoder {
    fn read_len(&self) -> usize {
        REPORT_LEN
    }

    fn decode(&mut self, input: &[u8], ctx: &mut DecodeContext) {
        let Some(report) = Report::new(input) else {
            return;
        };
        if report.len() < MIN_REPORT_LEN {
            debug!("Short ActiveBoard report ({} bytes)", report.len());
            return;
        }
        dump(ctx, "activeboard report", report.as_bytes());

        let status = report.byte(7);
        // Decoded for diagnostics only; the board keeps reporting out of range
        trace!("ActiveBoard in range: {}", status & IN_RANGE != 0);

        let buttons = ButtonMask::from_bits_truncate(status & 0x03);
        let x = le16(input, 3);
        let y = le16(input, 5);

        ctx.pointer(PointerEvent::new(0, RANGE.normalize(x), RANGE.normalize(y), buttons));
    }
}
