/*!
IQBoard serial protocol.

The board answers a request frame with either an ACK or one pointer frame, so
the decoder keeps exactly one request outstanding. Every frame is 8 bytes and
carries an XOR checksum of bytes 0..7 in byte 7.
*/

use shared::checksum::verify_xor_trailer;
use shared::fields::{packed6, RawRange};
use shared::frame::has_magic;
use shared::protocol::SERIAL_FRAME_LEN;
use shared::{ButtonMask, FrameBuffer, ParamSpec, PointerEvent};
use tracing::trace;

use super::{dump, DecodeContext, ProtocolDecoder};

pub const BAUD_RATE: u32 = 19200;

/// Request sent whenever no reply is outstanding
pub const REQUEST: [u8; SERIAL_FRAME_LEN] = [0xCE, 0, 0, 0, 0, 0, 0, 0];

const POINTER_MAGIC: [u8; 2] = [0xEE, 0xEE];
const ACK_MAGIC: [u8; 2] = [0xC8, 0xCA];

/// Button byte value while the pen touches the board
const TIP_DOWN: u8 = 0x51;

pub const RANGE_X: RawRange = RawRange::new(440, 3537);
pub const RANGE_Y: RawRange = RawRange::new(632, 3270);

pub const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("iqboard.pointers", 1),
    ParamSpec::new("iqboard.calibrate", 1),
    ParamSpec::new("iqboard.tty", 0),
];

pub const TTY_PARAMETER: &str = "iqboard.tty";

#[derive(Debug, Default)]
pub struct IqBoardDecoder {
    frames: FrameBuffer<SERIAL_FRAME_LEN>,
    awaiting_reply: bool,
}

impl IqBoardDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_frame(&mut self, frame: &[u8; SERIAL_FRAME_LEN], ctx: &mut DecodeContext) {
        dump(ctx, "iqboard frame", frame);

        if let Err(e) = verify_xor_trailer(frame, 0..SERIAL_FRAME_LEN - 1) {
            ctx.frame_invalid(e);
            return;
        }
        ctx.frame_valid();

        if has_magic(frame, &POINTER_MAGIC) {
            let x = packed6(frame[5], frame[6]);
            let y = packed6(frame[3], frame[4]);
            let buttons = if frame[2] == TIP_DOWN {
                ButtonMask::TIP
            } else {
                ButtonMask::empty()
            };

            ctx.pointer(PointerEvent::new(
                0,
                RANGE_X.normalize(x),
                RANGE_Y.normalize(y),
                buttons,
            ));
            self.awaiting_reply = false;
        } else if has_magic(frame, &ACK_MAGIC) {
            trace!("IQBoard ACK");
            self.awaiting_reply = false;
        } else {
            self.frames.discard(frame);
        }
    }
}

impl ProtocolDecoder for IqBoardDecoder {
    fn read_len(&self) -> usize {
        SERIAL_FRAME_LEN
    }

    fn before_read(&mut self, ctx: &mut DecodeContext) {
        if !self.awaiting_reply {
            ctx.write(REQUEST.to_vec());
            self.awaiting_reply = true;
        }
    }

    fn decode(&mut self, input: &[u8], ctx: &mut DecodeContext) {
        for &byte in input {
            if let Some(frame) = self.frames.push(byte) {
                self.handle_frame(&frame, ctx);
            }
        }
    }

    /// The gap after a reply marks a frame boundary, so a partial frame left
    /// by a lost byte is dropped here
    fn on_idle(&mut self) {
        self.awaiting_reply = false;
        if !self.frames.is_empty() {
            trace!("Dropping {} stray bytes", self.frames.len());
            self.frames.reset();
        }
    }

    fn on_write_error(&mut self) {
        self.awaiting_reply = false;
    }
}
