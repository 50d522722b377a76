/*!
Multiclass serial protocol.

After an init byte the board sends a session header (`0xA8 ...`), from then on
it expects a `0xCC` every second. Pointer frames are `AA AA` followed by a
press flag, four 6-bit coordinate groups and an XOR checksum of bytes 2..7.
Release frames carry no usable position, so releases are reported at the
last press.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shared::checksum::verify_xor_trailer;
use shared::fields::RawRange;
use shared::frame::has_magic;
use shared::protocol::SERIAL_FRAME_LEN;
use shared::{ButtonMask, FrameBuffer, ParamSpec, PointerEvent};
use tracing::{debug, info, trace};

use super::{dump, DecodeContext, ProtocolDecoder};
use crate::keepalive::KeepAlive;
use crate::transport::{TransportChannel, TransportError};

pub const BAUD_RATE: u32 = 9600;

pub const INIT: u8 = 0xCA;
pub const KEEP_ALIVE: u8 = 0xCC;
pub const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(1);

const SESSION_HEADER: u8 = 0xA8;
const POINTER_MAGIC: [u8; 2] = [0xAA, 0xAA];
const PRESS: u8 = 0x41;

pub const RANGE: RawRange = RawRange::span(4096);

pub const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("multiclass.pointers", 1),
    ParamSpec::new("multiclass.calibrate", 1),
    ParamSpec::new("multiclass.tty", 0),
];

pub const TTY_PARAMETER: &str = "multiclass.tty";

pub struct MulticlassDecoder {
    frames: FrameBuffer<SERIAL_FRAME_LEN>,
    settle: Duration,
    session: Arc<AtomicBool>,
    last_press: Option<(u32, u32)>,
}

impl MulticlassDecoder {
    pub fn new(settle: Duration) -> Self {
        Self {
            frames: FrameBuffer::new(),
            settle,
            session: Arc::new(AtomicBool::new(false)),
            last_press: None,
        }
    }

    /// Whether the session header has been received
    pub fn session_open(&self) -> bool {
        self.session.load(Ordering::Acquire)
    }

    fn handle_frame(&mut self, frame: &[u8; SERIAL_FRAME_LEN], ctx: &mut DecodeContext) {
        dump(ctx, "multiclass frame", frame);

        if frame[0] == SESSION_HEADER {
            if !self.session.swap(true, Ordering::AcqRel) {
                info!("Multiclass session header received");
            }
            return;
        }

        if !has_magic(frame, &POINTER_MAGIC) {
            self.frames.discard(frame);
            return;
        }

        if let Err(e) = verify_xor_trailer(frame, 2..SERIAL_FRAME_LEN - 1) {
            ctx.frame_invalid(e);
            return;
        }
        ctx.frame_valid();

        if frame[2] == PRESS {
            let y = (u32::from(frame[3]) << 6) | u32::from(frame[4]);
            let x = (u32::from(frame[5]) << 6) | u32::from(frame[6]);
            ctx.pointer(PointerEvent::new(
                0,
                RANGE.normalize(x),
                RANGE.normalize(y),
                ButtonMask::TIP,
            ));
            self.last_press = Some((x, y));
        } else if let Some((x, y)) = self.last_press {
            ctx.pointer(PointerEvent::new(
                0,
                RANGE.normalize(x),
                RANGE.normalize(y),
                ButtonMask::empty(),
            ));
        } else {
            debug!("Release without a prior press, ignoring");
        }
    }
}

impl ProtocolDecoder for MulticlassDecoder {
    fn read_len(&self) -> usize {
        SERIAL_FRAME_LEN
    }

    fn open_session(&mut self, channel: &dyn TransportChannel) -> Result<(), TransportError> {
        if !self.settle.is_zero() {
            debug!("Waiting {:?} for the board to settle", self.settle);
            thread::sleep(self.settle);
        }
        channel.write(&[INIT])?;
        Ok(())
    }

    fn decode(&mut self, input: &[u8], ctx: &mut DecodeContext) {
        for &byte in input {
            if let Some(frame) = self.frames.push(byte) {
                self.handle_frame(&frame, ctx);
            }
        }
    }

    /// A partial frame does not survive a silent read
    fn on_idle(&mut self) {
        if !self.frames.is_empty() {
            trace!("Dropping {} stray bytes", self.frames.len());
            self.frames.reset();
        }
    }

    fn keep_alive(&self) -> Option<KeepAlive> {
        Some(KeepAlive {
            payload: vec![KEEP_ALIVE],
            period: KEEP_ALIVE_PERIOD,
            armed: Arc::clone(&self.session),
        })
    }
}
