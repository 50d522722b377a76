/*!
Frame boundaries for the two framing disciplines.

Serial boards stream fixed-size frames without any length prefix; a
[`FrameBuffer`] collects bytes one at a time and hands out a complete window
once N bytes are buffered. No resynchronization search is done: a shifted
stream self-corrects only by discarding whole frames.

HID and USB interrupt devices deliver whole reports, where the first byte
selects the report type; [`Report`] is a view over one of those.
*/

use tracing::trace;

/// Rolling byte window sized to one protocol frame
#[derive(Debug, Clone)]
pub struct FrameBuffer<const N: usize> {
    buffer: [u8; N],
    cursor: usize,
    frames_completed: u64,
    frames_discarded: u64,
}

impl<const N: usize> FrameBuffer<N> {
    /// Create an empty frame buffer
    pub fn new() -> Self {
        Self {
            buffer: [0; N],
            cursor: 0,
            frames_completed: 0,
            frames_discarded: 0,
        }
    }

    /// Append one byte. Returns the frame once N bytes are buffered; the
    /// buffer is reset at that point whatever the caller does with the frame.
    pub fn push(&mut self, byte: u8) -> Option<[u8; N]> {
        self.buffer[self.cursor] = byte;
        self.cursor += 1;

        if self.cursor < N {
            return None;
        }

        self.cursor = 0;
        self.frames_completed += 1;
        Some(self.buffer)
    }

    /// Record that the last completed frame had an unrecognized header
    pub fn discard(&mut self, frame: &[u8; N]) {
        self.frames_discarded += 1;
        trace!("Discarding frame with unknown header {:02x?}", &frame[..2.min(N)]);
    }

    /// Number of bytes buffered towards the next frame
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Drop any partially buffered frame
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Get statistics: (frames completed, frames discarded)
    pub fn stats(&self) -> (u64, u64) {
        (self.frames_completed, self.frames_discarded)
    }
}

impl<const N: usize> Default for FrameBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether a frame starts with the given magic sequence
pub fn has_magic(frame: &[u8], magic: &[u8]) -> bool {
    frame.starts_with(magic)
}

/// View over a single HID or USB interrupt report.
///
/// Offsets passed to [`Report::byte`] are absolute, so byte 0 is the report id.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    bytes: &'a [u8],
}

impl<'a> Report<'a> {
    /// Wrap a report; empty reads carry no report
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self { bytes })
        }
    }

    /// Report-ID selector
    pub fn id(&self) -> u8 {
        self.bytes[0]
    }

    /// Byte at an absolute offset, 0 past the end of a short report
    pub fn byte(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
