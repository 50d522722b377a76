/*!
Frame validity checks.

Three disciplines exist across the supported devices: an XOR fold compared
against a trailer byte, a fiability byte compared against a threshold, and an
in-range flag in a status byte.
*/

use crate::error::{DriverError, Result};

/// XOR of every byte in `bytes`
pub fn xor_fold(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Check that the XOR of `frame[range]` equals the last byte of the frame
pub fn verify_xor_trailer(frame: &[u8], payload: std::ops::Range<usize>) -> Result<()> {
    let Some((&actual, _)) = frame.split_last() else {
        return Err(DriverError::FrameChecksum {
            expected: 0,
            actual: 0,
        });
    };

    let expected = frame.get(payload).map(xor_fold).unwrap_or(!actual);
    if expected == actual {
        Ok(())
    } else {
        Err(DriverError::FrameChecksum { expected, actual })
    }
}

/// A reported confidence byte must exceed the configured minimum
pub fn passes_fiability(fiability: u8, minimum: u32) -> bool {
    u32::from(fiability) > minimum
}

/// All bits of `mask` must be set in `status`
pub fn in_range(status: u8, mask: u8) -> bool {
    status & mask == mask
}
