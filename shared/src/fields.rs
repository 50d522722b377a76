/*!
Field extraction and range normalization.

Devices report coordinates as little-endian words, as 6-bit groups split over
two bytes, or as nibbles packed next to another axis. The helpers here pull
those fields out of a byte slice; [`RawRange`] maps the raw value to [0, 1].
*/

use serde::Serialize;

/// Documented raw range of one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawRange {
    pub min: u32,
    pub max: u32,
}

impl RawRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Range starting at zero with the given divisor
    pub const fn span(max: u32) -> Self {
        Self { min: 0, max }
    }

    /// Clamp `raw` into the range, then map it to [0, 1]
    pub fn normalize(&self, raw: u32) -> f32 {
        let width = self.max.saturating_sub(self.min);
        if width == 0 {
            return 0.0;
        }
        let clamped = raw.clamp(self.min, self.max);
        (clamped - self.min) as f32 / width as f32
    }
}

/// Little-endian 16-bit word at `offset`, 0 if the slice is too short
pub fn le16(bytes: &[u8], offset: usize) -> u32 {
    match bytes.get(offset..offset + 2) {
        Some(word) => u32::from(word[0]) | (u32::from(word[1]) << 8),
        None => 0,
    }
}

/// 12-bit value from two 6-bit groups: `((hi & 0x3F) << 6) | (lo & 0x3F)`
pub fn packed6(hi: u8, lo: u8) -> u32 {
    (u32::from(hi & 0x3F) << 6) | u32::from(lo & 0x3F)
}

/// 12-bit value from a low byte plus a 4-bit nibble taken from `shared`.
/// `high_nibble` selects the upper nibble of `shared`, otherwise the lower.
pub fn byte_plus_nibble(low: u8, shared: u8, high_nibble: bool) -> u32 {
    let nibble = if high_nibble { shared >> 4 } else { shared & 0x0F };
    u32::from(low) | (u32::from(nibble) << 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_offset_range() {
        let range = RawRange::new(440, 3537);
        assert_eq!(range.normalize(440), 0.0);
        assert_eq!(range.normalize(3537), 1.0);
        assert!((range.normalize(1988) - 0.4998).abs() < 1e-3);
    }

    #[test]
    fn test_normalize_clamps_noise() {
        let range = RawRange::new(632, 3270);
        assert_eq!(range.normalize(0), 0.0);
        assert_eq!(range.normalize(4095), 1.0);

        let range = RawRange::span(4096);
        assert_eq!(range.normalize(5000), 1.0);
        assert_eq!(range.normalize(2048), 0.5);
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(RawRange::new(10, 10).normalize(10), 0.0);
    }

    #[test]
    fn test_le16() {
        let bytes = [0x02, 0x34, 0x12, 0xFF];
        assert_eq!(le16(&bytes, 1), 0x1234);
        assert_eq!(le16(&bytes, 3), 0);
    }

    #[test]
    fn test_packed6() {
        assert_eq!(packed6(0x3F, 0x3F), 4095);
        assert_eq!(packed6(0xC1, 0x02), (1 << 6) | 2);
    }

    #[test]
    fn test_byte_plus_nibble() {
        // Smart Board packs both high nibbles into one byte
        assert_eq!(byte_plus_nibble(0x34, 0xA5, true), 0xA34);
        assert_eq!(byte_plus_nibble(0x34, 0xA5, false), 0x534);
    }
}
