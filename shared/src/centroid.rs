/*!
Bright-spot extraction from camera frames.

Frames arrive as packed YUYV (two bytes per pixel, luminance in the even
byte). A pixel is on when its luminance is above [`LUMA_THRESHOLD`]; the
centroid is the center of the bounding box of all on pixels.
*/

/// Camera frame width in pixels
pub const FRAME_WIDTH: usize = 640;

/// Camera frame height in pixels
pub const FRAME_HEIGHT: usize = 480;

/// Bytes per packed YUYV frame
pub const YUYV_FRAME_LEN: usize = FRAME_WIDTH * FRAME_HEIGHT * 2;

/// Luminance above which a pixel counts as lit
pub const LUMA_THRESHOLD: u8 = 200;

/// Bounding-box center and extent of the lit region of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Centroid {
    pub x: u32,
    pub y: u32,
    /// Horizontal extent of the lit region
    pub width: u32,
}

/// Binarize a YUYV frame into one byte per pixel (0x00 or 0xFF)
pub fn binarize(yuyv: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.extend(yuyv.chunks_exact(2).map(|pixel| {
        if pixel[0] > LUMA_THRESHOLD {
            0xFF
        } else {
            0x00
        }
    }));
}

/// Compute the centroid of a binarized `FRAME_WIDTH`-wide image
pub fn find_centroid(binary: &[u8]) -> Option<Centroid> {
    let mut left = usize::MAX;
    let mut right = 0;
    let mut top = usize::MAX;
    let mut bottom = 0;

    for (row_index, row) in binary.chunks(FRAME_WIDTH).enumerate() {
        for (col_index, &value) in row.iter().enumerate() {
            if value == 0xFF {
                left = left.min(col_index);
                right = right.max(col_index);
                top = top.min(row_index);
                bottom = bottom.max(row_index);
            }
        }
    }

    if left == usize::MAX {
        return None;
    }

    Some(Centroid {
        x: ((left + right) / 2) as u32,
        y: ((top + bottom) / 2) as u32,
        width: (right - left) as u32,
    })
}

/// Binarize a YUYV frame and extract its centroid, reusing `scratch`
pub fn centroid_of_frame(yuyv: &[u8], scratch: &mut Vec<u8>) -> Option<Centroid> {
    binarize(yuyv, scratch);
    find_centroid(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_spot(columns: std::ops::Range<usize>, rows: std::ops::Range<usize>) -> Vec<u8> {
        let mut frame = vec![0u8; YUYV_FRAME_LEN];
        for row in rows {
            for col in columns.clone() {
                frame[(row * FRAME_WIDTH + col) * 2] = 250;
            }
        }
        frame
    }

    #[test]
    fn test_dark_frame_has_no_centroid() {
        let frame = vec![0u8; YUYV_FRAME_LEN];
        let mut scratch = Vec::new();
        assert_eq!(centroid_of_frame(&frame, &mut scratch), None);
    }

    #[test]
    fn test_spot_centroid() {
        let frame = frame_with_spot(300..341, 10..21);
        let mut scratch = Vec::new();
        let centroid = centroid_of_frame(&frame, &mut scratch).unwrap();
        assert_eq!(centroid.x, 320);
        assert_eq!(centroid.y, 15);
        assert_eq!(centroid.width, 40);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut frame = vec![0u8; YUYV_FRAME_LEN];
        frame[0] = LUMA_THRESHOLD;
        let mut scratch = Vec::new();
        assert_eq!(centroid_of_frame(&frame, &mut scratch), None);

        // Chroma bytes never count
        frame[1] = 255;
        assert_eq!(centroid_of_frame(&frame, &mut scratch), None);
    }
}
