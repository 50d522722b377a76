/*!
Smart DViT dual-camera board.

Every read carries one frame from each corner camera. The lit spot of each
frame gives a horizontal centroid; the pair is triangulated into a board
position. The pen is considered down while both cameras see it.
*/

use shared::centroid::{centroid_of_frame, YUYV_FRAME_LEN};
use shared::triangulation::triangulate;
use shared::{ButtonMask, DataPayload, ParamSpec, PointerEvent, TriangulationModel};
use tracing::{debug, warn};

use super::{DecodeContext, ProtocolDecoder};

pub const DVIT_ID: u32 = 0x0b8c000e;

/// Bytes of one read: camera 0 frame, then camera 1 frame
pub const FRAME_PAIR_LEN: usize = YUYV_FRAME_LEN * 2;

pub const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("dvit.calibrate", 1),
    ParamSpec::new("dvit.pointers", 1),
    ParamSpec::new("dvit.method", 5),
];

pub struct DvitDecoder {
    scratch: Vec<u8>,
    /// Last triangulated position while the pen is down
    contact: Option<(f32, f32)>,
}

impl DvitDecoder {
    pub fn new() -> Self {
        Self {
            scratch: Vec::with_capacity(YUYV_FRAME_LEN / 2),
            contact: None,
        }
    }
}

impl Default for DvitDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDecoder for DvitDecoder {
    fn read_len(&self) -> usize {
        FRAME_PAIR_LEN
    }

    fn decode(&mut self, input: &[u8], ctx: &mut DecodeContext) {
        if input.len() < FRAME_PAIR_LEN {
            warn!(
                "Incomplete camera frame pair ({} of {} bytes)",
                input.len(),
                FRAME_PAIR_LEN
            );
            return;
        }
        let (camera0, camera1) = input[..FRAME_PAIR_LEN].split_at(YUYV_FRAME_LEN);

        let spot0 = centroid_of_frame(camera0, &mut self.scratch);
        let spot1 = centroid_of_frame(camera1, &mut self.scratch);
        let c1 = spot0.map_or(0, |spot| spot.x);
        let c2 = spot1.map_or(0, |spot| spot.x);

        if c1 > 0 && c2 > 0 {
            let model = TriangulationModel::from_param(ctx.param("dvit.method", 5));
            let Some(result) = triangulate(model, c1, c2) else {
                debug!("No position for centroids {} / {} with {:?}", c1, c2, model);
                return;
            };

            if ctx.debug_enabled() {
                ctx.data(DataPayload::CentroidPair { c1, c2 });
                ctx.data(DataPayload::CentroidWidths {
                    w1: spot0.map_or(0, |spot| spot.width),
                    w2: spot1.map_or(0, |spot| spot.width),
                });
                if let Some((alpha, beta)) = result.angles {
                    ctx.data(DataPayload::AnglePair {
                        alpha: alpha as f32,
                        beta: beta as f32,
                    });
                }
            }

            let pointer = PointerEvent::new(0, result.x as f32, result.y as f32, ButtonMask::TIP);
            self.contact = Some((pointer.x, pointer.y));
            ctx.pointer(pointer);
        } else if let Some((x, y)) = self.contact.take() {
            ctx.pointer(PointerEvent::new(0, x, y, ButtonMask::empty()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use shared::centroid::FRAME_WIDTH;
    use shared::EventKind;

    fn frame_pair(spot0: Option<usize>, spot1: Option<usize>) -> Vec<u8> {
        let mut pair = vec![0u8; FRAME_PAIR_LEN];
        for (camera, spot) in [spot0, spot1].into_iter().enumerate() {
            if let Some(center) = spot {
                for row in 200..210 {
                    for col in center - 2..=center + 2 {
                        pair[camera * YUYV_FRAME_LEN + (row * FRAME_WIDTH + col) * 2] = 255;
                    }
                }
            }
        }
        pair
    }

    #[test]
    fn test_press_then_single_release() {
        let mut decoder = DvitDecoder::new();
        let mut ctx = context(PARAMETERS);

        decoder.decode(&frame_pair(Some(320), Some(320)), &mut ctx);
        decoder.decode(&frame_pair(None, Some(320)), &mut ctx);
        decoder.decode(&frame_pair(None, None), &mut ctx);

        let events = ctx.take_events();
        let pointers = pointers(&events);
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[0].buttons, ButtonMask::TIP);
        assert!((pointers[0].x - 0.5225).abs() < 1e-3);
        assert!(pointers[1].buttons.is_empty());
        assert_eq!((pointers[1].x, pointers[1].y), (pointers[0].x, pointers[0].y));
    }

    #[test]
    fn test_no_release_without_contact() {
        let mut decoder = DvitDecoder::new();
        let mut ctx = context(PARAMETERS);
        decoder.decode(&frame_pair(Some(320), None), &mut ctx);
        assert!(ctx.take_events().is_empty());
    }

    #[test]
    fn test_debug_data_events() {
        let mut decoder = DvitDecoder::new();
        let mut ctx = context(PARAMETERS);
        ctx.params().set("common.debug", 1);
        decoder.decode(&frame_pair(Some(320), Some(320)), &mut ctx);

        let events = ctx.take_events();
        assert_eq!(
            events[0],
            EventKind::Data(DataPayload::CentroidPair { c1: 320, c2: 320 })
        );
        assert_eq!(
            events[1],
            EventKind::Data(DataPayload::CentroidWidths { w1: 4, w2: 4 })
        );
        assert!(matches!(events[2], EventKind::Data(DataPayload::AnglePair { .. })));
        assert!(matches!(events[3], EventKind::Pointer(_)));
    }

    #[test]
    fn test_method_parameter_is_read_per_frame() {
        let mut decoder = DvitDecoder::new();
        let mut ctx = context(PARAMETERS);
        ctx.params().set("dvit.method", 6);
        decoder.decode(&frame_pair(Some(320), Some(320)), &mut ctx);

        let pointer = pointers(&ctx.take_events())[0];
        assert!((pointer.x - 0.5).abs() < 1e-6);
        assert!((pointer.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_short_read_ignored() {
        let mut decoder = DvitDecoder::new();
        let mut ctx = context(PARAMETERS);
        decoder.decode(&[0u8; 128], &mut ctx);
        assert!(ctx.take_events().is_empty());
    }
}
