/*!
HID pen tablets.

Each model has its own report id and axis ranges. Pressure is reported by
most models; it is attached to pointer events unless the model's
`<family>.pressure` parameter turns it off.
*/

use shared::checksum::in_range;
use shared::fields::{le16, RawRange};
use shared::protocol::REPORT_LEN;
use shared::{ButtonMask, DataPayload, DeviceId, ParamSpec, PointerEvent, Report};
use tracing::{debug, warn};

use super::{dump, DecodeContext, ProtocolDecoder};
use crate::transport::{TransportChannel, TransportError};

pub const SLATE_ID: u32 = 0x0b8c0083;
pub const FLEX_ID: u32 = 0x172f0037;
pub const SILVERCREST_ID: u32 = 0x172f0501;
pub const MOUSEPEN_ID: u32 = 0x55430004;
pub const MOBI_ID: u32 = 0x078c1005;

pub const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("slate.pointers", 2),
    ParamSpec::new("slate.pressure", 1),
    ParamSpec::new("slate.key1", 0),
    ParamSpec::new("slate.key2", 0),
    ParamSpec::new("slate.key3", 0),
    ParamSpec::new("flex.pointers", 1),
    ParamSpec::new("flex.pressure", 1),
    ParamSpec::new("silvercrest.pointers", 1),
    ParamSpec::new("mousepen.pointers", 1),
    ParamSpec::new("mobi.pointers", 1),
];

/// Slate status bits meaning "stylus in range"
const SLATE_IN_RANGE: u8 = 0x90;
/// Slate status bit set while the tool end is used
const SLATE_TOOL: u8 = 0x20;
/// Slate express keys in byte 7
const SLATE_KEYS: u8 = 0x38;

/// Mousepen reports tip contact below this raw pressure as noise
const MOUSEPEN_MIN_PRESSURE: u32 = 23;

const PRESSURE_1024: RawRange = RawRange::span(1024);

/// Tablet model, selected by device id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabletModel {
    Slate,
    FlexDesign,
    Silvercrest,
    Mousepen,
    Mobi,
}

impl TabletModel {
    pub fn from_id(id: DeviceId) -> Option<Self> {
        match id.0 {
            SLATE_ID => Some(Self::Slate),
            FLEX_ID => Some(Self::FlexDesign),
            SILVERCREST_ID => Some(Self::Silvercrest),
            MOUSEPEN_ID => Some(Self::Mousepen),
            MOBI_ID => Some(Self::Mobi),
            _ => None,
        }
    }

    /// Feature report sent right after opening
    fn init_report(self) -> Option<[u8; 2]> {
        match self {
            Self::Slate => Some([2, 2]),
            Self::FlexDesign => Some([2, 1]),
            _ => None,
        }
    }
}

pub struct TabletDecoder {
    model: TabletModel,
    keys: u8,
}

impl TabletDecoder {
    pub fn new(model: TabletModel) -> Self {
        Self { model, keys: 0 }
    }

    fn decode_slate(&mut self, report: &Report<'_>, ctx: &mut DecodeContext) {
        if report.id() != 2 {
            return;
        }

        let status = report.byte(1);
        if !in_range(status, SLATE_IN_RANGE) {
            self.slate_keys(report.byte(7) & SLATE_KEYS, ctx);
            return;
        }

        let bytes = report.as_bytes();
        let tool = status & SLATE_TOOL != 0;
        let buttons = if tool {
            ButtonMask::empty()
        } else {
            ButtonMask::from_bits_truncate(status & 0x07)
        };
        let pointer = if tool && ctx.param("slate.pointers", 2) > 1 {
            1
        } else {
            0
        };

        let mut event = PointerEvent::new(
            pointer,
            RawRange::span(17319).normalize(le16(bytes, 2)),
            RawRange::span(10819).normalize(le16(bytes, 4)),
            buttons,
        );
        if ctx.param("slate.pressure", 1) != 0 {
            event = event.with_pressure(RawRange::span(512).normalize(le16(bytes, 6)));
        }
        ctx.pointer(event);
    }

    fn slate_keys(&mut self, keys: u8, ctx: &mut DecodeContext) {
        if keys == self.keys {
            return;
        }
        self.keys = keys;

        let mask = keys >> 3;
        let mut codes = [0u32; 3];
        for (index, key) in ["slate.key1", "slate.key2", "slate.key3"].iter().enumerate() {
            if mask & (1 << index) != 0 {
                codes[index] = ctx.param(key, 0);
            }
        }
        debug!("Slate keys {:03b}", mask);
        ctx.data(DataPayload::Keys { mask, codes });
    }

    fn decode_flex(&mut self, report: &Report<'_>, ctx: &mut DecodeContext) {
        if report.id() != 16 {
            return;
        }
        let bytes = report.as_bytes();
        let mut event = PointerEvent::new(
            0,
            RawRange::span(12288).normalize(le16(bytes, 2)),
            RawRange::span(9216).normalize(le16(bytes, 4)),
            ButtonMask::from_bits_truncate(report.byte(1) & 0x07),
        );
        if ctx.param("flex.pressure", 1) != 0 {
            event = event.with_pressure(PRESSURE_1024.normalize(le16(bytes, 6)));
        }
        ctx.pointer(event);
    }

    fn decode_silvercrest(&mut self, report: &Report<'_>, ctx: &mut DecodeContext) {
        if report.id() != 16 {
            return;
        }
        let bytes = report.as_bytes();
        let event = PointerEvent::new(
            0,
            RawRange::span(18000).normalize(le16(bytes, 2)),
            RawRange::span(11000).normalize(le16(bytes, 4)),
            ButtonMask::empty(),
        )
        .with_pressure(PRESSURE_1024.normalize(le16(bytes, 6)));
        ctx.pointer(event);
    }

    fn decode_mousepen(&mut self, report: &Report<'_>, ctx: &mut DecodeContext) {
        if report.id() != 9 {
            return;
        }
        let bytes = report.as_bytes();
        let pressure = le16(bytes, 6);
        let mut buttons = ButtonMask::from_bits_truncate(report.byte(1) & 0x03);
        if pressure < MOUSEPEN_MIN_PRESSURE {
            buttons.remove(ButtonMask::TIP);
        }

        let event = PointerEvent::new(
            0,
            RawRange::span(32767).normalize(le16(bytes, 2)),
            RawRange::span(32767).normalize(le16(bytes, 4)),
            buttons,
        )
        .with_pressure(PRESSURE_1024.normalize(pressure));
        ctx.pointer(event);
    }

    fn decode_mobi(&mut self, report: &Report<'_>, ctx: &mut DecodeContext) {
        if report.id() != 5 {
            return;
        }
        let bytes = report.as_bytes();
        ctx.pointer(PointerEvent::new(
            0,
            RawRange::span(8000).normalize(le16(bytes, 1)),
            RawRange::span(6000).normalize(le16(bytes, 3)),
            ButtonMask::from_bits_truncate(report.byte(5) & 0x07),
        ));
    }
}

impl ProtocolDecoder for TabletDecoder {
    fn read_len(&self) -> usize {
        REPORT_LEN
    }

    fn open_session(&mut self, channel: &dyn TransportChannel) -> Result<(), TransportError> {
        if let Some(report) = self.model.init_report() {
            if let Err(e) = channel.send_feature_report(&report) {
                warn!("{:?} init feature report failed: {}", self.model, e);
            }
        }
        Ok(())
    }

    fn decode(&mut self, input: &[u8], ctx: &mut DecodeContext) {
        let Some(report) = Report::new(input) else {
            return;
        };
        dump(ctx, "tablet report", input);

        match self.model {
            TabletModel::Slate => self.decode_slate(&report, ctx),
            TabletModel::FlexDesign => self.decode_flex(&report, ctx),
            TabletModel::Silvercrest => self.decode_silvercrest(&report, ctx),
            TabletModel::Mousepen => self.decode_mousepen(&report, ctx),
            TabletModel::Mobi => self.decode_mobi(&report, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::transport::memory::MemoryChannel;
    use shared::EventKind;

    fn report(id: u8, status: u8, words: [u16; 3], tail: u8) -> Vec<u8> {
        let mut report = vec![0u8; 16];
        report[0] = id;
        report[1] = status;
        for (index, word) in words.iter().enumerate() {
            report[2 + index * 2..4 + index * 2].copy_from_slice(&word.to_le_bytes());
        }
        report[8] = tail;
        report
    }

    #[test]
    fn test_slate_in_range() {
        let mut decoder = TabletDecoder::new(TabletModel::Slate);
        let mut ctx = context(PARAMETERS);
        decoder.decode(&report(2, 0x91, [17319, 0, 256], 0), &mut ctx);

        let events = ctx.take_events();
        let pointer = pointers(&events)[0];
        assert_eq!((pointer.x, pointer.y), (1.0, 0.0));
        assert_eq!(pointer.z, Some(0.5));
        assert_eq!(pointer.buttons, ButtonMask::TIP);
        assert_eq!(pointer.pointer, 0);
    }

    #[test]
    fn test_slate_tool_end() {
        let mut decoder = TabletDecoder::new(TabletModel::Slate);
        let mut ctx = context(PARAMETERS);
        decoder.decode(&report(2, 0xB1, [100, 100, 100], 0), &mut ctx);
        let pointer = pointers(&ctx.take_events())[0];
        assert!(pointer.buttons.is_empty());
        assert_eq!(pointer.pointer, 1);

        ctx.params().set("slate.pointers", 1);
        decoder.decode(&report(2, 0xB1, [100, 100, 100], 0), &mut ctx);
        assert_eq!(pointers(&ctx.take_events())[0].pointer, 0);
    }

    #[test]
    fn test_slate_pressure_can_be_disabled() {
        let mut decoder = TabletDecoder::new(TabletModel::Slate);
        let mut ctx = context(PARAMETERS);
        ctx.params().set("slate.pressure", 0);
        decoder.decode(&report(2, 0x90, [100, 100, 100], 0), &mut ctx);
        assert_eq!(pointers(&ctx.take_events())[0].z, None);
    }

    #[test]
    fn test_out_of_range_slate_reports_key_changes_only() {
        let mut decoder = TabletDecoder::new(TabletModel::Slate);
        let mut ctx = context(PARAMETERS);
        ctx.params().set("slate.key2", 42);

        // Byte 7 is the high byte of the pressure word in the helper
        let mut keys = report(2, 0x00, [0, 0, 0], 0);
        keys[7] = 0x10;
        decoder.decode(&keys, &mut ctx);
        decoder.decode(&keys, &mut ctx);

        let events = ctx.take_events();
        assert!(pointers(&events).is_empty());
        assert_eq!(
            events,
            vec![EventKind::Data(DataPayload::Keys {
                mask: 0b010,
                codes: [0, 42, 0]
            })]
        );

        keys[7] = 0x00;
        decoder.decode(&keys, &mut ctx);
        assert_eq!(ctx.take_events().len(), 1);
    }

    #[test]
    fn test_flex_and_silvercrest() {
        let mut flex = TabletDecoder::new(TabletModel::FlexDesign);
        let mut ctx = context(PARAMETERS);
        flex.decode(&report(16, 0x06, [6144, 9216, 1024], 0), &mut ctx);
        let pointer = pointers(&ctx.take_events())[0];
        assert_eq!((pointer.x, pointer.y, pointer.z), (0.5, 1.0, Some(1.0)));
        assert_eq!(pointer.buttons, ButtonMask::BARREL | ButtonMask::INVERT);

        let mut silvercrest = TabletDecoder::new(TabletModel::Silvercrest);
        silvercrest.decode(&report(16, 0x07, [9000, 5500, 0], 0), &mut ctx);
        let pointer = pointers(&ctx.take_events())[0];
        assert_eq!((pointer.x, pointer.y), (0.5, 0.5));
        assert!(pointer.buttons.is_empty());
        assert_eq!(pointer.z, Some(0.0));

        // Wrong report id
        silvercrest.decode(&report(9, 0x07, [9000, 5500, 0], 0), &mut ctx);
        assert!(ctx.take_events().is_empty());
    }

    #[test]
    fn test_mousepen_pressure_gate() {
        let mut decoder = TabletDecoder::new(TabletModel::Mousepen);
        let mut ctx = context(PARAMETERS);
        decoder.decode(&report(9, 0x03, [100, 100, 22], 0), &mut ctx);
        decoder.decode(&report(9, 0x03, [100, 100, 23], 0), &mut ctx);

        let events = ctx.take_events();
        let pointers = pointers(&events);
        assert_eq!(pointers[0].buttons, ButtonMask::BARREL);
        assert_eq!(pointers[1].buttons, ButtonMask::TIP | ButtonMask::BARREL);
    }

    #[test]
    fn test_mobi() {
        let mut decoder = TabletDecoder::new(TabletModel::Mobi);
        let mut ctx = context(PARAMETERS);
        let mut report = vec![5u8, 0, 0, 0, 0, 0x01];
        report[1..3].copy_from_slice(&4000u16.to_le_bytes());
        report[3..5].copy_from_slice(&6000u16.to_le_bytes());
        decoder.decode(&report, &mut ctx);

        let pointer = pointers(&ctx.take_events())[0];
        assert_eq!((pointer.x, pointer.y, pointer.z), (0.5, 1.0, None));
        assert_eq!(pointer.buttons, ButtonMask::TIP);
    }

    #[test]
    fn test_init_feature_reports() {
        let (channel, _tx) = MemoryChannel::new();
        TabletDecoder::new(TabletModel::Slate)
            .open_session(channel.as_ref())
            .unwrap();
        TabletDecoder::new(TabletModel::FlexDesign)
            .open_session(channel.as_ref())
            .unwrap();
        TabletDecoder::new(TabletModel::Mobi)
            .open_session(channel.as_ref())
            .unwrap();
        assert_eq!(channel.features(), vec![vec![2, 2], vec![2, 1]]);
    }

    #[test]
    fn test_model_lookup() {
        assert_eq!(TabletModel::from_id(DeviceId(SLATE_ID)), Some(TabletModel::Slate));
        assert_eq!(TabletModel::from_id(DeviceId(0xdeadbeef)), None);
    }
}
