/*!
HID whiteboards: eBeam, Smart Board and Team Board.

The three boards share a driver but nothing else, so the decoder holds one
state variant per board.
*/

use shared::checksum::passes_fiability;
use shared::fields::{byte_plus_nibble, le16, RawRange};
use shared::protocol::{REPORT_LEN, SMART_OUTPUT_REPORT_LEN};
use shared::{ButtonMask, DataPayload, DeviceId, DriverError, ParamSpec, PointerEvent, Report};
use tracing::{debug, info, warn};

use super::{dump, DecodeContext, ProtocolDecoder};

pub const EBEAM_ID: u32 = 0x26501311;
pub const SMART_ID: u32 = 0x0b8c0001;
pub const TEAMBOARD_ID: u32 = 0x07dd0001;

pub const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("ebeam.filter", 1),
    ParamSpec::new("ebeam.fiability", 100),
    ParamSpec::new("ebeam.min_dist", 8),
    ParamSpec::new("ebeam.max_dist", 40),
    ParamSpec::new("ebeam.pointers", 1),
    ParamSpec::new("ebeam.calibrate", 1),
    ParamSpec::new("smart.pointers", 6),
    ParamSpec::new("smart.calibrate", 1),
    ParamSpec::new("teamboard.pointers", 1),
    ParamSpec::new("teamboard.calibrate", 1),
    ParamSpec::new("panaboard.pointers", 1),
    ParamSpec::new("panaboard.calibrate", 0),
];

const EBEAM_RANGE: RawRange = RawRange::span(16384);
const SMART_RANGE: RawRange = RawRange::span(4096);
const TEAMBOARD_RANGE: RawRange = RawRange::span(4096);

const SMART_WATCHDOG: u8 = 0xD2;
const SMART_COORDS: u8 = 0xB4;
const SMART_TRAY: u8 = 0xE1;

/// Pen tray status byte and the light pattern confirming it, per pen
const SMART_PEN_LIGHTS: [(u8, u8); 6] = [
    (0x00, 0x2a),
    (0x01, 0x2b),
    (0x02, 0x28),
    (0x04, 0x2e),
    (0x08, 0x22),
    (0x10, 0x3a),
];

/// Reference point and tip state used by the eBeam jump filter
#[derive(Debug, Default, Clone, Copy)]
pub struct EbeamState {
    reference: (i64, i64),
    tip: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SmartState {
    pen_selected: u8,
    right_click: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum BoardState {
    Ebeam(EbeamState),
    Smart(SmartState),
    TeamBoard,
}

impl BoardState {
    pub fn for_id(id: DeviceId) -> Option<Self> {
        match id.0 {
            EBEAM_ID => Some(Self::Ebeam(EbeamState::default())),
            SMART_ID => Some(Self::Smart(SmartState::default())),
            TEAMBOARD_ID => Some(Self::TeamBoard),
            _ => None,
        }
    }
}

pub struct WhiteBoardDecoder {
    board: BoardState,
}

impl WhiteBoardDecoder {
    pub fn new(board: BoardState) -> Self {
        Self { board }
    }
}

/// Reply to the Smart Board watchdog
pub fn smart_watchdog_reply() -> Vec<u8> {
    let mut reply = vec![0u8; SMART_OUTPUT_REPORT_LEN];
    reply[..5].copy_from_slice(&[0x02, 0xE1, 0x00, 0x01, 0xE0]);
    reply
}

/// Light the pen tray slot matching `status`
pub fn smart_lights_command(status: u8, lights: u8) -> Vec<u8> {
    let mut command = vec![0u8; SMART_OUTPUT_REPORT_LEN];
    command[..6].copy_from_slice(&[0x02, SMART_WATCHDOG, 0x07, 0xFF, status, lights]);
    command
}

fn decode_ebeam(state: &mut EbeamState, report: &Report<'_>, ctx: &mut DecodeContext) {
    if report.id() != 0x03 {
        return;
    }

    let fiability = report.byte(5);
    let minimum = ctx.param("ebeam.fiability", 100);
    if !passes_fiability(fiability, minimum) {
        ctx.frame_invalid(DriverError::LowFiability { fiability, minimum });
        return;
    }
    ctx.frame_valid();

    let bytes = report.as_bytes();
    let x = i64::from(le16(bytes, 1));
    let y = i64::from(le16(bytes, 3));

    let status = report.byte(6);
    let tip = !status & 0x01 != 0;
    let mut buttons = ButtonMask::from_bits_truncate(((status & 0x08) >> 2) | (status & 0x04));
    buttons.set(ButtonMask::TIP, tip);

    if tip && !state.tip {
        state.reference = (x, y);
    }
    state.tip = tip;

    let (dx, dy) = (state.reference.0 - x, state.reference.1 - y);
    let dist = ((dx * dx + dy * dy) as f64).sqrt();

    let mut sample = (x, y);
    if dist < f64::from(ctx.param("ebeam.max_dist", 40)) {
        if ctx.param("ebeam.filter", 1) == 1 {
            sample = ((state.reference.0 + x) / 2, (state.reference.1 + y) / 2);
        }
        ctx.pointer(PointerEvent::new(
            0,
            EBEAM_RANGE.normalize(sample.0 as u32),
            EBEAM_RANGE.normalize(sample.1 as u32),
            buttons,
        ));
    } else if ctx.debug_enabled() {
        debug!("eBeam jump of {:.1} units dropped, check battery", dist);
    }

    state.reference = sample;
}

fn decode_smart(state: &mut SmartState, report: &Report<'_>, ctx: &mut DecodeContext) {
    if report.id() != 0x02 {
        debug!("Unknown Smart Board report {}", report.id());
        return;
    }

    match (report.byte(1), report.byte(2)) {
        (SMART_WATCHDOG, 0) => ctx.write(smart_watchdog_reply()),
        (SMART_COORDS, 4) => {
            let tip = report.byte(3) & 0x80 != 0;
            let x = byte_plus_nibble(report.byte(4), report.byte(5), true);
            let y = byte_plus_nibble(report.byte(6), report.byte(5), false);

            let buttons = match (tip, state.right_click) {
                (true, true) => ButtonMask::BARREL,
                (true, false) => ButtonMask::TIP,
                (false, _) => ButtonMask::empty(),
            };
            ctx.pointer(PointerEvent::new(
                state.pen_selected,
                SMART_RANGE.normalize(x),
                SMART_RANGE.normalize(y),
                buttons,
            ));
        }
        (SMART_TRAY, 5) => {
            let status = report.byte(3);
            if let Some(index) = SMART_PEN_LIGHTS.iter().position(|(pen, _)| *pen == status) {
                state.pen_selected = index as u8;
            }
            let lights = SMART_PEN_LIGHTS[usize::from(state.pen_selected)].1;
            info!("Smart Board pen {} selected", state.pen_selected);

            ctx.write(smart_lights_command(status, lights));
            ctx.data(DataPayload::PenSelected(u32::from(state.pen_selected)));
        }
        (SMART_TRAY, 6) => {
            state.right_click = report.byte(3) & 0x02 != 0;
            debug!("Smart Board key {:#04x}", report.byte(3));
        }
        (command, param) => {
            if ctx.debug_enabled() {
                debug!("Unhandled Smart Board command {:#04x}:{:#04x}", command, param);
            }
        }
    }
}

fn decode_teamboard(report: &Report<'_>, ctx: &mut DecodeContext) {
    let bytes = report.as_bytes();
    if bytes.len() < 5 {
        warn!("Short Team Board report ({} bytes)", bytes.len());
        return;
    }
    ctx.pointer(PointerEvent::new(
        0,
        TEAMBOARD_RANGE.normalize(le16(bytes, 1)),
        TEAMBOARD_RANGE.normalize(le16(bytes, 3)),
        ButtonMask::from_bits_truncate(report.byte(0)),
    ));
}

impl ProtocolDecoder for WhiteBoardDecoder {
    fn read_len(&self) -> usize {
        REPORT_LEN
    }

    fn decode(&mut self, input: &[u8], ctx: &mut DecodeContext) {
        let Some(report) = Report::new(input) else {
            return;
        };
        dump(ctx, "whiteboard report", input);

        match &mut self.board {
            BoardState::Ebeam(state) => decode_ebeam(state, &report, ctx),
            BoardState::Smart(state) => decode_smart(state, &report, ctx),
            BoardState::TeamBoard => decode_teamboard(&report, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use shared::EventKind;

    fn ebeam_report(x: u16, y: u16, fiability: u8, status: u8) -> Vec<u8> {
        let mut report = vec![0x03, 0, 0, 0, 0, fiability, status, 0];
        report[1..3].copy_from_slice(&x.to_le_bytes());
        report[3..5].copy_from_slice(&y.to_le_bytes());
        report
    }

    fn ebeam() -> WhiteBoardDecoder {
        WhiteBoardDecoder::new(BoardState::for_id(DeviceId(EBEAM_ID)).unwrap())
    }

    fn smart() -> WhiteBoardDecoder {
        WhiteBoardDecoder::new(BoardState::for_id(DeviceId(SMART_ID)).unwrap())
    }

    #[test]
    fn test_ebeam_press_resets_reference() {
        let mut decoder = ebeam();
        let mut ctx = context(PARAMETERS);

        // Tip bit is active low
        decoder.decode(&ebeam_report(8192, 4096, 200, 0x00), &mut ctx);
        let events = ctx.take_events();
        let pointer = pointers(&events)[0];
        assert_eq!((pointer.x, pointer.y), (0.5, 0.25));
        assert_eq!(pointer.buttons, ButtonMask::TIP);
    }

    #[test]
    fn test_ebeam_filter_averages_samples() {
        let mut decoder = ebeam();
        let mut ctx = context(PARAMETERS);
        decoder.decode(&ebeam_report(8192, 8192, 200, 0x00), &mut ctx);
        decoder.decode(&ebeam_report(8212, 8192, 200, 0x00), &mut ctx);

        let events = ctx.take_events();
        let second = pointers(&events)[1];
        assert_eq!(second.x, 8202.0 / 16384.0);
    }

    #[test]
    fn test_ebeam_drops_jumps() {
        let mut decoder = ebeam();
        let mut ctx = context(PARAMETERS);
        decoder.decode(&ebeam_report(1000, 1000, 200, 0x00), &mut ctx);
        decoder.decode(&ebeam_report(1100, 1000, 200, 0x00), &mut ctx);
        assert_eq!(pointers(&ctx.take_events()).len(), 1);

        // Reference moved to the dropped sample, so tracking resumes from there
        decoder.decode(&ebeam_report(1110, 1000, 200, 0x00), &mut ctx);
        let events = ctx.take_events();
        assert_eq!(pointers(&events)[0].x, 1105.0 / 16384.0);
    }

    #[test]
    fn test_ebeam_fiability_gate() {
        let mut decoder = ebeam();
        let mut ctx = context(PARAMETERS);
        decoder.decode(&ebeam_report(1000, 1000, 100, 0x00), &mut ctx);
        decoder.decode(&ebeam_report(1000, 1000, 50, 0x00), &mut ctx);

        let events = ctx.take_events();
        assert!(pointers(&events).is_empty());
        assert_eq!(comm_errors(&events), 1);
    }

    #[test]
    fn test_ebeam_hover_buttons() {
        let mut decoder = ebeam();
        let mut ctx = context(PARAMETERS);
        ctx.params().set("ebeam.filter", 0);
        decoder.decode(&ebeam_report(1000, 1000, 200, 0x00), &mut ctx);
        decoder.decode(&ebeam_report(1000, 1000, 200, 0x0D), &mut ctx);
        let events = ctx.take_events();
        let pointers = pointers(&events);
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[1].buttons, ButtonMask::BARREL | ButtonMask::INVERT);
    }

    #[test]
    fn test_smart_watchdog_reply() {
        let mut decoder = smart();
        let mut ctx = context(PARAMETERS);
        decoder.decode(&[0x02, 0xD2, 0x00], &mut ctx);

        let writes = ctx.take_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), 17);
        assert_eq!(&writes[0][..5], &[0x02, 0xE1, 0x00, 0x01, 0xE0]);
        assert!(ctx.take_events().is_empty());
    }

    #[test]
    fn test_smart_pen_selection_and_coordinates() {
        let mut decoder = smart();
        let mut ctx = context(PARAMETERS);

        decoder.decode(&[0x02, 0xE1, 0x05, 0x04], &mut ctx);
        assert_eq!(ctx.take_writes(), vec![smart_lights_command(0x04, 0x2e)]);
        assert_eq!(
            ctx.take_events(),
            vec![EventKind::Data(DataPayload::PenSelected(3))]
        );

        // x = 0x800, y = 0x400
        decoder.decode(&[0x02, 0xB4, 0x04, 0x80, 0x00, 0x84, 0x00], &mut ctx);
        let pointer = pointers(&ctx.take_events())[0];
        assert_eq!(pointer.pointer, 3);
        assert_eq!((pointer.x, pointer.y), (0.5, 0.25));
        assert_eq!(pointer.buttons, ButtonMask::TIP);
    }

    #[test]
    fn test_smart_right_click_latch() {
        let mut decoder = smart();
        let mut ctx = context(PARAMETERS);
        decoder.decode(&[0x02, 0xE1, 0x06, 0x02], &mut ctx);
        decoder.decode(&[0x02, 0xB4, 0x04, 0x80, 0x10, 0x00, 0x10], &mut ctx);
        assert_eq!(pointers(&ctx.take_events())[0].buttons, ButtonMask::BARREL);

        decoder.decode(&[0x02, 0xE1, 0x06, 0x00], &mut ctx);
        decoder.decode(&[0x02, 0xB4, 0x04, 0x00, 0x10, 0x00, 0x10], &mut ctx);
        assert!(pointers(&ctx.take_events())[0].buttons.is_empty());
    }

    #[test]
    fn test_teamboard() {
        let mut decoder = WhiteBoardDecoder::new(BoardState::TeamBoard);
        let mut ctx = context(PARAMETERS);
        decoder.decode(&[0x01, 0x00, 0x08, 0x00, 0x10], &mut ctx);

        let pointer = pointers(&ctx.take_events())[0];
        assert_eq!((pointer.x, pointer.y), (0.5, 1.0));
        assert_eq!(pointer.buttons, ButtonMask::TIP);
    }
}
