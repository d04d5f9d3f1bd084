//! Codec for the surface's fixed-format control messages.
//!
//! Inbound messages decode to [`SurfaceEvent`]s; outbound commands are built
//! as raw [`midi::Msg`]s. The strip layout is fixed: 8 channels, each with
//! record/solo/mute/select buttons, a push-encoder with an LED ring, a
//! motorized fader and a two-line 7-character display cell.

pub mod event;
pub use event::{ButtonRole, Direction, SurfaceEvent};

use crate::midi::{self, Msg, MsgList};

pub const STRIP_COUNT: usize = 8;

pub mod button {
    use crate::midi::Tag;
    pub const TAG: Tag = Tag::from(0x90);

    pub const PRESSED: u8 = 127;
    pub const ON: u8 = PRESSED;
    pub const OFF: u8 = 0;

    pub const RECORD_BASE: u8 = 0;
    pub const SOLO_BASE: u8 = 8;
    pub const MUTE_BASE: u8 = 16;
    pub const SELECT_BASE: u8 = 24;
    pub const ENCODER_BASE: u8 = 32;
    pub const FADER_TOUCH_BASE: u8 = 104;
}

pub mod encoder {
    use crate::midi::Tag;
    pub const TAG: Tag = Tag::from(0xb0);

    pub const TURN_FIRST_CTRL: u8 = 16;
    pub const RING_FIRST_CTRL: u8 = 48;

    // Turn values below the threshold are clockwise ticks, above it
    // counter-clockwise; the threshold itself never occurs.
    pub const DIRECTION_THRSD: u8 = 64;
}

pub mod fader {
    use crate::midi::Tag;
    pub const TAG: Tag = Tag::from(0xe0);
}

pub mod meter {
    use crate::midi::Tag;
    pub const TAG: Tag = Tag::from(0xd0);

    pub const SLOTS_PER_STRIP: u8 = 16;
    pub const MAX_SEGMENT: u8 = 14;
}

pub mod lcd {
    pub const TEXT_HEADER: [u8; 5] = [0x00, 0x00, 0x66, 0x15, 0x12];
    pub const COLOR_HEADER: [u8; 5] = [0x00, 0x00, 0x66, 0x15, 0x72];

    pub const CELL_WIDTH: usize = 7;
    pub const LINE_STRIDE: u8 = 56;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("LCD line out of range: {}", .0)]
    InvalidLcdLine(u8),
}

/// Outbound side of the surface transport.
pub trait SurfaceSink {
    fn send(&mut self, msg: Msg);

    fn send_list(&mut self, list: MsgList) {
        for msg in list {
            self.send(msg);
        }
    }
}

pub fn decode(msg: &Msg) -> Option<SurfaceEvent> {
    let buf = msg.inner();
    let &tag_chan = buf.first()?;

    match midi::Tag::from(tag_chan) {
        button::TAG => {
            if let &[id, value] = buf.get(1..=2)? {
                return decode_button(id, value);
            }

            None
        }
        encoder::TAG => {
            if let &[ctrl, value] = buf.get(1..=2)? {
                use encoder::*;

                if (TURN_FIRST_CTRL..TURN_FIRST_CTRL + STRIP_COUNT as u8).contains(&ctrl) {
                    let direction = match value {
                        v if v < DIRECTION_THRSD => Direction::Clockwise,
                        v if v > DIRECTION_THRSD => Direction::CounterClockwise,
                        _ => return None,
                    };

                    return Some(SurfaceEvent::EncoderTurn {
                        channel: ctrl - TURN_FIRST_CTRL,
                        direction,
                    });
                }
            }

            None
        }
        fader::TAG => {
            let &position = buf.get(2)?;

            Some(SurfaceEvent::Fader {
                channel: midi::Channel::from(tag_chan).into(),
                position,
            })
        }
        _ => None,
    }
}

fn decode_button(id: u8, value: u8) -> Option<SurfaceEvent> {
    use button::*;

    let role = match id {
        RECORD_BASE..=7 => ButtonRole::Record,
        SOLO_BASE..=15 => ButtonRole::Solo,
        MUTE_BASE..=23 => ButtonRole::Mute,
        SELECT_BASE..=31 => ButtonRole::Select,
        ENCODER_BASE..=39 => ButtonRole::EncoderPush,
        FADER_TOUCH_BASE..=111 => {
            log::trace!("Fader touch on channel {}", id - FADER_TOUCH_BASE);
            return None;
        }
        _ => return None,
    };

    Some(SurfaceEvent::Button {
        channel: id % STRIP_COUNT as u8,
        role,
        pressed: value == PRESSED,
    })
}

impl ButtonRole {
    fn base(self) -> u8 {
        use button::*;

        match self {
            ButtonRole::Record => RECORD_BASE,
            ButtonRole::Solo => SOLO_BASE,
            ButtonRole::Mute => MUTE_BASE,
            ButtonRole::Select => SELECT_BASE,
            ButtonRole::EncoderPush => ENCODER_BASE,
        }
    }
}

pub fn button_light(channel: u8, role: ButtonRole, on: bool) -> Msg {
    use button::{OFF, ON};

    let value = if on { ON } else { OFF };

    [button::TAG.into(), role.base() + channel, value].into()
}

pub fn encoder_ring(channel: u8, value: u8) -> Msg {
    [
        encoder::TAG.into(),
        encoder::RING_FIRST_CTRL + channel,
        value,
    ]
    .into()
}

pub fn fader_position(channel: u8, position: u8) -> Msg {
    [fader::TAG | midi::Channel::from(channel), 1, position].into()
}

/// Transient meter command: the surface decays the segment on its own,
/// nothing needs to be cleared afterwards.
pub fn meter_level(channel: u8, segment: u8) -> Msg {
    [
        meter::TAG.into(),
        channel * meter::SLOTS_PER_STRIP + segment.min(meter::MAX_SEGMENT),
        0,
    ]
    .into()
}

/// Clear-then-write of one strip's 7-character display cell.
pub fn lcd_text(channel: u8, line: u8, text: &str) -> Result<MsgList, Error> {
    use lcd::*;

    if line > 1 {
        return Err(Error::InvalidLcdLine(line));
    }

    let offset = CELL_WIDTH as u8 * channel + LINE_STRIDE * line;

    let mut clear = Vec::with_capacity(TEXT_HEADER.len() + 1 + CELL_WIDTH);
    clear.extend(TEXT_HEADER);
    clear.push(offset);
    clear.extend([0u8; CELL_WIDTH]);

    let mut write = Vec::with_capacity(TEXT_HEADER.len() + 1 + CELL_WIDTH);
    write.extend(TEXT_HEADER);
    write.push(offset);
    write.extend(
        text.chars()
            .take(CELL_WIDTH)
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' }),
    );

    let mut list = MsgList::new();
    list.push(Msg::new_sysex(&clear));
    list.push(Msg::new_sysex(&write));

    Ok(list)
}

/// The display colors travel as one combined payload: all 8 strips' color
/// indices in every update.
pub fn lcd_colors(colors: [u8; STRIP_COUNT]) -> Msg {
    let mut payload = Vec::with_capacity(lcd::COLOR_HEADER.len() + STRIP_COUNT);
    payload.extend(lcd::COLOR_HEADER);
    payload.extend(colors);

    Msg::new_sysex(&payload)
}
