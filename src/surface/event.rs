#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonRole {
    Record,
    Solo,
    Mute,
    Select,
    EncoderPush,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// A decoded message from the surface, addressed to one strip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceEvent {
    Button {
        channel: u8,
        role: ButtonRole,
        pressed: bool,
    },
    EncoderTurn {
        channel: u8,
        direction: Direction,
    },
    Fader {
        channel: u8,
        position: u8,
    },
}
