//! Routes decoded surface input and mixer notifications to the owning strip.
//!
//! Hardware events address strips by channel, mixer events by the source id
//! of the strip's current assignment. Events with no owning strip are
//! silently dropped.

use crate::{
    midi,
    mixer::{MixerEvent, SourceId},
    strip::{Context, Strips},
    surface::{self, SurfaceEvent, STRIP_COUNT},
};

pub fn surface_msg(strips: &mut Strips, msg: &midi::Msg, cx: &mut Context) {
    let Some(event) = surface::decode(msg) else {
        log::trace!("Dropped surface msg {}", msg.display());
        return;
    };

    surface_event(strips, event, cx);
}

pub fn surface_event(strips: &mut Strips, event: SurfaceEvent, cx: &mut Context) {
    use SurfaceEvent::*;

    match event {
        Button {
            channel,
            role,
            pressed,
        } => {
            // Only the press edge acts; releases are ignored.
            if pressed {
                if let Some(idx) = strip_index(channel) {
                    strips.button(idx, role, cx);
                }
            }
        }
        EncoderTurn { channel, direction } => {
            if let Some(idx) = strip_index(channel) {
                strips.encoder_turn(idx, direction, cx);
            }
        }
        Fader { channel, position } => {
            if let Some(idx) = strip_index(channel) {
                strips.fader_moved(idx, position, cx);
            }
        }
    }
}

pub fn mixer_event(strips: &mut Strips, event: MixerEvent, cx: &mut Context) {
    use MixerEvent::*;

    match event {
        Volume { source, mul } => {
            if let Some(idx) = target(strips, &source) {
                strips.volume_echo(idx, mul, cx.sink);
            }
        }
        Mute { source, muted } => {
            if let Some(idx) = target(strips, &source) {
                strips.mute_echo(idx, muted, cx.sink);
            }
        }
        Balance { source, balance } => {
            if let Some(idx) = target(strips, &source) {
                strips.balance_echo(idx, balance, cx.sink);
            }
        }
        RecordTrack { source, enabled } => {
            if let Some(idx) = target(strips, &source) {
                strips.record_echo(idx, enabled, cx.sink);
            }
        }
        Monitor { source, monitor } => {
            if let Some(idx) = target(strips, &source) {
                strips.monitor_echo(idx, monitor, cx.sink);
            }
        }
        Meters(readings) => {
            for reading in readings {
                if let Some(idx) = strips.find_assigned(&reading.source) {
                    strips.meter(idx, &reading.levels, cx.sink);
                }
            }
        }
    }
}

fn strip_index(channel: u8) -> Option<usize> {
    let idx = usize::from(channel);
    if idx >= STRIP_COUNT {
        log::trace!("Dropped event for channel {channel}");
        return None;
    }

    Some(idx)
}

fn target(strips: &Strips, source: &SourceId) -> Option<usize> {
    let idx = strips.find_assigned(source);
    if idx.is_none() {
        log::trace!("Dropped mixer event for unassigned source {source}");
    }

    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::testing::FakeMixer;
    use crate::registry::SourceRegistry;
    use crate::surface::{ButtonRole, SurfaceSink};

    #[derive(Default)]
    struct NullSink(usize);

    impl SurfaceSink for NullSink {
        fn send(&mut self, _msg: midi::Msg) {
            self.0 += 1;
        }
    }

    #[test]
    fn unmatched_events_are_dropped() {
        let mixer = FakeMixer::default();
        let mut registry = SourceRegistry::default();
        let mut sink = NullSink::default();
        let mut strips = Strips::default();

        let mut cx = Context {
            sink: &mut sink,
            mixer: &mixer,
            registry: &mut registry,
        };

        // Undecodable message.
        surface_msg(&mut strips, &midi::Msg::from([0xa0, 0, 0]), &mut cx);

        // Mixer event for a source no strip is bound to.
        mixer_event(
            &mut strips,
            MixerEvent::Volume {
                source: SourceId::from("uuid-ghost"),
                mul: 0.5,
            },
            &mut cx,
        );

        assert_eq!(sink.0, 0);
    }

    #[test]
    fn release_edges_do_not_act() {
        let mixer = FakeMixer::default();
        let mut registry = SourceRegistry::default();
        let mut sink = NullSink::default();
        let mut strips = Strips::default();

        surface_event(
            &mut strips,
            SurfaceEvent::Button {
                channel: 0,
                role: ButtonRole::Select,
                pressed: false,
            },
            &mut Context {
                sink: &mut sink,
                mixer: &mixer,
                registry: &mut registry,
            },
        );

        assert!(!strips[0].is_selected());
    }

    #[test]
    fn button_press_routes_to_the_owning_strip() {
        let mixer = FakeMixer::default();
        let mut registry = SourceRegistry::default();
        let mut sink = NullSink::default();
        let mut strips = Strips::default();

        // Select press on channel 3: note-on, id 24 + 3.
        surface_msg(
            &mut strips,
            &midi::Msg::from([0x90, 27, 127]),
            &mut Context {
                sink: &mut sink,
                mixer: &mixer,
                registry: &mut registry,
            },
        );

        assert!(strips[3].is_selected());
    }
}
