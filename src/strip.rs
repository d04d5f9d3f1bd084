//! Per-channel strip state machines.
//!
//! A [`Strip`] mirrors one mixer source onto one channel lane of the
//! surface. Operations with cross-strip effects (selection exclusivity,
//! reassignment eviction, the shared color payload) live on the [`Strips`]
//! collection and take the acting strip's index.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    mixer::{MixerClient, MonitorType, SourceId},
    registry::{SourceEntry, SourceRegistry},
    surface::{self, ButtonRole, Direction, SurfaceSink, STRIP_COUNT},
};

/// Quiet period after a local fader move during which the mixer's own
/// position echoes are discarded.
pub const FADER_ECHO_QUIET: Duration = Duration::from_millis(300);

// LED-ring base offset per encoder mode; each mode maps the same balance
// value onto a different contiguous sub-range of the ring.
const RING_MODE_BASE: [u8; 4] = [1, 17, 65, 81];

const BALANCE_MAX: u8 = 10;

const COLOR_NAMES: [&str; 8] = [
    "RED", "GREEN", "YELLOW", "BLUE", "MAGENTA", "CYAN", "WHITE", "BLACK",
];
const COLOR_MIN: u8 = 1;
const COLOR_MAX: u8 = 8;
const DEFAULT_COLOR: u8 = 7; // WHITE

const DEFAULT_ENCODER_MODE: usize = 3;

fn color_name(color: u8) -> &'static str {
    color
        .checked_sub(1)
        .and_then(|idx| COLOR_NAMES.get(idx as usize))
        .copied()
        .unwrap_or_default()
}

/// Cube-law fader taper: perceived gain is roughly logarithmic, and a cubic
/// curve approximates a standard audio fader while staying closed-form in
/// both directions.
pub fn position_to_gain(position: u8) -> f64 {
    (f64::from(position) / 127.0).powi(3)
}

pub fn gain_to_position(mul: f64) -> u8 {
    (mul.clamp(0.0, 1.0).cbrt() * 127.0).round() as u8
}

fn balance_steps(balance: f64) -> u8 {
    (balance.clamp(0.0, 1.0) * 10.0).round() as u8
}

/// Collaborators a handler may reach while processing one event.
pub struct Context<'a> {
    pub sink: &'a mut dyn SurfaceSink,
    pub mixer: &'a dyn MixerClient,
    pub registry: &'a mut SourceRegistry,
}

#[derive(Clone, Debug)]
pub struct Assignment {
    pub name: Arc<str>,
    pub id: SourceId,
    /// Registry slot the source occupied when it was committed.
    pub slot: usize,
}

#[derive(Debug)]
pub struct Strip {
    channel: u8,
    assignment: Option<Assignment>,

    record: bool,
    solo: bool,
    mute: bool,
    balance: u8,
    fader_position: u8,

    color: u8,
    encoder_mode: usize,
    source_cursor: usize,
    color_cursor: u8,

    selected: bool,
    browsing_colors: bool,

    fader_pending: Option<Instant>,
}

impl Strip {
    fn new(channel: u8) -> Self {
        Self {
            channel,
            assignment: None,
            record: false,
            solo: false,
            mute: false,
            balance: 0,
            fader_position: 0,
            color: DEFAULT_COLOR,
            encoder_mode: DEFAULT_ENCODER_MODE,
            source_cursor: 0,
            color_cursor: DEFAULT_COLOR,
            selected: false,
            browsing_colors: false,
            fader_pending: None,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    fn reset_state(&mut self) {
        *self = Self::new(self.channel);
    }

    fn restore_state(&mut self) {
        self.source_cursor = self.assignment.as_ref().map_or(0, |a| a.slot);
        self.color_cursor = self.color;
        self.selected = false;
    }

    fn ring_value(&self) -> u8 {
        match self.assignment {
            Some(_) => RING_MODE_BASE[self.encoder_mode] + self.balance,
            None => 0,
        }
    }

    fn draw_text(&self, line: u8, text: &str, sink: &mut dyn SurfaceSink) {
        match surface::lcd_text(self.channel, line, text) {
            Ok(list) => sink.send_list(list),
            Err(err) => log::error!("{err}"),
        }
    }

    fn draw_overlay(&self, registry: &SourceRegistry, sink: &mut dyn SurfaceSink) {
        let (title, value) = if self.browsing_colors {
            ("COLOR", color_name(self.color_cursor))
        } else {
            (
                "SOURCE",
                registry
                    .get(self.source_cursor)
                    .map(SourceEntry::label)
                    .unwrap_or_default(),
            )
        };

        self.draw_text(0, title, sink);
        self.draw_text(1, value, sink);
    }

    /// Re-applies the strip's whole committed state to the surface.
    fn paint(&self, colors: [u8; STRIP_COUNT], sink: &mut dyn SurfaceSink) {
        use ButtonRole::*;

        let name = self
            .assignment
            .as_ref()
            .map(|a| a.name.as_ref())
            .unwrap_or_default();
        self.draw_text(0, name, sink);
        self.draw_text(1, "", sink);

        sink.send(surface::lcd_colors(colors));
        sink.send(surface::button_light(self.channel, Record, self.record));
        sink.send(surface::button_light(self.channel, Solo, self.solo));
        sink.send(surface::button_light(self.channel, Mute, self.mute));
        sink.send(surface::button_light(self.channel, Select, self.selected));
        sink.send(surface::encoder_ring(self.channel, self.ring_value()));
        sink.send(surface::fader_position(self.channel, self.fader_position));
    }
}

/// Button, encoder and fader input.
impl Strip {
    fn toggle_record(&mut self, cx: &mut Context) {
        if self.selected {
            return;
        }
        let Some(Assignment { name, id, .. }) = self.assignment.clone() else {
            return;
        };

        self.record = !self.record;
        cx.sink
            .send(surface::button_light(self.channel, ButtonRole::Record, self.record));

        if let Err(err) = cx.mixer.set_record_track(&id, self.record) {
            log::error!("Record toggle for {name} not applied: {err}");
        }
    }

    fn toggle_solo(&mut self, cx: &mut Context) {
        if self.selected {
            return;
        }
        let Some(Assignment { name, id, .. }) = self.assignment.clone() else {
            return;
        };

        self.solo = !self.solo;
        cx.sink
            .send(surface::button_light(self.channel, ButtonRole::Solo, self.solo));

        let monitor = if self.solo {
            MonitorType::MonitorAndOutput
        } else {
            MonitorType::None
        };
        if let Err(err) = cx.mixer.set_monitor_type(&id, monitor) {
            log::error!("Solo toggle for {name} not applied: {err}");
        }
    }

    fn toggle_mute(&mut self, cx: &mut Context) {
        if self.selected {
            return;
        }
        let Some(Assignment { name, id, .. }) = self.assignment.clone() else {
            return;
        };

        self.mute = !self.mute;
        cx.sink
            .send(surface::button_light(self.channel, ButtonRole::Mute, self.mute));

        if let Err(err) = cx.mixer.set_muted(&id, self.mute) {
            log::error!("Mute toggle for {name} not applied: {err}");
        }
    }

    fn fader_moved(&mut self, position: u8, cx: &mut Context) {
        if self.selected {
            return;
        }
        let Some(Assignment { id, .. }) = self.assignment.clone() else {
            return;
        };

        self.fader_position = position;
        self.fader_pending = Some(Instant::now());

        // Fire and forget: the motor already sits under the user's hand, and
        // awaiting every intermediate drag value would stall the loop.
        cx.mixer.submit_volume(&id, position_to_gain(position));
    }
}

/// Mixer state echoes.
impl Strip {
    fn volume_echo(&mut self, mul: f64, sink: &mut dyn SurfaceSink) {
        if self.selected || self.fader_pending.is_some() {
            return;
        }

        self.fader_position = gain_to_position(mul);
        sink.send(surface::fader_position(self.channel, self.fader_position));
    }

    fn mute_echo(&mut self, muted: bool, sink: &mut dyn SurfaceSink) {
        if self.selected {
            return;
        }

        self.mute = muted;
        sink.send(surface::button_light(self.channel, ButtonRole::Mute, muted));
    }

    fn record_echo(&mut self, enabled: bool, sink: &mut dyn SurfaceSink) {
        if self.selected {
            return;
        }

        self.record = enabled;
        sink.send(surface::button_light(self.channel, ButtonRole::Record, enabled));
    }

    fn balance_echo(&mut self, balance: f64, sink: &mut dyn SurfaceSink) {
        if self.selected {
            return;
        }

        self.balance = balance_steps(balance);
        sink.send(surface::encoder_ring(self.channel, self.ring_value()));
    }

    fn monitor_echo(&mut self, monitor: MonitorType, sink: &mut dyn SurfaceSink) {
        if self.selected {
            return;
        }

        self.solo = monitor.is_monitoring();
        sink.send(surface::button_light(self.channel, ButtonRole::Solo, self.solo));
    }

    fn meter(&self, levels: &[f64], sink: &mut dyn SurfaceSink) {
        if self.selected || levels.is_empty() {
            return;
        }

        let average = levels.iter().sum::<f64>() / levels.len() as f64;
        if average <= 0.0 {
            return;
        }

        let db = 20.0 * average.log10();
        let db = if db < -60.0 {
            -60.0
        } else if db > -4.0 {
            // Close enough to clipping to pin the meter.
            0.0
        } else {
            db
        };

        let segment = ((db + 60.0) * f64::from(surface::meter::MAX_SEGMENT) / 60.0).round() as u8;
        sink.send(surface::meter_level(self.channel, segment));
    }
}

pub struct Strips([Strip; STRIP_COUNT]);

impl Default for Strips {
    fn default() -> Self {
        Self(std::array::from_fn(|channel| Strip::new(channel as u8)))
    }
}

impl std::ops::Index<usize> for Strips {
    type Output = Strip;

    fn index(&self, idx: usize) -> &Strip {
        &self.0[idx]
    }
}

impl Strips {
    pub fn find_assigned(&self, id: &SourceId) -> Option<usize> {
        self.0
            .iter()
            .position(|strip| strip.assignment.as_ref().map(|a| &a.id) == Some(id))
    }

    fn find_assigned_except(&self, id: &SourceId, except: usize) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .find(|(idx, strip)| {
                *idx != except && strip.assignment.as_ref().map(|a| &a.id) == Some(id)
            })
            .map(|(idx, _)| idx)
    }

    fn colors(&self) -> [u8; STRIP_COUNT] {
        std::array::from_fn(|idx| self.0[idx].color)
    }

    pub fn reset_all(&mut self, sink: &mut dyn SurfaceSink) {
        for idx in 0..STRIP_COUNT {
            self.reset_strip(idx, sink);
        }
    }

    fn reset_strip(&mut self, idx: usize, sink: &mut dyn SurfaceSink) {
        self.0[idx].reset_state();
        self.0[idx].paint(self.colors(), sink);
    }

    fn restore_strip(&mut self, idx: usize, sink: &mut dyn SurfaceSink) {
        self.0[idx].restore_state();
        self.0[idx].paint(self.colors(), sink);
    }
}

/// Surface input, routed by channel.
impl Strips {
    pub fn button(&mut self, idx: usize, role: ButtonRole, cx: &mut Context) {
        match role {
            ButtonRole::Record => self.0[idx].toggle_record(cx),
            ButtonRole::Solo => self.0[idx].toggle_solo(cx),
            ButtonRole::Mute => self.0[idx].toggle_mute(cx),
            ButtonRole::Select => self.toggle_select(idx, cx),
            ButtonRole::EncoderPush => self.encoder_push(idx, cx),
        }
    }

    fn toggle_select(&mut self, idx: usize, cx: &mut Context) {
        let entering = !self.0[idx].selected;

        if entering {
            // Selection is exclusive: force every other strip back to its
            // committed state before this one takes the overlay.
            for other in 0..STRIP_COUNT {
                if other != idx {
                    self.restore_strip(other, cx.sink);
                }
            }
        }

        let strip = &mut self.0[idx];
        strip.selected = entering;
        cx.sink
            .send(surface::button_light(strip.channel, ButtonRole::Select, entering));

        if entering {
            self.enter_selection(idx, cx);
        } else {
            self.commit_selection(idx, cx);
        }
    }

    fn enter_selection(&mut self, idx: usize, cx: &mut Context) {
        use ButtonRole::*;

        let channel = self.0[idx].channel;
        cx.sink.send(surface::encoder_ring(channel, 0));
        cx.sink.send(surface::button_light(channel, Record, false));
        cx.sink.send(surface::button_light(channel, Solo, false));
        cx.sink.send(surface::button_light(channel, Mute, false));

        if let Err(err) = cx.registry.refresh(cx.mixer) {
            log::error!("Source list refresh failed: {err}");
        }

        let strip = &mut self.0[idx];
        let slot = strip.assignment.as_ref().map_or(0, |a| a.slot);
        // A slot that vanished with the rebuild seeds the cursor on CANCEL.
        strip.source_cursor = if slot < cx.registry.len() { slot } else { 0 };
        strip.color_cursor = strip.color;
        strip.draw_overlay(cx.registry, cx.sink);
    }

    fn commit_selection(&mut self, idx: usize, cx: &mut Context) {
        if self.0[idx].browsing_colors {
            self.0[idx].color = self.0[idx].color_cursor;
            self.restore_strip(idx, cx.sink);
            return;
        }

        match cx.registry.get(self.0[idx].source_cursor).cloned() {
            None | Some(SourceEntry::Cancel) => self.restore_strip(idx, cx.sink),
            Some(SourceEntry::Reset) => self.reset_strip(idx, cx.sink),
            Some(SourceEntry::Assignable { name, id }) => self.assign(idx, name, id, cx),
        }
    }

    fn assign(&mut self, idx: usize, name: Arc<str>, id: SourceId, cx: &mut Context) {
        let changed = self.0[idx]
            .assignment
            .as_ref()
            .map_or(true, |a| a.id != id);

        if changed {
            // A reassigned source keeps the look it had on its previous strip.
            if let Some(holder) = self.find_assigned_except(&id, idx) {
                let (color, encoder_mode) = (self.0[holder].color, self.0[holder].encoder_mode);
                let strip = &mut self.0[idx];
                strip.color = color;
                strip.color_cursor = color;
                strip.encoder_mode = encoder_mode;
            }

            match cx.mixer.source_state(&id) {
                Ok(state) => {
                    let strip = &mut self.0[idx];
                    strip.solo = state.monitor == MonitorType::MonitorAndOutput;
                    strip.mute = state.muted;
                    strip.record = state.record;
                    strip.balance = balance_steps(state.balance);
                    strip.fader_position = gain_to_position(state.volume);
                    strip.assignment = Some(Assignment {
                        name,
                        id: id.clone(),
                        slot: strip.source_cursor,
                    });
                }
                Err(err) => {
                    log::error!("Couldn't read mixer state of {name}: {err}");
                    self.restore_strip(idx, cx.sink);
                    return;
                }
            }
        }

        self.restore_strip(idx, cx.sink);

        // A source may be bound to at most one strip at a time.
        if let Some(holder) = self.find_assigned_except(&id, idx) {
            self.reset_strip(holder, cx.sink);
        }
    }

    fn encoder_push(&mut self, idx: usize, cx: &mut Context) {
        let strip = &mut self.0[idx];

        if strip.selected {
            strip.browsing_colors = !strip.browsing_colors;
            strip.draw_overlay(cx.registry, cx.sink);
        } else if strip.assignment.is_some() {
            strip.encoder_mode = (strip.encoder_mode + 1) % RING_MODE_BASE.len();
            cx.sink
                .send(surface::encoder_ring(strip.channel, strip.ring_value()));
        }
    }

    pub fn encoder_turn(&mut self, idx: usize, direction: Direction, cx: &mut Context) {
        use Direction::*;

        let strip = &mut self.0[idx];

        if strip.selected {
            if strip.browsing_colors {
                strip.color_cursor = match direction {
                    Clockwise if strip.color_cursor >= COLOR_MAX => COLOR_MIN,
                    Clockwise => strip.color_cursor + 1,
                    CounterClockwise if strip.color_cursor <= COLOR_MIN => COLOR_MAX,
                    CounterClockwise => strip.color_cursor - 1,
                };
                strip.draw_overlay(cx.registry, cx.sink);

                // Live preview: recolor this strip's cell right away, the
                // committed value only lands on select release.
                let mut colors = self.colors();
                colors[idx] = self.0[idx].color_cursor;
                cx.sink.send(surface::lcd_colors(colors));
            } else {
                strip.source_cursor = match direction {
                    Clockwise => (strip.source_cursor + 1).min(cx.registry.len() - 1),
                    CounterClockwise => strip.source_cursor.saturating_sub(1),
                };
                strip.draw_overlay(cx.registry, cx.sink);
            }

            return;
        }

        let Some(Assignment { name, id, .. }) = strip.assignment.clone() else {
            return;
        };

        strip.balance = match direction {
            Clockwise => (strip.balance + 1).min(BALANCE_MAX),
            CounterClockwise => strip.balance.saturating_sub(1),
        };

        if let Err(err) = cx
            .mixer
            .set_balance(&id, f64::from(strip.balance) / 10.0)
        {
            log::error!("Balance change for {name} not applied: {err}");
        }
    }

    pub fn fader_moved(&mut self, idx: usize, position: u8, cx: &mut Context) {
        self.0[idx].fader_moved(position, cx);
    }
}

/// Mixer echoes, routed by source id.
impl Strips {
    pub fn volume_echo(&mut self, idx: usize, mul: f64, sink: &mut dyn SurfaceSink) {
        self.0[idx].volume_echo(mul, sink);
    }

    pub fn mute_echo(&mut self, idx: usize, muted: bool, sink: &mut dyn SurfaceSink) {
        self.0[idx].mute_echo(muted, sink);
    }

    pub fn record_echo(&mut self, idx: usize, enabled: bool, sink: &mut dyn SurfaceSink) {
        self.0[idx].record_echo(enabled, sink);
    }

    pub fn balance_echo(&mut self, idx: usize, balance: f64, sink: &mut dyn SurfaceSink) {
        self.0[idx].balance_echo(balance, sink);
    }

    pub fn monitor_echo(&mut self, idx: usize, monitor: MonitorType, sink: &mut dyn SurfaceSink) {
        self.0[idx].monitor_echo(monitor, sink);
    }

    pub fn meter(&self, idx: usize, levels: &[f64], sink: &mut dyn SurfaceSink) {
        self.0[idx].meter(levels, sink);
    }

    /// Re-asserts the motor fader of any strip whose local-move quiet period
    /// has expired, releasing the echo suppression.
    pub fn release_faders(&mut self, now: Instant, sink: &mut dyn SurfaceSink) {
        for strip in &mut self.0 {
            let expired = strip
                .fader_pending
                .map_or(false, |since| now.duration_since(since) >= FADER_ECHO_QUIET);

            if expired {
                strip.fader_pending = None;
                sink.send(surface::fader_position(strip.channel, strip.fader_position));
            }
        }
    }
}
