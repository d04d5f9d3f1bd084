//! The process driving everything: one control thread multiplexing surface
//! input, mixer events and the fader-release tick.
//!
//! Strips and the source registry are only ever touched from this thread;
//! the MIDI callback and the mixer socket thread just forward into channels.

use anyhow::Context as _;
use crossbeam_channel as channel;
use std::time::{Duration, Instant};

use crate::{
    config::Config,
    midi,
    mixer::{self, MixerClient, RemoteMixer},
    registry::SourceRegistry,
    router,
    strip::{Context, Strips},
    surface::SurfaceSink,
};

const CLIENT_NAME: &str = "mixer-surface-controller";

// Granularity of the fader-echo release check; the quiet period itself is
// strip::FADER_ECHO_QUIET.
const RELEASE_TICK: Duration = Duration::from_millis(50);

struct Surface {
    ports: midi::Ports,
}

impl SurfaceSink for Surface {
    fn send(&mut self, msg: midi::Msg) {
        // Send failures are already logged by the port; the surface will be
        // repainted by subsequent state updates.
        let _ = self.ports.send(&msg);
    }
}

pub struct App {
    strips: Strips,
    registry: SourceRegistry,
    surface: Surface,
    mixer: Box<dyn MixerClient>,
    midi_rx: channel::Receiver<midi::Msg>,
    mixer_rx: channel::Receiver<mixer::MixerEvent>,
}

impl App {
    pub fn try_new(config: &Config) -> anyhow::Result<Self> {
        let (midi_tx, midi_rx) = channel::unbounded();
        let ports = midi::Ports::connect(CLIENT_NAME, &config.surface_port, midi_tx)
            .context("connecting to the surface")?;

        let (mixer, mixer_rx) =
            RemoteMixer::connect(&config.mixer_url, config.mixer_password.as_deref())
                .with_context(|| format!("connecting to the mixer at {}", config.mixer_url))?;

        Ok(Self {
            strips: Strips::default(),
            registry: SourceRegistry::default(),
            surface: Surface { ports },
            mixer: Box::new(mixer),
            midi_rx,
            mixer_rx,
        })
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        self.strips.reset_all(&mut self.surface);
        log::info!("Surface ready on {}", self.surface.ports.name());

        let release_tick = channel::tick(RELEASE_TICK);

        loop {
            channel::select! {
                recv(self.midi_rx) -> msg => {
                    let msg = msg.context("surface input channel closed")?;
                    router::surface_msg(
                        &mut self.strips,
                        &msg,
                        &mut Context {
                            sink: &mut self.surface,
                            mixer: &*self.mixer,
                            registry: &mut self.registry,
                        },
                    );
                }
                recv(self.mixer_rx) -> event => {
                    let event = event.context("mixer connection lost")?;
                    router::mixer_event(
                        &mut self.strips,
                        event,
                        &mut Context {
                            sink: &mut self.surface,
                            mixer: &*self.mixer,
                            registry: &mut self.registry,
                        },
                    );
                }
                recv(release_tick) -> _ => {
                    self.strips.release_faders(Instant::now(), &mut self.surface);
                }
            }
        }
    }
}
