use crossbeam_channel as channel;
use std::sync::Arc;

use super::{Error, Msg};

/// In & out connections to the surface's MIDI ports.
///
/// Both directions are connected to the first port whose name contains the
/// configured fragment. Inbound messages are forwarded as [`Msg`]s on the
/// provided channel from midir's callback thread.
pub struct Ports {
    port_name: Arc<str>,
    // Held to keep the input callback alive; dropped with the Ports.
    _input: midir::MidiInputConnection<channel::Sender<Msg>>,
    output: midir::MidiOutputConnection,
}

impl Ports {
    pub fn connect(
        client_name: &str,
        fragment: &str,
        msg_tx: channel::Sender<Msg>,
    ) -> Result<Self, Error> {
        let midi_in = midir::MidiInput::new(client_name)?;
        let in_port = find_port(&midi_in, fragment)?;
        let port_name: Arc<str> = midi_in.port_name(&in_port)?.into();

        let input = midi_in
            .connect(
                &in_port,
                client_name,
                |_ts, buf, msg_tx| {
                    let _ = msg_tx.send(Msg::from(buf));
                },
                msg_tx,
            )
            .map_err(|_| Error::PortConnection)?;

        let midi_out = midir::MidiOutput::new(client_name)?;
        let out_port = find_port(&midi_out, fragment)?;
        let output = midi_out
            .connect(&out_port, client_name)
            .map_err(|_| Error::PortConnection)?;

        log::info!("Connected In & Out to {port_name}");

        Ok(Self {
            port_name,
            _input: input,
            output,
        })
    }

    pub fn name(&self) -> Arc<str> {
        self.port_name.clone()
    }

    pub fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        self.output.send(msg.inner()).map_err(|err| {
            log::error!("Failed to send MIDI msg {}: {err}", msg.display());
            Error::from(err)
        })
    }
}

fn find_port<IO: midir::MidiIO>(io: &IO, fragment: &str) -> Result<IO::Port, Error> {
    for port in io.ports() {
        if io.port_name(&port)?.contains(fragment) {
            return Ok(port);
        }
    }

    Err(Error::NoMatchingPort(fragment.into()))
}
