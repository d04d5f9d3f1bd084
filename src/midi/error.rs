use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI initialization failed")]
    Init(#[from] midir::InitError),

    #[error("No MIDI port matching {}", .0)]
    NoMatchingPort(Arc<str>),

    #[error("MIDI port connection failed")]
    PortConnection,

    #[error("Couldn't retrieve a MIDI port name")]
    PortInfo(#[from] midir::PortInfoError),

    #[error("Couldn't send MIDI message: {}", .0)]
    Send(#[from] midir::SendError),
}
