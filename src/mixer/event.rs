use super::{MonitorType, SourceId};

/// State-change notification pushed by the mixer, keyed by source identity.
#[derive(Debug)]
pub enum MixerEvent {
    Volume { source: SourceId, mul: f64 },
    Mute { source: SourceId, muted: bool },
    Balance { source: SourceId, balance: f64 },
    RecordTrack { source: SourceId, enabled: bool },
    Monitor { source: SourceId, monitor: MonitorType },
    Meters(Vec<MeterReading>),
}

/// One source's linear meter levels, one entry per audio channel.
#[derive(Debug)]
pub struct MeterReading {
    pub source: SourceId,
    pub levels: Vec<f64>,
}
