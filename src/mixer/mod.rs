//! Remote mixer collaborator: blocking request/response calls plus pushed
//! state-change events.

mod error;
pub use error::Error;

pub mod event;
pub use event::{MeterReading, MixerEvent};

pub mod remote;
pub use remote::RemoteMixer;

#[cfg(test)]
pub mod testing;

use std::{fmt, sync::Arc};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub name: Arc<str>,
    pub id: SourceId,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum MonitorType {
    #[serde(rename = "OBS_MONITORING_TYPE_NONE")]
    None,
    #[serde(rename = "OBS_MONITORING_TYPE_MONITOR_ONLY")]
    MonitorOnly,
    #[serde(rename = "OBS_MONITORING_TYPE_MONITOR_AND_OUTPUT")]
    MonitorAndOutput,
}

impl MonitorType {
    pub fn is_monitoring(self) -> bool {
        !matches!(self, MonitorType::None)
    }
}

/// Everything a strip mirrors from one source.
#[derive(Clone, Copy, Debug)]
pub struct SourceState {
    pub monitor: MonitorType,
    pub muted: bool,
    pub balance: f64,
    pub volume: f64,
    pub record: bool,
}

/// Request/response surface of the remote mixer.
///
/// Calls are issued from the control thread and block until the mixer
/// replies. The exception is [`submit_volume`]: it is sent without awaiting
/// a response so continuous fader drags don't stall the loop.
///
/// [`submit_volume`]: MixerClient::submit_volume
pub trait MixerClient: Send {
    fn list_sources(&self) -> Result<Vec<SourceInfo>, Error>;

    fn monitor_type(&self, id: &SourceId) -> Result<MonitorType, Error>;
    fn set_monitor_type(&self, id: &SourceId, monitor: MonitorType) -> Result<(), Error>;

    fn muted(&self, id: &SourceId) -> Result<bool, Error>;
    fn set_muted(&self, id: &SourceId, muted: bool) -> Result<(), Error>;

    /// Stereo balance as the mixer's signed fraction in 0..=1.
    fn balance(&self, id: &SourceId) -> Result<f64, Error>;
    fn set_balance(&self, id: &SourceId, balance: f64) -> Result<(), Error>;

    /// Multiplicative gain in 0..=1.
    fn volume(&self, id: &SourceId) -> Result<f64, Error>;
    fn set_volume(&self, id: &SourceId, mul: f64) -> Result<(), Error>;
    fn submit_volume(&self, id: &SourceId, mul: f64);

    /// Membership of the mixer's record audio track.
    fn record_track(&self, id: &SourceId) -> Result<bool, Error>;
    fn set_record_track(&self, id: &SourceId, enabled: bool) -> Result<(), Error>;

    fn source_state(&self, id: &SourceId) -> Result<SourceState, Error> {
        Ok(SourceState {
            monitor: self.monitor_type(id)?,
            muted: self.muted(id)?,
            balance: self.balance(id)?,
            volume: self.volume(id)?,
            record: self.record_track(id)?,
        })
    }
}
