//! Scripted in-memory mixer for state machine tests.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    sync::Arc,
};

use super::{Error, MixerClient, MonitorType, SourceId, SourceInfo, SourceState};

#[derive(Clone, Debug, PartialEq)]
pub enum FakeRequest {
    SetMonitor(SourceId, MonitorType),
    SetMute(SourceId, bool),
    SetBalance(SourceId, f64),
    SetVolume(SourceId, f64),
    SubmitVolume(SourceId, f64),
    SetRecordTrack(SourceId, bool),
}

#[derive(Default)]
pub struct FakeMixer {
    sources: Vec<(Arc<str>, SourceId)>,
    probe_failures: HashSet<SourceId>,
    state: RefCell<HashMap<SourceId, SourceState>>,
    pub requests: RefCell<Vec<FakeRequest>>,
    pub fail_sets: Cell<bool>,
}

impl FakeMixer {
    pub fn with_source(mut self, name: &str, id: &str, state: SourceState) -> Self {
        let id = SourceId::from(id);
        self.sources.push((name.into(), id.clone()));
        self.state.borrow_mut().insert(id, state);
        self
    }

    pub fn with_silent_source(self, name: &str, id: &str) -> Self {
        self.with_source(
            name,
            id,
            SourceState {
                monitor: MonitorType::None,
                muted: false,
                balance: 0.5,
                volume: 0.0,
                record: false,
            },
        )
    }

    pub fn with_probe_failure(mut self, id: &str) -> Self {
        self.probe_failures.insert(SourceId::from(id));
        self
    }

    pub fn take_requests(&self) -> Vec<FakeRequest> {
        self.requests.take()
    }

    fn get(&self, id: &SourceId) -> Result<SourceState, Error> {
        self.state
            .borrow()
            .get(id)
            .copied()
            .ok_or_else(|| request_error("unknown source"))
    }

    fn set(&self, id: &SourceId, request: FakeRequest) -> Result<(), Error> {
        if self.fail_sets.get() {
            self.requests.borrow_mut().push(request);
            return Err(request_error("scripted failure"));
        }

        {
            let mut state = self.state.borrow_mut();
            let entry = state.get_mut(id).ok_or_else(|| request_error("unknown source"))?;
            match &request {
                FakeRequest::SetMonitor(_, monitor) => entry.monitor = *monitor,
                FakeRequest::SetMute(_, muted) => entry.muted = *muted,
                FakeRequest::SetBalance(_, balance) => entry.balance = *balance,
                FakeRequest::SetVolume(_, mul) | FakeRequest::SubmitVolume(_, mul) => {
                    entry.volume = *mul
                }
                FakeRequest::SetRecordTrack(_, enabled) => entry.record = *enabled,
            }
        }

        self.requests.borrow_mut().push(request);

        Ok(())
    }
}

fn request_error(comment: &str) -> Error {
    Error::Request {
        request: "fake".into(),
        comment: comment.into(),
    }
}

impl MixerClient for FakeMixer {
    fn list_sources(&self) -> Result<Vec<SourceInfo>, Error> {
        Ok(self
            .sources
            .iter()
            .map(|(name, id)| SourceInfo {
                name: name.clone(),
                id: id.clone(),
            })
            .collect())
    }

    fn monitor_type(&self, id: &SourceId) -> Result<MonitorType, Error> {
        if self.probe_failures.contains(id) {
            return Err(request_error("not an audio source"));
        }

        Ok(self.get(id)?.monitor)
    }

    fn set_monitor_type(&self, id: &SourceId, monitor: MonitorType) -> Result<(), Error> {
        self.set(id, FakeRequest::SetMonitor(id.clone(), monitor))
    }

    fn muted(&self, id: &SourceId) -> Result<bool, Error> {
        Ok(self.get(id)?.muted)
    }

    fn set_muted(&self, id: &SourceId, muted: bool) -> Result<(), Error> {
        self.set(id, FakeRequest::SetMute(id.clone(), muted))
    }

    fn balance(&self, id: &SourceId) -> Result<f64, Error> {
        Ok(self.get(id)?.balance)
    }

    fn set_balance(&self, id: &SourceId, balance: f64) -> Result<(), Error> {
        self.set(id, FakeRequest::SetBalance(id.clone(), balance))
    }

    fn volume(&self, id: &SourceId) -> Result<f64, Error> {
        Ok(self.get(id)?.volume)
    }

    fn set_volume(&self, id: &SourceId, mul: f64) -> Result<(), Error> {
        self.set(id, FakeRequest::SetVolume(id.clone(), mul))
    }

    fn submit_volume(&self, id: &SourceId, mul: f64) {
        let _ = self.set(id, FakeRequest::SubmitVolume(id.clone(), mul));
    }

    fn record_track(&self, id: &SourceId) -> Result<bool, Error> {
        Ok(self.get(id)?.record)
    }

    fn set_record_track(&self, id: &SourceId, enabled: bool) -> Result<(), Error> {
        self.set(id, FakeRequest::SetRecordTrack(id.clone(), enabled))
    }
}
