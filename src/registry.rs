//! Browsable list of assignable mixer sources.
//!
//! Slots 0 and 1 are the permanent CANCEL and RESET sentinels; slots >= 2
//! come from the mixer's live source list, filtered down to sources that
//! answer the audio monitor-type probe (which weeds out non-audio sources).

use std::sync::Arc;

use crate::mixer::{MixerClient, SourceId};

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEntry {
    Cancel,
    Reset,
    Assignable { name: Arc<str>, id: SourceId },
}

impl SourceEntry {
    pub fn label(&self) -> &str {
        match self {
            SourceEntry::Cancel => "CANCEL",
            SourceEntry::Reset => "RESET",
            SourceEntry::Assignable { name, .. } => name,
        }
    }
}

pub struct SourceRegistry {
    entries: Vec<SourceEntry>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self {
            entries: vec![SourceEntry::Cancel, SourceEntry::Reset],
        }
    }
}

impl SourceRegistry {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, slot: usize) -> Option<&SourceEntry> {
        self.entries.get(slot)
    }

    /// Rebuilds the list from the mixer's current sources.
    ///
    /// The new list is built completely before replacing the old one, so a
    /// handler resuming mid-refresh never observes a half-built registry.
    /// Probe failures exclude the candidate and the refresh continues; a
    /// failed source listing keeps the previous contents.
    pub fn refresh(&mut self, mixer: &dyn MixerClient) -> Result<(), crate::mixer::Error> {
        let sources = mixer.list_sources()?;

        let mut entries = Vec::with_capacity(2 + sources.len());
        entries.push(SourceEntry::Cancel);
        entries.push(SourceEntry::Reset);

        for source in sources {
            match mixer.monitor_type(&source.id) {
                Ok(_) => entries.push(SourceEntry::Assignable {
                    name: source.name,
                    id: source.id,
                }),
                Err(err) => {
                    log::debug!("Excluding {} from registry: {err}", source.name);
                }
            }
        }

        self.entries = entries;

        Ok(())
    }
}
