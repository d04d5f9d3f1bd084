use anyhow::Context;
use std::path::Path;

pub const DEFAULT_PATH: &str = "mixer-surface.yml";

#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// WebSocket URL of the mixer.
    pub mixer_url: String,
    pub mixer_password: Option<String>,
    /// Fragment of the surface's MIDI port name to connect to.
    pub surface_port: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mixer_url: "ws://localhost:4455".into(),
            mixer_password: None,
            surface_port: "X-Touch-Ext".into(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;

        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }
}
