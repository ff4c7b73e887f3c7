use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::arbiter::Show;
use crate::error::{Error, Result};
use crate::media::{ClipRef, Volume};
use crate::trigger::{TriggerId, TriggerMap};

/// Startup configuration, read once from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KioskConfig {
    pub video_dir: PathBuf,
    pub idle_clip: String,
    pub bridge_clip: String,
    pub bridge_on_natural_end: bool,
    pub volume: VolumeConfig,
    pub input: InputConfig,
    pub player: PlayerConfig,
    #[serde(rename = "trigger")]
    pub triggers: Vec<TriggerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeConfig {
    /// Level of the idle loop once it is up.
    pub idle: u8,
    /// Level applied when the idle loop restarts after running out.
    pub idle_restart: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Gpio,
    Grid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub kind: InputKind,
    /// Buttons pull the line low when pressed.
    pub active_low: bool,
    pub gpio_root: PathBuf,
    /// sysfs number of line 0; looked up from the pin controller when unset.
    pub gpio_base: Option<u32>,
    pub grid_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    pub addr: SocketAddr,
    pub report_addr: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    pub id: TriggerId,
    pub clip: String,
}

impl Default for KioskConfig {
    fn default() -> Self {
        let triggers = [
            (17, "001.mp4"),
            (27, "002.mp4"),
            (22, "003.mp4"),
            (23, "004.mp4"),
            (24, "005.mp4"),
        ]
        .into_iter()
        .map(|(id, clip)| TriggerConfig {
            id: TriggerId(id),
            clip: clip.to_string(),
        })
        .collect();
        Self {
            video_dir: PathBuf::from("/home/digitalsign/7dpreshow/videos"),
            idle_clip: "000.mp4".to_string(),
            bridge_clip: "black.mp4".to_string(),
            bridge_on_natural_end: false,
            volume: VolumeConfig::default(),
            input: InputConfig::default(),
            player: PlayerConfig::default(),
            triggers,
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            idle: 70,
            idle_restart: 60,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            kind: InputKind::Gpio,
            active_low: true,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            gpio_base: None,
            grid_prefix: "/preshow-kiosk".to_string(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
            report_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

impl KioskConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn resolve(&self, name: &str, what: &str) -> Result<ClipRef> {
        if name.trim().is_empty() {
            return Err(Error::Config(format!("{what} clip is empty")));
        }
        Ok(ClipRef::new(self.video_dir.join(name)))
    }

    /// Resolves every clip under `video_dir` and validates the trigger table.
    pub fn show(&self) -> Result<Show> {
        let levels = [("idle", self.volume.idle), ("idle_restart", self.volume.idle_restart)];
        for (what, level) in levels {
            if level > 100 {
                return Err(Error::Config(format!("{what} volume {level} is above 100")));
            }
        }

        let mut entries = Vec::with_capacity(self.triggers.len());
        for trigger in &self.triggers {
            let clip = self.resolve(&trigger.clip, &format!("trigger {}", trigger.id))?;
            entries.push((trigger.id, clip));
        }

        let show = Show {
            idle: self.resolve(&self.idle_clip, "idle")?,
            bridge: self.resolve(&self.bridge_clip, "bridge")?,
            triggers: TriggerMap::new(entries)?,
            idle_volume: Volume::new(self.volume.idle as i32),
            idle_restart_volume: Volume::new(self.volume.idle_restart as i32),
            bridge_on_natural_end: self.bridge_on_natural_end,
        };

        let clips = [&show.idle, &show.bridge]
            .into_iter()
            .chain(show.triggers.iter().map(|(_, clip)| clip));
        for clip in clips {
            if !clip.path().is_file() {
                tracing::warn!(%clip, "clip not found, it will fail when selected");
            }
        }
        Ok(show)
    }
}
