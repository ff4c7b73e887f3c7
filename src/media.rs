use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A playable video, resolved against the video directory at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipRef(PathBuf);

impl ClipRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Output volume, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MUTE: Volume = Volume(0);
    pub const MAX: Volume = Volume(100);

    /// Clamps anything outside the valid range.
    pub fn new(level: i32) -> Self {
        Self(level.clamp(0, 100) as u8)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn down(self, step: u8) -> Self {
        Self(self.0.saturating_sub(step))
    }

    pub fn up(self, step: u8) -> Self {
        Self(self.0.saturating_add(step).min(100))
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Ended,
    Stopped,
    Other,
}

impl PlayerState {
    /// The current media is no longer producing frames.
    pub fn is_finished(self) -> bool {
        matches!(self, PlayerState::Ended | PlayerState::Stopped)
    }
}

/// Media loaded into the backend, ready to be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub(crate) id: i32,
    pub(crate) clip: ClipRef,
}

/// The video player the kiosk drives.
///
/// Volume, fullscreen and stop are best effort: an unavailable device turns
/// them into no-ops and reports `PlayerState::Other`. Only `load` and `play`
/// surface failures, since those decide what ends up on screen.
pub trait MediaBackend {
    fn load(&mut self, clip: &ClipRef) -> Result<MediaHandle>;
    fn play(&mut self, media: &MediaHandle) -> Result<()>;
    fn stop(&mut self);
    fn state(&mut self) -> PlayerState;
    fn volume(&mut self) -> Volume;
    fn set_volume(&mut self, volume: Volume);
    fn set_fullscreen(&mut self, on: bool);
}
