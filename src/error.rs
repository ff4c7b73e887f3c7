use thiserror::Error;

use crate::media::ClipRef;
use crate::trigger::TriggerId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load {clip}: {reason}")]
    MediaLoad { clip: ClipRef, reason: String },

    #[error("failed to read trigger {id}: {reason}")]
    TriggerRead { id: TriggerId, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Shutdown was requested while a blocking step was pending.
    #[error("shutdown requested")]
    Interrupted,
}

impl Error {
    pub fn media_load(clip: &ClipRef, reason: impl ToString) -> Self {
        Self::MediaLoad {
            clip: clip.clone(),
            reason: reason.to_string(),
        }
    }
}
