pub mod gpio;
pub mod grid;

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::media::ClipRef;

/// Stable identifier of a physical input: a GPIO line number or a grid key index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub u16);

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A polled set of physical inputs.
pub trait TriggerSource {
    fn is_active(&mut self, id: TriggerId) -> Result<bool>;

    /// Gives the inputs back to the system on shutdown.
    fn release(&mut self) {}
}

/// Triggers in declaration order, each bound to the clip it selects.
///
/// Built once at startup; the order decides which trigger wins when several
/// are held at the same time.
#[derive(Debug, Clone)]
pub struct TriggerMap {
    entries: Vec<(TriggerId, ClipRef)>,
}

impl TriggerMap {
    pub fn new(entries: Vec<(TriggerId, ClipRef)>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (id, clip) in &entries {
            if !seen.insert(*id) {
                return Err(Error::Config(format!("trigger {id} is declared twice")));
            }
            if clip.path().as_os_str().is_empty() {
                return Err(Error::Config(format!("trigger {id} has no clip")));
            }
        }
        Ok(Self { entries })
    }

    pub fn ids(&self) -> impl Iterator<Item = TriggerId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(TriggerId, ClipRef)> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn clip(&self, id: TriggerId) -> Option<&ClipRef> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, clip)| clip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First held trigger in declaration order.
    ///
    /// A trigger that cannot be read counts as released for this poll.
    pub fn first_active<S: TriggerSource>(
        &self,
        source: &mut S,
    ) -> Option<(TriggerId, ClipRef)> {
        for (id, clip) in &self.entries {
            match source.is_active(*id) {
                Ok(true) => return Some((*id, clip.clone())),
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(trigger = %id, %err, "treating unreadable trigger as inactive")
                }
            }
        }
        None
    }
}
