//! Deterministic stand-ins for the player, the buttons and the wall clock.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::lifecycle::Pacer;
use crate::media::{ClipRef, MediaBackend, MediaHandle, PlayerState, Volume};
use crate::trigger::{TriggerId, TriggerSource};

/// Virtual time shared by the fakes of one test.
#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<Duration>>);

impl Clock {
    pub fn now(&self) -> Duration {
        self.0.get()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

pub fn secs(s: f64) -> Duration {
    Duration::from_millis((s * 1000.0).round() as u64)
}

/// Advances virtual time instead of sleeping.
#[derive(Debug)]
pub struct VirtualPacer {
    clock: Clock,
    started: Duration,
    shutdown_at: Option<Duration>,
    interrupted: bool,
}

impl VirtualPacer {
    pub fn new(clock: Clock) -> Self {
        let started = clock.now();
        Self {
            clock,
            started,
            shutdown_at: None,
            interrupted: false,
        }
    }

    /// Raises shutdown during the first pause that reaches `at`.
    pub fn shutdown_at(&mut self, at: Duration) {
        self.shutdown_at = Some(at);
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now() - self.started
    }
}

impl Pacer for VirtualPacer {
    fn pause(&mut self, duration: Duration) -> Result<()> {
        if self.interrupted {
            return Err(Error::Interrupted);
        }
        self.clock.advance(duration);
        if self.shutdown_at.is_some_and(|at| self.clock.now() >= at) {
            self.interrupted = true;
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        self.interrupted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load(ClipRef),
    Play(ClipRef),
    Stop,
    SetVolume(u8),
    Fullscreen(bool),
}

#[derive(Debug)]
enum Deck {
    Empty,
    Loaded,
    Playing { clip: ClipRef, since: Duration },
    Stopped,
}

/// Records every call; clips end once their duration has passed.
#[derive(Debug)]
pub struct FakePlayer {
    clock: Clock,
    calls: Vec<Call>,
    plays: Vec<(Duration, ClipRef)>,
    durations: HashMap<ClipRef, Duration>,
    broken: HashSet<ClipRef>,
    deck: Deck,
    volume: Volume,
    next_media: i32,
}

impl FakePlayer {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            calls: Vec::new(),
            plays: Vec::new(),
            durations: HashMap::new(),
            broken: HashSet::new(),
            deck: Deck::Empty,
            volume: Volume::MAX,
            next_media: 0,
        }
    }

    pub fn with_duration(mut self, clip: &str, duration: Duration) -> Self {
        self.durations.insert(ClipRef::new(clip), duration);
        self
    }

    pub fn fail_to_load(&mut self, clip: &ClipRef) {
        self.broken.insert(clip.clone());
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn volume_levels(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::SetVolume(level) => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn played(&self) -> Vec<ClipRef> {
        self.plays.iter().map(|(_, clip)| clip.clone()).collect()
    }

    pub fn play_times(&self) -> &[(Duration, ClipRef)] {
        &self.plays
    }
}

impl MediaBackend for FakePlayer {
    fn load(&mut self, clip: &ClipRef) -> Result<MediaHandle> {
        self.calls.push(Call::Load(clip.clone()));
        if self.broken.contains(clip) {
            return Err(Error::media_load(clip, "decoder error"));
        }
        self.deck = Deck::Loaded;
        self.next_media += 1;
        Ok(MediaHandle {
            id: self.next_media,
            clip: clip.clone(),
        })
    }

    fn play(&mut self, media: &MediaHandle) -> Result<()> {
        self.calls.push(Call::Play(media.clip.clone()));
        self.plays.push((self.clock.now(), media.clip.clone()));
        self.deck = Deck::Playing {
            clip: media.clip.clone(),
            since: self.clock.now(),
        };
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.push(Call::Stop);
        self.deck = Deck::Stopped;
    }

    fn state(&mut self) -> PlayerState {
        match &self.deck {
            Deck::Empty | Deck::Stopped => PlayerState::Stopped,
            Deck::Loaded => PlayerState::Other,
            Deck::Playing { clip, since } => {
                let length = self
                    .durations
                    .get(clip)
                    .copied()
                    .unwrap_or(Duration::from_secs(3600));
                if self.clock.now() - *since >= length {
                    PlayerState::Ended
                } else {
                    PlayerState::Playing
                }
            }
        }
    }

    fn volume(&mut self) -> Volume {
        self.volume
    }

    fn set_volume(&mut self, volume: Volume) {
        self.calls.push(Call::SetVolume(volume.level()));
        self.volume = volume;
    }

    fn set_fullscreen(&mut self, on: bool) {
        self.calls.push(Call::Fullscreen(on));
    }
}

/// Buttons held during fixed windows of virtual time.
#[derive(Debug)]
pub struct ScriptedTriggers {
    clock: Clock,
    holds: Vec<(TriggerId, Duration, Duration)>,
    broken: HashSet<TriggerId>,
    released: bool,
}

impl ScriptedTriggers {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            holds: Vec::new(),
            broken: HashSet::new(),
            released: false,
        }
    }

    /// Held from `from` (inclusive) until `until` (exclusive).
    pub fn hold(mut self, id: TriggerId, from: Duration, until: Duration) -> Self {
        self.holds.push((id, from, until));
        self
    }

    pub fn failing(mut self, id: TriggerId) -> Self {
        self.broken.insert(id);
        self
    }

    pub fn released(&self) -> bool {
        self.released
    }
}

impl TriggerSource for ScriptedTriggers {
    fn is_active(&mut self, id: TriggerId) -> Result<bool> {
        if self.broken.contains(&id) {
            return Err(Error::TriggerRead {
                id,
                reason: "line unreadable".into(),
            });
        }
        let now = self.clock.now();
        Ok(self
            .holds
            .iter()
            .any(|(held, from, until)| *held == id && *from <= now && now < *until))
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// True when `expected` appears in `calls` in order, not necessarily adjacent.
pub fn in_order(calls: &[Call], expected: &[Call]) -> bool {
    let mut remaining = expected.iter().peekable();
    for call in calls {
        if remaining.peek() == Some(&call) {
            remaining.next();
        }
    }
    remaining.peek().is_none()
}
