//! Decides what is on screen.
//!
//! The session loops the idle clip until a trigger is held, bridges into the
//! clip bound to that trigger, and goes back to idle when the clip ends or
//! any trigger is pressed again. Switching from one selected clip to another
//! always passes through the bridge and the idle loop.

use std::fmt;

use crate::error::{Error, Result};
use crate::lifecycle::Pacer;
use crate::media::{ClipRef, MediaBackend, Volume};
use crate::transition::{Timing, TransitionController};
use crate::trigger::{TriggerId, TriggerMap, TriggerSource};

/// The clips a kiosk plays and the volumes it plays them at.
#[derive(Debug, Clone)]
pub struct Show {
    pub idle: ClipRef,
    pub bridge: ClipRef,
    pub triggers: TriggerMap,
    pub idle_volume: Volume,
    pub idle_restart_volume: Volume,
    pub bridge_on_natural_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Transitioning,
    Selected { trigger: TriggerId, clip: ClipRef },
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Transitioning => write!(f, "transitioning"),
            PlaybackState::Selected { trigger, clip } => {
                write!(f, "selected {clip} (trigger {trigger})")
            }
        }
    }
}

pub struct PlaybackSession<M, T, P> {
    show: Show,
    timing: Timing,
    media: M,
    triggers: T,
    pacer: P,
    state: PlaybackState,
    // idle clip needs a full reload after a failure
    idle_stale: bool,
}

impl<M: MediaBackend, T: TriggerSource, P: Pacer> PlaybackSession<M, T, P> {
    pub fn new(show: Show, timing: Timing, media: M, triggers: T, pacer: P) -> Self {
        Self {
            show,
            timing,
            media,
            triggers,
            pacer,
            state: PlaybackState::Idle,
            idle_stale: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn media(&self) -> &M {
        &self.media
    }

    #[cfg(test)]
    pub(crate) fn triggers(&self) -> &T {
        &self.triggers
    }

    fn transitions(&mut self) -> TransitionController<'_, M, P> {
        TransitionController::new(&mut self.media, &mut self.pacer, &self.timing)
    }

    fn set_state(&mut self, next: PlaybackState) {
        if next != self.state {
            tracing::info!(from = %self.state, to = %next, "playback state");
        }
        self.state = next;
    }

    /// Polls until shutdown is requested. Media failures never end the loop.
    pub fn run(&mut self) {
        tracing::info!(
            triggers = self.show.triggers.len(),
            idle = %self.show.idle,
            worst_response = ?(self.timing.poll_tick + self.timing.bridge_duration()),
            "starting kiosk loop"
        );
        loop {
            if self.pacer.shutdown_requested() {
                return;
            }
            if let Err(err) = self.tick() {
                if !self.recover(err) {
                    return;
                }
            }
            if self.pacer.pause(self.timing.poll_tick).is_err() {
                return;
            }
        }
    }

    /// Stops the player unconditionally, whatever it was doing, and hands
    /// the input lines back.
    pub fn shutdown(&mut self) {
        tracing::info!(state = %self.state, "shutting down");
        self.media.stop();
        self.triggers.release();
    }

    /// One polling step of the state machine.
    pub fn tick(&mut self) -> Result<()> {
        match self.state.clone() {
            PlaybackState::Idle => self.idle_tick(),
            PlaybackState::Selected { trigger, clip } => self.selected_tick(trigger, clip),
            // only seen if a transition was abandoned without recovery
            PlaybackState::Transitioning => self.enter_idle(),
        }
    }

    /// Returns false when the loop has to stop.
    fn recover(&mut self, err: Error) -> bool {
        match err {
            Error::Interrupted => false,
            err => {
                tracing::error!(%err, state = %self.state, "playback failed, falling back to idle");
                self.state = PlaybackState::Idle;
                self.idle_stale = true;
                true
            }
        }
    }

    fn enter_idle(&mut self) -> Result<()> {
        let idle = self.show.idle.clone();
        let volume = self.show.idle_volume;
        self.idle_stale = true;
        self.transitions().cut_to(&idle, volume)?;
        self.idle_stale = false;
        self.set_state(PlaybackState::Idle);
        Ok(())
    }

    fn idle_tick(&mut self) -> Result<()> {
        if self.idle_stale {
            self.enter_idle()?;
        } else if self.media.state().is_finished() {
            tracing::debug!(clip = %self.show.idle, "restarting idle loop");
            let idle = self.show.idle.clone();
            let volume = self.show.idle_restart_volume;
            self.transitions().restart(&idle, volume)?;
        }

        if let Some((trigger, clip)) = self.show.triggers.first_active(&mut self.triggers) {
            tracing::info!(%trigger, %clip, "trigger pressed");
            self.select(trigger, clip)?;
        }
        Ok(())
    }

    fn select(&mut self, trigger: TriggerId, clip: ClipRef) -> Result<()> {
        self.set_state(PlaybackState::Transitioning);
        let bridge = self.show.bridge.clone();
        self.transitions().bridge(&bridge, &clip)?;
        self.set_state(PlaybackState::Selected { trigger, clip });
        Ok(())
    }

    fn selected_tick(&mut self, current: TriggerId, clip: ClipRef) -> Result<()> {
        if let Some((trigger, _)) = self.show.triggers.first_active(&mut self.triggers) {
            tracing::info!(%trigger, %current, %clip, "interrupting selected clip");
            self.transitions().mute();
            self.set_state(PlaybackState::Transitioning);
            let bridge = self.show.bridge.clone();
            self.transitions().switch_to(&bridge)?;
            return self.enter_idle();
        }

        if self.media.state().is_finished() {
            tracing::info!(%clip, "selected clip finished");
            if self.show.bridge_on_natural_end {
                self.set_state(PlaybackState::Transitioning);
                let bridge = self.show.bridge.clone();
                self.transitions().switch_to(&bridge)?;
            }
            return self.enter_idle();
        }
        Ok(())
    }
}
