use std::time::Duration;

use crate::error::Result;
use crate::lifecycle::Pacer;
use crate::media::{ClipRef, MediaBackend, Volume};

/// Fixed pacing of fades, bridges and polling.
#[derive(Debug, Clone)]
pub struct Timing {
    pub volume_step: u8,
    pub step_interval: Duration,
    pub poll_tick: Duration,
    /// Lets the player register a forced mute before playback starts.
    pub mute_settle: Duration,
    /// Lets playback stabilise before fading in.
    pub play_settle: Duration,
    /// Lets the idle loop come up before its volume is set.
    pub start_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            volume_step: 5,
            step_interval: Duration::from_millis(100),
            poll_tick: Duration::from_millis(200),
            mute_settle: Duration::from_millis(100),
            play_settle: Duration::from_millis(500),
            start_settle: Duration::from_secs(1),
        }
    }
}

impl Timing {
    /// A zero step would never reach the end of a ramp.
    fn step(&self) -> u8 {
        self.volume_step.max(1)
    }

    fn ramp_steps(&self, from: Volume) -> u32 {
        (from.level() as u32).div_ceil(self.step() as u32) + 1
    }

    pub fn fade_out_duration(&self, from: Volume) -> Duration {
        self.step_interval * self.ramp_steps(from)
    }

    pub fn fade_in_duration(&self) -> Duration {
        self.step_interval * self.ramp_steps(Volume::MAX)
    }

    pub fn switch_duration(&self, from: Volume) -> Duration {
        self.fade_out_duration(from)
            + self.mute_settle
            + self.play_settle
            + self.fade_in_duration()
    }

    /// Worst case from the start of a bridge until the target clip is playing.
    pub fn bridge_duration(&self) -> Duration {
        self.switch_duration(Volume::MAX)
            + self.fade_out_duration(Volume::MUTE)
            + self.mute_settle
    }
}

/// Volume ramps and clip swaps on top of a media backend.
///
/// Every wait goes through the pacer, so a shutdown request abandons the
/// sequence at the next step with `Error::Interrupted`.
pub struct TransitionController<'a, M, P> {
    media: &'a mut M,
    pacer: &'a mut P,
    timing: &'a Timing,
}

impl<'a, M: MediaBackend, P: Pacer> TransitionController<'a, M, P> {
    pub fn new(media: &'a mut M, pacer: &'a mut P, timing: &'a Timing) -> Self {
        Self { media, pacer, timing }
    }

    pub fn fade_out(&mut self) -> Result<()> {
        let mut volume = self.media.volume();
        loop {
            self.media.set_volume(volume);
            self.pacer.pause(self.timing.step_interval)?;
            if volume == Volume::MUTE {
                return Ok(());
            }
            volume = volume.down(self.timing.step());
        }
    }

    pub fn fade_in(&mut self) -> Result<()> {
        let mut volume = Volume::MUTE;
        loop {
            self.media.set_volume(volume);
            self.pacer.pause(self.timing.step_interval)?;
            if volume == Volume::MAX {
                return Ok(());
            }
            volume = volume.up(self.timing.step());
        }
    }

    pub fn mute(&mut self) {
        self.media.set_volume(Volume::MUTE);
    }

    /// Fades the current clip out and `clip` in, muting before it starts so
    /// the player's default volume never leaks through.
    pub fn switch_to(&mut self, clip: &ClipRef) -> Result<()> {
        self.fade_out()?;

        let media = self.media.load(clip)?;
        self.media.set_volume(Volume::MUTE);
        self.pacer.pause(self.timing.mute_settle)?;

        self.media.play(&media)?;
        self.pacer.pause(self.timing.play_settle)?;

        self.fade_in()
    }

    /// Goes through the bridge clip, then into `target`.
    pub fn bridge(&mut self, bridge: &ClipRef, target: &ClipRef) -> Result<()> {
        self.switch_to(bridge)?;
        self.mute();
        self.switch_to(target)
    }

    /// Hard cut used to bring up the idle loop: no fade, fixed volume once
    /// the player has started.
    pub fn cut_to(&mut self, clip: &ClipRef, volume: Volume) -> Result<()> {
        let media = self.media.load(clip)?;
        self.media.set_fullscreen(true);
        self.media.play(&media)?;
        self.pacer.pause(self.timing.start_settle)?;
        self.media.set_volume(volume);
        Ok(())
    }

    /// Restarts a clip that ran out, without any settling.
    pub fn restart(&mut self, clip: &ClipRef, volume: Volume) -> Result<()> {
        let media = self.media.load(clip)?;
        self.media.play(&media)?;
        self.media.set_volume(volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{Call, Clock, FakePlayer, VirtualPacer};

    fn rig(volume: i32) -> (FakePlayer, VirtualPacer, Timing) {
        let clock = Clock::default();
        let mut player = FakePlayer::new(clock.clone());
        player.set_volume(Volume::new(volume));
        player.take_calls();
        (player, VirtualPacer::new(clock), Timing::default())
    }

    #[test]
    fn fade_out_steps_down_to_zero() {
        let (mut player, mut pacer, timing) = rig(72);
        TransitionController::new(&mut player, &mut pacer, &timing)
            .fade_out()
            .unwrap();

        let levels = player.volume_levels();
        assert_eq!(levels.first(), Some(&72));
        assert_eq!(levels.last(), Some(&0));
        assert!(levels.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(levels.len(), 16);
        assert_eq!(pacer.elapsed(), timing.fade_out_duration(Volume::new(72)));
    }

    #[test]
    fn fade_out_from_silence_is_one_step() {
        let (mut player, mut pacer, timing) = rig(0);
        TransitionController::new(&mut player, &mut pacer, &timing)
            .fade_out()
            .unwrap();
        assert_eq!(player.volume_levels(), vec![0]);
    }

    #[test]
    fn fade_in_climbs_to_full() {
        let (mut player, mut pacer, timing) = rig(40);
        TransitionController::new(&mut player, &mut pacer, &timing)
            .fade_in()
            .unwrap();

        let expected: Vec<u8> = (0..=100).step_by(5).collect();
        assert_eq!(player.volume_levels(), expected);
        assert_eq!(pacer.elapsed(), Duration::from_millis(2100));
    }

    #[test]
    fn zero_step_still_finishes() {
        let (mut player, mut pacer, _) = rig(3);
        let timing = Timing {
            volume_step: 0,
            ..Timing::default()
        };
        let mut transitions = TransitionController::new(&mut player, &mut pacer, &timing);
        transitions.fade_out().unwrap();
        transitions.fade_in().unwrap();

        let levels = player.volume_levels();
        assert_eq!(&levels[..4], &[3, 2, 1, 0]);
        assert_eq!(levels.len(), 4 + 101);
        assert_eq!(levels.last(), Some(&100));
    }

    #[test]
    fn switch_mutes_before_playing() {
        let (mut player, mut pacer, timing) = rig(70);
        let clip = ClipRef::new("001.mp4");
        TransitionController::new(&mut player, &mut pacer, &timing)
            .switch_to(&clip)
            .unwrap();

        let calls = player.take_calls();
        let load = calls.iter().position(|c| *c == Call::Load(clip.clone())).unwrap();
        let play = calls.iter().position(|c| *c == Call::Play(clip.clone())).unwrap();
        assert_eq!(calls[load + 1], Call::SetVolume(0));
        assert!(play > load + 1);
        // nothing louder than silence between load and the fade-in
        assert!(calls[load..play]
            .iter()
            .all(|c| !matches!(c, Call::SetVolume(v) if *v > 0)));
        assert_eq!(calls.last(), Some(&Call::SetVolume(100)));
    }

    #[test]
    fn load_failure_propagates() {
        let (mut player, mut pacer, timing) = rig(70);
        let clip = ClipRef::new("broken.mp4");
        player.fail_to_load(&clip);

        let result = TransitionController::new(&mut player, &mut pacer, &timing).switch_to(&clip);
        assert!(matches!(result, Err(Error::MediaLoad { .. })));
        assert!(!player.take_calls().iter().any(|c| matches!(c, Call::Play(_))));
    }

    #[test]
    fn shutdown_abandons_a_fade() {
        let (mut player, mut pacer, timing) = rig(100);
        pacer.shutdown_at(Duration::from_millis(450));

        let result = TransitionController::new(&mut player, &mut pacer, &timing).fade_out();
        assert!(matches!(result, Err(Error::Interrupted)));
        assert_eq!(player.volume_levels(), vec![100, 95, 90, 85, 80]);
    }

    #[test]
    fn bridge_duration_covers_a_full_bridge() {
        let (mut player, mut pacer, timing) = rig(100);
        TransitionController::new(&mut player, &mut pacer, &timing)
            .bridge(&ClipRef::new("black.mp4"), &ClipRef::new("001.mp4"))
            .unwrap();
        assert_eq!(
            pacer.elapsed(),
            timing.bridge_duration() + timing.play_settle + timing.fade_in_duration()
        );
    }
}
