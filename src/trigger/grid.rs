use monome::{KeyDirection, Monome, MonomeEvent};

use crate::error::Result;
use crate::trigger::{TriggerId, TriggerSource};

const COLUMNS: usize = 16;
const KEYS: usize = 128;

const MAPPED: u8 = 100;
const HELD: u8 = 255;

/// A monome grid used as a button panel. Trigger `n` is key `(n % 16, n / 16)`.
pub(crate) struct GridButtons {
    monome: Monome,
    held: Vec<bool>,
    mapped: Vec<bool>,
}

impl GridButtons {
    pub fn new(monome: Monome, triggers: impl IntoIterator<Item = TriggerId>) -> Self {
        let mut mapped = vec![false; KEYS];
        for id in triggers {
            match mapped.get_mut(id.0 as usize) {
                Some(key) => *key = true,
                None => tracing::warn!(trigger = %id, "trigger is outside the grid"),
            }
        }
        let mut grid = Self {
            monome,
            held: vec![false; KEYS],
            mapped,
        };
        grid.refresh_leds();
        grid
    }

    fn key_index(x: i32, y: i32) -> Option<usize> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        let index = y * COLUMNS + x;
        (x < COLUMNS && index < KEYS).then_some(index)
    }

    fn refresh_leds(&mut self) {
        let leds = intensities(&self.held, &self.mapped);
        self.monome.set_all_intensity(&leds);
    }

    fn drain_events(&mut self) {
        let mut changed = false;
        while let Some(event) = self.monome.poll() {
            changed |= apply_event(&mut self.held, event);
        }
        if changed {
            self.refresh_leds();
        }
    }
}

/// Records a key press or release; true when `held` changed.
fn apply_event(held: &mut [bool], event: MonomeEvent) -> bool {
    let MonomeEvent::GridKey { x, y, direction } = event else {
        return false;
    };
    let Some(key) = GridButtons::key_index(x, y).and_then(|index| held.get_mut(index)) else {
        return false;
    };
    let down = matches!(direction, KeyDirection::Down);
    let changed = *key != down;
    *key = down;
    changed
}

/// Held keys are lit fully, mapped keys dimly, the rest stay dark.
fn intensities(held: &[bool], mapped: &[bool]) -> Vec<u8> {
    held.iter()
        .zip(mapped)
        .map(|(held, mapped)| match (held, mapped) {
            (true, _) => HELD,
            (false, true) => MAPPED,
            (false, false) => 0,
        })
        .collect()
}

impl TriggerSource for GridButtons {
    fn is_active(&mut self, id: TriggerId) -> Result<bool> {
        self.drain_events();
        Ok(self.held.get(id.0 as usize).copied().unwrap_or(false))
    }

    fn release(&mut self) {
        self.monome.set_all_intensity(&[0; KEYS]);
    }
}
