use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::error::{Error, Result};

/// How long a pause may go without checking for shutdown.
const SLICE: Duration = Duration::from_millis(10);

/// Every blocking step of the kiosk goes through a pacer, so a shutdown
/// request can cut a fade or a bridge short.
pub trait Pacer {
    /// Waits for `duration`, or fails with `Error::Interrupted` as soon as
    /// shutdown is requested.
    fn pause(&mut self, duration: Duration) -> Result<()>;

    fn shutdown_requested(&self) -> bool;
}

/// Shared flag raised by the termination signals.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn install() -> anyhow::Result<Self> {
        let shutdown = Self::default();
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&shutdown.flag))
                .with_context(|| format!("registering handler for signal {signal}"))?;
        }
        Ok(shutdown)
    }

    #[cfg(test)]
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Wall-clock pacer that sleeps in short slices.
#[derive(Debug)]
pub struct SleepPacer {
    shutdown: Shutdown,
}

impl SleepPacer {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

impl Pacer for SleepPacer {
    fn pause(&mut self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            if self.shutdown.is_requested() {
                return Err(Error::Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(SLICE.min(deadline - now));
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }
}
