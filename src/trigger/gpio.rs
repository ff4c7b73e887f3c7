use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;

use crate::error::{Error, Result};
use crate::trigger::{TriggerId, TriggerSource};

/// udev needs a moment to create and chown a freshly exported line.
const EXPORT_ATTEMPTS: u32 = 20;
const EXPORT_RETRY: Duration = Duration::from_millis(50);

/// Buttons wired to GPIO lines, read through the sysfs interface.
///
/// Trigger ids are chip offsets (BCM numbers on a Raspberry Pi); the sysfs
/// line is the chip's base plus the offset.
#[derive(Debug)]
pub struct SysfsButtons {
    root: PathBuf,
    base: u32,
    active_low: bool,
    lines: Vec<u32>,
}

impl SysfsButtons {
    /// Exports every line and configures it as an input. Without an explicit
    /// `base` the main pin controller's base is looked up under `root`.
    pub fn open(
        root: impl Into<PathBuf>,
        base: Option<u32>,
        active_low: bool,
        triggers: impl IntoIterator<Item = TriggerId>,
    ) -> anyhow::Result<Self> {
        let root = root.into();
        let base = match base {
            Some(base) => base,
            None => detect_base(&root)?,
        };
        let mut buttons = Self {
            root,
            base,
            active_low,
            lines: Vec::new(),
        };
        for id in triggers {
            let line = buttons.line(id);
            buttons
                .export(line)
                .with_context(|| format!("setting up gpio {id} (line {line})"))?;
            buttons.lines.push(line);
            tracing::debug!(trigger = %id, line, "gpio line ready");
        }
        Ok(buttons)
    }

    fn line(&self, id: TriggerId) -> u32 {
        self.base + id.0 as u32
    }

    fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    fn export(&self, line: u32) -> io::Result<()> {
        if !self.line_dir(line).exists() {
            fs::write(self.root.join("export"), line.to_string())?;
        }
        let direction = self.line_dir(line).join("direction");
        let mut attempt = 1;
        loop {
            match fs::write(&direction, "in") {
                Ok(()) => return Ok(()),
                Err(err)
                    if attempt < EXPORT_ATTEMPTS
                        && matches!(
                            err.kind(),
                            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                        ) =>
                {
                    attempt += 1;
                    thread::sleep(EXPORT_RETRY);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn read_level(path: &Path) -> io::Result<bool> {
        match fs::read_to_string(path)?.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected value {other:?}"),
            )),
        }
    }
}

/// Base of the SoC pin controller, falling back to the lowest chip base.
/// Kernels before 6.6 number the Raspberry Pi header from 0, later ones from 512.
fn detect_base(root: &Path) -> anyhow::Result<u32> {
    let mut chips = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("listing {}", root.display()))? {
        let path = entry?.path();
        let is_chip = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("gpiochip"));
        if !is_chip {
            continue;
        }
        let base: u32 = fs::read_to_string(path.join("base"))
            .with_context(|| format!("reading {}", path.display()))?
            .trim()
            .parse()
            .with_context(|| format!("parsing base of {}", path.display()))?;
        let label = fs::read_to_string(path.join("label")).unwrap_or_default();
        chips.push((label.trim().starts_with("pinctrl-"), base));
    }

    let base = chips
        .iter()
        .filter(|(pinctrl, _)| *pinctrl)
        .map(|(_, base)| *base)
        .min()
        .or_else(|| chips.iter().map(|(_, base)| *base).min())
        .unwrap_or(0);
    tracing::debug!(base, chips = chips.len(), "gpio base");
    Ok(base)
}

impl TriggerSource for SysfsButtons {
    fn is_active(&mut self, id: TriggerId) -> Result<bool> {
        let path = self.line_dir(self.line(id)).join("value");
        let high = Self::read_level(&path).map_err(|err| Error::TriggerRead {
            id,
            reason: err.to_string(),
        })?;
        Ok(high != self.active_low)
    }

    fn release(&mut self) {
        for line in self.lines.drain(..) {
            if let Err(err) = fs::write(self.root.join("unexport"), line.to_string()) {
                tracing::warn!(line, %err, "failed to unexport gpio line");
            }
        }
    }
}

impl Drop for SysfsButtons {
    fn drop(&mut self) {
        self.release();
    }
}
