mod arbiter;
mod config;
mod error;
mod lifecycle;
mod media;
mod player;
mod transition;
mod trigger;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use monome::Monome;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::arbiter::{PlaybackSession, Show};
use crate::config::{InputKind, KioskConfig};
use crate::lifecycle::{Shutdown, SleepPacer};
use crate::player::OscPlayer;
use crate::transition::Timing;
use crate::trigger::gpio::SysfsButtons;
use crate::trigger::grid::GridButtons;
use crate::trigger::TriggerSource;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration; the built-in installation defaults apply without one
    #[clap(short, long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory the clips are resolved against
    #[clap(short, long, value_parser)]
    pub video_dir: Option<PathBuf>,

    #[clap(short, long, value_parser)]
    pub player_addr: Option<SocketAddr>,

    #[clap(short, long, value_parser)]
    pub report_addr: Option<SocketAddr>,

    /// Validate the configuration and exit
    #[clap(long)]
    pub check: bool,
}

fn main() -> anyhow::Result<()> {
    // install tracing
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(fmt::Layer::new().pretty().with_writer(std::io::stdout));
    tracing::subscriber::set_global_default(subscriber).expect("Unable to set a global collector");

    // run clap
    let args: Args = Args::parse();

    let mut config = match &args.config {
        Some(path) => KioskConfig::load(path)?,
        None => KioskConfig::default(),
    };
    if let Some(dir) = args.video_dir {
        config.video_dir = dir;
    }
    if let Some(addr) = args.player_addr {
        config.player.addr = addr;
    }
    if let Some(addr) = args.report_addr {
        config.player.report_addr = addr;
    }

    let show = config.show().context("invalid kiosk configuration")?;
    if show.triggers.is_empty() {
        tracing::warn!("no triggers configured, only the idle loop will play");
    }
    if args.check {
        tracing::info!(triggers = show.triggers.len(), "configuration ok");
        return Ok(());
    }

    let shutdown = Shutdown::install()?;
    let player = OscPlayer::connect(config.player.addr, config.player.report_addr)?;

    match config.input.kind {
        InputKind::Gpio => {
            let buttons = SysfsButtons::open(
                &config.input.gpio_root,
                config.input.gpio_base,
                config.input.active_low,
                show.triggers.ids(),
            )?;
            run(show, player, buttons, shutdown);
        }
        InputKind::Grid => {
            let monome = Monome::new(config.input.grid_prefix.clone())
                .map_err(|err| anyhow::anyhow!("no monome grid: {err}"))?;
            let grid = GridButtons::new(monome, show.triggers.ids());
            run(show, player, grid, shutdown);
        }
    }

    tracing::info!("Exiting...");
    Ok(())
}

fn run<T: TriggerSource>(show: Show, player: OscPlayer, triggers: T, shutdown: Shutdown) {
    let pacer = SleepPacer::new(shutdown);
    let mut session = PlaybackSession::new(show, Timing::default(), player, triggers, pacer);
    session.run();
    session.shutdown();
}
