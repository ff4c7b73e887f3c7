//! Remote video player controlled over OSC.
//!
//! Commands go out to the player address; the player reports its state back
//! to a local socket that a background thread listens on.

pub mod message;
mod osc_recv;
mod osc_send;

use std::net::{SocketAddr, UdpSocket};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

use anyhow::Context;

use crate::error::{Error, Result};
use crate::media::{ClipRef, MediaBackend, MediaHandle, PlayerState, Volume};
use crate::player::message::{PlayerCommand, PlayerReport};
use crate::player::osc_recv::OscRecv;
use crate::player::osc_send::OscSend;

#[derive(Debug)]
pub struct OscPlayer {
    send: OscSend,
    rx: Receiver<PlayerReport>,
    current: Option<i32>,
    next_media: i32,
    state: PlayerState,
    reported_volume: Volume,
    // what we asked for wins over reports still in flight
    requested_volume: Option<Volume>,
}

impl OscPlayer {
    pub fn connect(player_addr: SocketAddr, report_addr: SocketAddr) -> anyhow::Result<Self> {
        let (tx, rx) = channel();
        let sock = UdpSocket::bind(report_addr)
            .with_context(|| format!("binding report socket {report_addr}"))?;
        thread::spawn(move || {
            let r = OscRecv::new(tx, sock);
            r.run();
        });

        let bind_addr: SocketAddr = "0.0.0.0:0".parse()?;
        let send = OscSend::new(bind_addr, player_addr)
            .with_context(|| format!("opening command socket for {player_addr}"))?;

        Ok(Self::with_parts(send, rx))
    }

    fn with_parts(send: OscSend, rx: Receiver<PlayerReport>) -> Self {
        Self {
            send,
            rx,
            current: None,
            next_media: 0,
            state: PlayerState::Stopped,
            reported_volume: Volume::MAX,
            requested_volume: None,
        }
    }

    fn drain_reports(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(PlayerReport::State { state, media }) => {
                    if media.is_none() || media == self.current {
                        self.state = state;
                    } else {
                        tracing::trace!(?media, current = ?self.current, "stale state report");
                    }
                }
                Ok(PlayerReport::Volume(level)) => self.reported_volume = Volume::new(level),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state != PlayerState::Other {
                        tracing::warn!("player report channel closed");
                    }
                    self.state = PlayerState::Other;
                    break;
                }
            }
        }
    }

    fn send_best_effort(&self, command: PlayerCommand) {
        if let Err(err) = self.send.send(command) {
            tracing::warn!(%err, "player unreachable");
        }
    }
}

impl MediaBackend for OscPlayer {
    fn load(&mut self, clip: &ClipRef) -> Result<MediaHandle> {
        if !clip.path().is_file() {
            return Err(Error::media_load(clip, "no such file"));
        }
        self.drain_reports();
        self.next_media = self.next_media.wrapping_add(1);
        let media = self.next_media;
        self.send
            .send(PlayerCommand::Load {
                path: clip.path().to_string_lossy().into_owned(),
                media,
            })
            .map_err(|err| Error::media_load(clip, err))?;
        self.current = Some(media);
        self.state = PlayerState::Other;
        Ok(MediaHandle {
            id: media,
            clip: clip.clone(),
        })
    }

    fn play(&mut self, media: &MediaHandle) -> Result<()> {
        self.send
            .send(PlayerCommand::Play(media.id))
            .map_err(|err| Error::media_load(&media.clip, err))?;
        // assume playing until the player says otherwise
        self.state = PlayerState::Playing;
        Ok(())
    }

    fn stop(&mut self) {
        self.send_best_effort(PlayerCommand::Stop);
        self.state = PlayerState::Stopped;
    }

    fn state(&mut self) -> PlayerState {
        self.drain_reports();
        self.state
    }

    fn volume(&mut self) -> Volume {
        self.drain_reports();
        self.requested_volume.unwrap_or(self.reported_volume)
    }

    fn set_volume(&mut self, volume: Volume) {
        self.send_best_effort(PlayerCommand::Volume(volume.level()));
        self.requested_volume = Some(volume);
    }

    fn set_fullscreen(&mut self, on: bool) {
        self.send_best_effort(PlayerCommand::Fullscreen(on));
    }
}
