use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::player::message::PlayerCommand;

#[derive(Debug)]
pub struct OscSend {
    sock: UdpSocket,
    to_addr: SocketAddr,
}

impl OscSend {
    pub(crate) fn new(bind_addr: SocketAddr, to_addr: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            sock: UdpSocket::bind(bind_addr)?,
            to_addr,
        })
    }

    fn send_message(&self, addr: impl Into<String>, args: Vec<OscType>) -> io::Result<()> {
        let msg_buf = encoder::encode(&OscPacket::Message(OscMessage {
            addr: addr.into(),
            args,
        }))
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, format!("{err:?}")))?;
        self.sock.send_to(&msg_buf, self.to_addr)?;
        Ok(())
    }

    pub(crate) fn send(&self, command: PlayerCommand) -> io::Result<()> {
        tracing::trace!(?command, "send");
        match command {
            PlayerCommand::Load { path, media } => {
                self.send_message("/load", vec![OscType::String(path), OscType::Int(media)])
            }
            PlayerCommand::Play(media) => self.send_message("/play", vec![OscType::Int(media)]),
            PlayerCommand::Stop => self.send_message("/stop", vec![]),
            PlayerCommand::Volume(level) => {
                self.send_message("/volume", vec![OscType::Int(level as i32)])
            }
            PlayerCommand::Fullscreen(on) => {
                self.send_message("/fullscreen", vec![OscType::Bool(on)])
            }
        }
    }
}
