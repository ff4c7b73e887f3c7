use crate::media::PlayerState;
use crate::player::message::PlayerReport;
use rosc::OscPacket::{Bundle, Message};
use rosc::{OscBundle, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;
use std::sync::mpsc::Sender;

/// Listens for state reports from the player and forwards them to the backend.
#[derive(Debug)]
pub(crate) struct OscRecv {
    pub(crate) tx: Sender<PlayerReport>,
    sock: UdpSocket,
}

impl OscRecv {
    pub(crate) fn new(tx: Sender<PlayerReport>, sock: UdpSocket) -> Self {
        Self { tx, sock }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn run(self) {
        let mut buf = [0u8; 8192];

        loop {
            match self.sock.recv_from(&mut buf) {
                Ok((size, _addr)) => match rosc::decoder::decode_udp(&buf[..size]) {
                    Ok((_, packet)) => {
                        if !self.handle_packet(packet) {
                            tracing::debug!("backend gone, stopping receiver");
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(?err, "undecodable player report"),
                },
                Err(err) => {
                    tracing::error!(%err, "error receiving from socket");
                    break;
                }
            }
        }
    }

    /// Returns false once nobody is listening for reports.
    fn handle_packet(&self, packet: OscPacket) -> bool {
        match packet {
            Bundle(bundle) => self.handle_bundle(bundle),
            Message(msg) => match Self::parse_report(&msg) {
                Some(report) => self.tx.send(report).is_ok(),
                None => {
                    tracing::trace!(addr = %msg.addr, "ignoring message");
                    true
                }
            },
        }
    }

    fn handle_bundle(&self, bundle: OscBundle) -> bool {
        bundle
            .content
            .into_iter()
            .all(|packet| self.handle_packet(packet))
    }

    pub(crate) fn parse_report(msg: &OscMessage) -> Option<PlayerReport> {
        match msg.addr.as_str() {
            "/state" => {
                let state = match msg.args.first()? {
                    OscType::String(s) => Self::parse_state(s),
                    _ => return None,
                };
                let media = match msg.args.get(1) {
                    Some(OscType::Int(id)) => Some(*id),
                    _ => None,
                };
                Some(PlayerReport::State { state, media })
            }
            "/volume" => match msg.args.first()? {
                OscType::Int(level) => Some(PlayerReport::Volume(*level)),
                OscType::Float(level) => Some(PlayerReport::Volume(level.round() as i32)),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_state(s: &str) -> PlayerState {
        match s {
            "playing" => PlayerState::Playing,
            "ended" => PlayerState::Ended,
            "stopped" => PlayerState::Stopped,
            _ => PlayerState::Other,
        }
    }
}
