//! Client network layer: a typed adapter over one TCP connection
//!
//! The transport owns a reader task and a writer task. Commands go in through
//! [`SessionTransport::send`]; server packets come out as [`TransportEvent`]s.
//! The writer also emits a heartbeat every [`HEARTBEAT_INTERVAL`] so the
//! server can tell a quiet client from a dead one.

use log::{debug, info, warn};
use shared::framing::{read_packet, write_packet};
use shared::{Packet, Player};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Server-originated events, as the session sees them
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected { client_id: u32 },
    RoomUpdate { players: Vec<Player> },
    GameStarted { start_time: u64 },
    PlayerUpdated { player: Player },
    Error { message: String },
    Disconnected { reason: String },
}

impl TransportEvent {
    /// Maps a server packet to an event. Client-to-server packets yield `None`.
    pub fn from_packet(packet: Packet) -> Option<Self> {
        match packet {
            Packet::Connected { client_id } => Some(TransportEvent::Connected { client_id }),
            Packet::RoomUpdate { players } => Some(TransportEvent::RoomUpdate { players }),
            Packet::GameStarted { start_time } => Some(TransportEvent::GameStarted { start_time }),
            Packet::PlayerUpdated { player } => Some(TransportEvent::PlayerUpdated { player }),
            Packet::ErrorMsg { message } => Some(TransportEvent::Error { message }),
            Packet::Disconnected { reason } => Some(TransportEvent::Disconnected { reason }),
            Packet::JoinRoom { .. }
            | Packet::ToggleReady { .. }
            | Packet::StartGame { .. }
            | Packet::UpdatePlayer { .. }
            | Packet::Heartbeat
            | Packet::Disconnect => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection closed")]
    Closed,
}

/// One live connection to the room server
pub struct SessionTransport {
    outgoing: Option<mpsc::UnboundedSender<Packet>>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

impl SessionTransport {
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle: {}", e);
        }
        info!("Connected to {}", addr);

        let (read_half, mut write_half) = stream.into_split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Packet>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(async move {
            let mut heartbeat = interval(HEARTBEAT_INTERVAL);
            loop {
                let packet = tokio::select! {
                    packet = outgoing_rx.recv() => match packet {
                        Some(packet) => packet,
                        None => break,
                    },
                    _ = heartbeat.tick() => Packet::Heartbeat,
                };

                if let Err(e) = write_packet(&mut write_half, &packet).await {
                    warn!("Failed to send packet: {}", e);
                    break;
                }
                if packet == Packet::Disconnect {
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            loop {
                match read_packet(&mut reader).await {
                    Ok(packet) => {
                        let Some(event) = TransportEvent::from_packet(packet) else {
                            continue;
                        };
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let reason = if e.is_eof() {
                            "connection closed by server".to_string()
                        } else {
                            e.to_string()
                        };
                        let _ = event_tx.send(TransportEvent::Disconnected { reason });
                        break;
                    }
                }
            }
        });

        Ok(Self {
            outgoing: Some(outgoing_tx),
            events: event_rx,
            reader,
            writer: Some(writer),
        })
    }

    /// Queues a packet for the writer task
    pub fn send(&self, packet: Packet) -> Result<(), TransportError> {
        let sender = self.outgoing.as_ref().ok_or(TransportError::Closed)?;
        sender.send(packet).map_err(|_| TransportError::Closed)
    }

    /// Drains every event that has already arrived, without waiting
    pub fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Waits for the next event. Returns `None` once the reader has stopped
    /// and every event has been consumed.
    pub async fn recv_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.outgoing.is_none() || self.reader.is_finished()
    }

    /// Says goodbye to the server and stops reading. The writer is detached:
    /// it flushes what is already queued, closes its half of the socket and
    /// exits on its own, even if the transport is dropped right away.
    pub fn disconnect(&mut self) {
        if let Some(sender) = self.outgoing.take() {
            let _ = sender.send(Packet::Disconnect);
            info!("Disconnecting from server");
        }
        self.writer.take();
        self.reader.abort();
    }
}

impl Drop for SessionTransport {
    fn drop(&mut self) {
        self.outgoing.take();
        self.reader.abort();
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}
