//! Server network layer: TCP connections and the room event loop

use crate::client_manager::ClientManager;
use crate::room_registry::{Delivery, RegistryConfig, RoomRegistry};
use log::{debug, error, info, warn};
use shared::framing::{read_packet, write_packet};
use shared::{now_millis, Packet};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    NewConnection { stream: TcpStream, addr: SocketAddr },
    PacketReceived { client_id: u32, packet: Packet },
    ClientDisconnected { client_id: u32 },
    Shutdown,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub max_clients: usize,
    pub heartbeat_timeout: Duration,
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            max_clients: 256,
            heartbeat_timeout: Duration::from_secs(10),
            registry: RegistryConfig::default(),
        }
    }
}

/// Asks a running server to stop after the message currently being handled.
#[derive(Clone)]
pub struct ShutdownHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Room server: one loop owns the registry and the connection table and
/// handles every event to completion before taking the next.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: ClientManager,
    registry: RoomRegistry,

    listener_task: Option<JoinHandle<()>>,
    reader_tasks: HashMap<u32, JoinHandle<()>>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(config.max_clients, config.heartbeat_timeout),
            registry: RoomRegistry::new(config.registry),
            listener_task: None,
            reader_tasks: HashMap::new(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that accepts incoming connections
    fn spawn_listener(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        self.listener_task = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if server_tx
                            .send(ServerMessage::NewConnection { stream, addr })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Registers a connection and spawns its reader and writer tasks
    fn accept_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (packet_tx, mut packet_rx) = mpsc::unbounded_channel::<Packet>();

        let Some(client_id) = self.clients.add_client(addr, packet_tx) else {
            warn!("Rejecting {}: server full", addr);
            tokio::spawn(async move {
                let mut stream = stream;
                let packet = Packet::Disconnected {
                    reason: "Server full".to_string(),
                };
                let _ = write_packet(&mut stream, &packet).await;
                let _ = stream.shutdown().await;
            });
            return;
        };

        let (read_half, mut write_half) = stream.into_split();

        tokio::spawn(async move {
            while let Some(packet) = packet_rx.recv().await {
                if let Err(e) = write_packet(&mut write_half, &packet).await {
                    debug!("Failed to write to client {}: {}", client_id, e);
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        let server_tx = self.server_tx.clone();
        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            loop {
                match read_packet(&mut reader).await {
                    Ok(packet) => {
                        if server_tx
                            .send(ServerMessage::PacketReceived { client_id, packet })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        if !e.is_eof() {
                            warn!("Dropping client {}: {}", client_id, e);
                        }
                        let _ = server_tx.send(ServerMessage::ClientDisconnected { client_id });
                        break;
                    }
                }
            }
        });
        self.reader_tasks.insert(client_id, reader);

        self.clients
            .send_to(client_id, Packet::Connected { client_id });
    }

    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            for client_id in delivery.recipients {
                if !self.clients.send_to(client_id, delivery.packet.clone()) {
                    debug!("Skipped delivery to departed client {}", client_id);
                }
            }
        }
    }

    /// Processes one command from a client
    fn handle_packet(&mut self, client_id: u32, packet: Packet) {
        if !self.clients.contains(client_id) {
            return;
        }
        self.clients.touch(client_id);

        match packet {
            Packet::JoinRoom { room_id, name } => {
                match self.registry.join(&room_id, client_id, &name) {
                    Ok(deliveries) => self.dispatch(deliveries),
                    Err(e) => {
                        info!("Client {} could not join {}: {}", client_id, room_id, e);
                        self.clients.send_to(
                            client_id,
                            Packet::ErrorMsg {
                                message: e.to_string(),
                            },
                        );
                    }
                }
            }

            Packet::ToggleReady { room_id } => {
                let deliveries = self.registry.toggle_ready(&room_id, client_id);
                self.dispatch(deliveries);
            }

            Packet::StartGame { room_id } => {
                let deliveries = self.registry.start(&room_id, now_millis());
                self.dispatch(deliveries);
            }

            Packet::UpdatePlayer {
                room_id,
                score,
                status,
            } => {
                let deliveries = self
                    .registry
                    .update_player(&room_id, client_id, score, status);
                self.dispatch(deliveries);
            }

            Packet::Heartbeat => {}

            Packet::Disconnect => self.disconnect_client(client_id),

            other => {
                warn!("Unexpected packet from client {}: {:?}", client_id, other);
            }
        }
    }

    fn disconnect_client(&mut self, client_id: u32) {
        self.clients.remove_client(&client_id);
        self.forget_client(client_id);
    }

    /// Drops room membership and reader task of a connection that is already
    /// gone from the connection table.
    fn forget_client(&mut self, client_id: u32) {
        if let Some(reader) = self.reader_tasks.remove(&client_id) {
            reader.abort();
        }
        let deliveries = self.registry.leave(client_id);
        self.dispatch(deliveries);
    }

    fn teardown(&mut self) {
        if let Some(listener) = self.listener_task.take() {
            listener.abort();
        }
        for (_, reader) in self.reader_tasks.drain() {
            reader.abort();
        }

        let rooms = self.registry.clear();
        let connections = self.clients.len();
        self.clients.clear();
        info!(
            "Server stopped: dropped {} rooms and {} connections",
            rooms, connections
        );
    }

    /// Main server loop; returns after a shutdown request
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_listener();

        let mut timeout_interval = interval(Duration::from_secs(1));

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::NewConnection { stream, addr }) => {
                            self.accept_connection(stream, addr);
                        }
                        Some(ServerMessage::PacketReceived { client_id, packet }) => {
                            self.handle_packet(client_id, packet);
                        }
                        Some(ServerMessage::ClientDisconnected { client_id }) => {
                            self.disconnect_client(client_id);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = timeout_interval.tick() => {
                    for client_id in self.clients.check_timeouts() {
                        self.forget_client(client_id);
                    }

                    debug!(
                        "{} clients in {} rooms",
                        self.clients.len(),
                        self.registry.room_count()
                    );
                },
            }
        }

        self.teardown();
        Ok(())
    }
}
