//! Connection tracking for the room server
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Connection lifecycle (connect, disconnect, heartbeat timeout)
//! - Connection id assignment and capacity limits
//! - Routing outbound packets to each connection's writer task
//!
//! Room membership is not tracked here; the room registry owns rosters and
//! refers to connections only by id.

use log::{info, warn};
use shared::Packet;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Outbound half of a connection: packets pushed here are framed and
/// written to the socket by the connection's writer task.
pub type PacketSender = mpsc::UnboundedSender<Packet>;

/// A connected client
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    /// Last time any packet arrived from this client
    pub last_seen: Instant,
    sender: PacketSender,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, sender: PacketSender) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            sender,
        }
    }

    /// Returns true if nothing has been heard from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all open connections
///
/// Ids start at 1 and are never reused within a process, so a stale id held
/// by a roster can never alias a newer connection.
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Registers a new connection
    ///
    /// Returns Some(client_id) if successful, None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, sender: PacketSender) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));

        Some(client_id)
    }

    /// Removes a connection. Dropping its sender lets the writer task finish.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.addr);
            true
        } else {
            false
        }
    }

    /// Refreshes the liveness timestamp of a connection
    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Queues a packet for one connection. Returns false if the id is unknown
    /// or its writer task has already gone away.
    pub fn send_to(&self, client_id: u32, packet: Packet) -> bool {
        match self.clients.get(&client_id) {
            Some(client) => {
                if client.sender.send(packet).is_err() {
                    warn!("Writer for client {} is closed", client_id);
                    return false;
                }
                true
            }
            None => false,
        }
    }

    /// Collects and removes connections that missed their heartbeats
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(self.timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            warn!("Client {} timed out", client_id);
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn contains(&self, client_id: u32) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Drops every connection
    pub fn clear(&mut self) {
        self.clients.clear();
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
