//! Integration tests for the room server and team clients
//!
//! These tests run a real server on a loopback port and talk to it through
//! the client transport, raw framed sockets, or complete client apps.

use client::network::{SessionTransport, TransportEvent};
use server::network::{Server, ServerConfig, ShutdownHandle};
use server::room_registry::RegistryConfig;
use shared::{Packet, PlayerStatus};
use std::time::Duration;
use tokio::time::timeout;
use tokio_test::assert_ok;

const ROOM: &str = "TEAM_ARENA_01";

async fn start_server(required_players: usize, start_delay: Duration) -> (String, ShutdownHandle) {
    let config = ServerConfig {
        addr: "127.0.0.1:0".to_string(),
        max_clients: 64,
        heartbeat_timeout: Duration::from_secs(10),
        registry: RegistryConfig {
            required_players,
            start_delay,
        },
    };
    let mut server = Server::new(config).await.expect("failed to bind server");
    let addr = server.local_addr().to_string();
    let handle = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, handle)
}

/// Waits for the first event matching `pred`, skipping the rest
async fn wait_for<F>(transport: &mut SessionTransport, mut pred: F) -> TransportEvent
where
    F: FnMut(&TransportEvent) -> bool,
{
    timeout(Duration::from_secs(3), async {
        loop {
            match transport.recv_event().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("transport closed while waiting"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn connect(addr: &str) -> (SessionTransport, u32) {
    let mut transport = assert_ok!(SessionTransport::connect(addr).await);
    match wait_for(&mut transport, |e| matches!(e, TransportEvent::Connected { .. })).await {
        TransportEvent::Connected { client_id } => (transport, client_id),
        _ => unreachable!(),
    }
}

fn join(name: &str) -> Packet {
    Packet::JoinRoom {
        room_id: ROOM.to_string(),
        name: name.to_string(),
    }
}

fn toggle_ready() -> Packet {
    Packet::ToggleReady {
        room_id: ROOM.to_string(),
    }
}

fn start_game() -> Packet {
    Packet::StartGame {
        room_id: ROOM.to_string(),
    }
}

/// Connects `count` clients and joins them to the room one at a time, so
/// every roster snapshot is observed in order.
async fn fill_room(addr: &str, count: usize) -> Vec<(SessionTransport, u32)> {
    let mut clients = Vec::new();
    for i in 0..count {
        let (mut transport, id) = connect(addr).await;
        assert_ok!(transport.send(join(&format!("agent-{}", i))));
        wait_for(&mut transport, |e| {
            matches!(e, TransportEvent::RoomUpdate { players } if players.len() == i + 1)
        })
        .await;
        clients.push((transport, id));
    }
    clients
}

/// ROOM LIFECYCLE TESTS
mod room_tests {
    use super::*;

    /// Nine of ten ready cannot start; the tenth makes everyone start together
    #[tokio::test]
    async fn start_requires_full_ready_roster() {
        let (addr, handle) = start_server(10, Duration::from_millis(3000)).await;
        let mut clients = fill_room(&addr, 10).await;

        for (i, (transport, _)) in clients.iter_mut().enumerate().take(9) {
            assert_ok!(transport.send(toggle_ready()));
            wait_for(transport, |e| {
                matches!(e, TransportEvent::RoomUpdate { players }
                    if players.iter().filter(|p| p.is_ready).count() == i + 1)
            })
            .await;
        }

        assert_ok!(clients[0].0.send(start_game()));
        tokio::time::sleep(Duration::from_millis(300)).await;
        for (transport, _) in clients.iter_mut() {
            let started = transport
                .poll_events()
                .into_iter()
                .any(|e| matches!(e, TransportEvent::GameStarted { .. }));
            assert!(!started, "room started with a player not ready");
        }

        assert_ok!(clients[9].0.send(toggle_ready()));
        wait_for(&mut clients[9].0, |e| {
            matches!(e, TransportEvent::RoomUpdate { players } if players.iter().all(|p| p.is_ready))
        })
        .await;
        assert_ok!(clients[9].0.send(start_game()));

        let mut start_times = Vec::new();
        for (transport, _) in clients.iter_mut() {
            match wait_for(transport, |e| matches!(e, TransportEvent::GameStarted { .. })).await {
                TransportEvent::GameStarted { start_time } => start_times.push(start_time),
                _ => unreachable!(),
            }
        }

        assert_eq!(start_times.len(), 10);
        assert!(start_times.windows(2).all(|w| w[0] == w[1]));
        assert!(start_times[0] > shared::now_millis());

        handle.shutdown();
    }

    #[tokio::test]
    async fn full_room_rejects_joiner() {
        let (addr, handle) = start_server(2, Duration::from_millis(3000)).await;
        let _clients = fill_room(&addr, 2).await;

        let (mut late, _) = connect(&addr).await;
        assert_ok!(late.send(join("late")));

        match wait_for(&mut late, |e| matches!(e, TransportEvent::Error { .. })).await {
            TransportEvent::Error { message } => {
                assert_eq!(message, "Team is full (max 2 agents).")
            }
            _ => unreachable!(),
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn started_room_rejects_joiner() {
        let (addr, handle) = start_server(1, Duration::from_millis(100)).await;
        let mut clients = fill_room(&addr, 1).await;
        let (transport, _) = &mut clients[0];

        assert_ok!(transport.send(toggle_ready()));
        wait_for(transport, |e| {
            matches!(e, TransportEvent::RoomUpdate { players } if players[0].is_ready)
        })
        .await;
        assert_ok!(transport.send(start_game()));
        wait_for(transport, |e| matches!(e, TransportEvent::GameStarted { .. })).await;

        let (mut late, _) = connect(&addr).await;
        assert_ok!(late.send(join("late")));
        match wait_for(&mut late, |e| matches!(e, TransportEvent::Error { .. })).await {
            TransportEvent::Error { message } => {
                assert_eq!(message, "Mission already in progress. Access denied.")
            }
            _ => unreachable!(),
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn disconnect_shrinks_roster() {
        let (addr, handle) = start_server(5, Duration::from_millis(3000)).await;
        let mut clients = fill_room(&addr, 3).await;

        let (mut leaver, leaver_id) = clients.pop().unwrap();
        leaver.disconnect();
        drop(leaver);

        for (transport, _) in clients.iter_mut() {
            match wait_for(transport, |e| {
                matches!(e, TransportEvent::RoomUpdate { players } if players.len() == 2)
            })
            .await
            {
                TransportEvent::RoomUpdate { players } => {
                    assert!(players.iter().all(|p| p.id != leaver_id));
                }
                _ => unreachable!(),
            }
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn score_updates_reach_roommates() {
        let (addr, handle) = start_server(2, Duration::from_millis(3000)).await;
        let mut clients = fill_room(&addr, 2).await;
        let sender_id = clients[0].1;

        assert_ok!(clients[0].0.send(Packet::UpdatePlayer {
            room_id: ROOM.to_string(),
            score: 17,
            status: PlayerStatus::Dead,
        }));

        match wait_for(&mut clients[1].0, |e| {
            matches!(e, TransportEvent::PlayerUpdated { .. })
        })
        .await
        {
            TransportEvent::PlayerUpdated { player } => {
                assert_eq!(player.id, sender_id);
                assert_eq!(player.score, 17);
                assert_eq!(player.status, PlayerStatus::Dead);
            }
            _ => unreachable!(),
        }

        handle.shutdown();
    }
}

/// WIRE FORMAT TESTS
mod protocol_tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// A frame is a big-endian length followed by the bincode payload
    #[tokio::test]
    async fn hand_built_frame_is_accepted() {
        let (addr, handle) = start_server(4, Duration::from_millis(3000)).await;
        let mut stream = TcpStream::connect(&addr).await.unwrap();

        let len = stream.read_u32().await.unwrap();
        let mut buf = vec![0u8; len as usize];
        stream.read_exact(&mut buf).await.unwrap();
        let connected: Packet = bincode::deserialize(&buf).unwrap();
        assert!(matches!(connected, Packet::Connected { .. }));

        let payload = bincode::serialize(&join("raw")).unwrap();
        stream.write_u32(payload.len() as u32).await.unwrap();
        stream.write_all(&payload).await.unwrap();

        let len = stream.read_u32().await.unwrap();
        let mut buf = vec![0u8; len as usize];
        stream.read_exact(&mut buf).await.unwrap();
        match bincode::deserialize::<Packet>(&buf).unwrap() {
            Packet::RoomUpdate { players } => assert_eq!(players[0].name, "raw"),
            other => panic!("Expected RoomUpdate, got {:?}", other),
        }

        handle.shutdown();
    }

    /// A malformed frame drops only the connection that sent it
    #[tokio::test]
    async fn garbage_frame_drops_only_sender() {
        let (addr, handle) = start_server(4, Duration::from_millis(3000)).await;
        let mut clients = fill_room(&addr, 1).await;

        let mut raw = TcpStream::connect(&addr).await.unwrap();
        let len = raw.read_u32().await.unwrap();
        let mut buf = vec![0u8; len as usize];
        raw.read_exact(&mut buf).await.unwrap();

        let payload = bincode::serialize(&join("raw")).unwrap();
        raw.write_u32(payload.len() as u32).await.unwrap();
        raw.write_all(&payload).await.unwrap();
        wait_for(&mut clients[0].0, |e| {
            matches!(e, TransportEvent::RoomUpdate { players } if players.len() == 2)
        })
        .await;

        raw.write_u32(4).await.unwrap();
        raw.write_all(&[0xde, 0xad, 0xbe, 0xef]).await.unwrap();

        wait_for(&mut clients[0].0, |e| {
            matches!(e, TransportEvent::RoomUpdate { players } if players.len() == 1)
        })
        .await;

        // The remaining client can still talk to the room.
        assert_ok!(clients[0].0.send(toggle_ready()));
        wait_for(&mut clients[0].0, |e| {
            matches!(e, TransportEvent::RoomUpdate { players } if players[0].is_ready)
        })
        .await;

        handle.shutdown();
    }
}

/// END-TO-END TEAM ROUND
mod team_round_tests {
    use super::*;
    use client::app::{App, AppConfig};
    use client::hud::LogHud;
    use client::session::{Mode, SessionConfig, SessionStatus};

    fn team_app(addr: &str, name: &str, seed: u64) -> App<LogHud> {
        let config = AppConfig {
            mode: Mode::Team,
            server: addr.to_string(),
            name: name.to_string(),
            seed,
            required_players: 2,
            accuracy: 1.0,
            tick_interval: Duration::from_millis(5),
            session: SessionConfig {
                duration_secs: 1,
                seed,
                ..SessionConfig::default()
            },
        };
        App::new(config, LogHud::new())
    }

    /// Two clients ready up, start together and both end on the leaderboard
    #[tokio::test]
    async fn two_clients_play_a_round() {
        let (addr, handle) = start_server(2, Duration::from_millis(200)).await;

        let mut neo = team_app(&addr, "Neo", 1);
        let mut trinity = team_app(&addr, "Trinity", 2);

        let (a, b) = timeout(Duration::from_secs(10), async {
            tokio::join!(neo.run(), trinity.run())
        })
        .await
        .expect("round did not finish");

        let a = assert_ok!(a);
        let b = assert_ok!(b);

        for frame in [&a, &b] {
            assert_eq!(frame.status, SessionStatus::Leaderboard);
            assert!(frame.roster.windows(2).all(|w| w[0].score >= w[1].score));

            let mut names: Vec<&str> = frame.roster.iter().map(|p| p.name.as_str()).collect();
            names.sort();
            assert_eq!(names, vec!["Neo", "Trinity"]);
            assert!(frame
                .roster
                .iter()
                .all(|p| p.status != PlayerStatus::Alive));
        }

        handle.shutdown();
    }
}
