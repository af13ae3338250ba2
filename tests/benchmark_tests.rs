//! Performance benchmarks for the per-tick and per-command hot paths

use client::game::{SimEvent, Simulation};
use client::level_gen::{self, LevelParams};
use client::world::World;
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::room_registry::{RegistryConfig, RoomRegistry};
use shared::framing::{read_packet, write_packet};
use shared::{Packet, PlayerStatus, Rect};
use std::time::{Duration, Instant};

/// Benchmarks the padded hit-box test used for crate collisions
#[test]
fn benchmark_rect_intersection() {
    let runner = Rect::new(100.0, 290.0, 30.0, 30.0);
    let obstacle = Rect::new(125.0, 280.0, 30.0, 40.0);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = runner.intersects(&obstacle.padded(-5.0));
    }

    let duration = start.elapsed();
    println!(
        "Rect intersection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 100);
}

/// Benchmarks generating a long stretch of level ahead of the runner
#[test]
fn benchmark_level_generation() {
    let iterations = 100;
    let horizon = 50_000.0;
    let start = Instant::now();

    for seed in 0..iterations {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(seed);
        level_gen::extend_to(&mut world, &mut rng, &LevelParams::default(), horizon);
        assert!(world.frontier() >= horizon);
    }

    let duration = start.elapsed();
    println!(
        "Level generation: {} levels in {:?} ({:.2} μs/level)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks full simulation steps, restarting whenever the runner dies
#[test]
fn benchmark_simulation_steps() {
    let iterations = 20_000;
    let mut sim = Simulation::new(1, LevelParams::default(), 6);
    let mut restarts = 0u64;
    let start = Instant::now();

    for _ in 0..iterations {
        let events = sim.step();
        if events.iter().any(|e| matches!(e, SimEvent::Died(_))) {
            restarts += 1;
            sim = Simulation::new(1 + restarts, LevelParams::default(), 6);
        }
    }

    let duration = start.elapsed();
    println!(
        "Simulation: {} ticks in {:?} ({:.2} μs/tick, {} restarts)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        restarts
    );

    // A tick has to fit comfortably in a 16 ms frame
    assert!(duration < Duration::from_millis(16) * 100);
}

/// Benchmarks a complete room lifecycle through the registry
#[test]
fn benchmark_room_lifecycle() {
    let iterations = 1_000u32;
    let mut registry = RoomRegistry::new(RegistryConfig::default());
    let players = registry.config().required_players as u32;
    let start = Instant::now();

    for room in 0..iterations {
        let room_id = format!("room-{}", room);
        let base = room * players;

        for id in base..base + players {
            registry.join(&room_id, id, "").unwrap();
        }
        for id in base..base + players {
            registry.toggle_ready(&room_id, id);
        }
        assert_eq!(registry.start(&room_id, 0).len(), 1);
        for id in base..base + players {
            registry.update_player(&room_id, id, 3, PlayerStatus::Finished);
        }
        for id in base..base + players {
            registry.leave(id);
        }
    }

    let duration = start.elapsed();
    println!(
        "Room lifecycle: {} rooms in {:?} ({:.2} μs/room)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(registry.room_count(), 0);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks framing packets through an in-memory pipe
#[tokio::test]
async fn benchmark_packet_framing() {
    let (mut a, mut b) = tokio::io::duplex(64 * 1024);
    let packet = Packet::UpdatePlayer {
        room_id: "TEAM_ARENA_01".to_string(),
        score: 42,
        status: PlayerStatus::Alive,
    };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        write_packet(&mut a, &packet).await.unwrap();
        let received = read_packet(&mut b).await.unwrap();
        assert_eq!(received, packet);
    }

    let duration = start.elapsed();
    println!(
        "Packet framing: {} round trips in {:?} ({:.2} μs/packet)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}
