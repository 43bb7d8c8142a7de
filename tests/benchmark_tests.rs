//! Performance benchmarks for the validation, simulation, and snapshot paths

use host::session::{HostConfig, HostSession};
use host::validator::{check_hit, check_movement};
use host::world::WorldStore;
use shared::clock::SystemClock;
use shared::codec::{self, Message, PackedPlayer, StatePayload};
use shared::model::{Vec3, WeaponKind, MAX_HEALTH};
use shared::transport::{Channel, ChannelError, ChannelEvent};
use shared::tuning::Tuning;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Benchmarks movement claim validation
#[test]
fn benchmark_movement_validation() {
    let tuning = Tuning::default();
    let mut world = WorldStore::with_seed(1);
    world.insert_player(&bare_row("alice", Vec3::new(0.0, 1.0, 0.0)));
    let claim = bare_row("alice", Vec3::new(0.5, 1.0, 0.5));

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = check_movement(&world, &claim, &tuning);
    }

    let duration = start.elapsed();
    println!(
        "Movement validation: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks hit claim validation including the aim cone math
#[test]
fn benchmark_hit_validation() {
    let tuning = Tuning::default();
    let mut world = WorldStore::with_seed(1);
    world.insert_player(&bare_row("alice", Vec3::new(0.0, 1.0, 0.0)));
    world.insert_player(&bare_row("bob", Vec3::new(0.0, 1.0, 10.0)));

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = check_hit(&world, "alice", "bob", &tuning, 1_000);
    }

    let duration = start.elapsed();
    println!(
        "Hit validation: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 200ms for 100k iterations
    assert!(duration.as_millis() < 200);
}

/// Benchmarks packing a full snapshot from the canonical world
#[test]
fn benchmark_snapshot_packing() {
    let mut world = WorldStore::with_seed(1);
    for i in 0..16 {
        world.insert_player(&bare_row(
            &format!("p{}", i),
            Vec3::new(i as f32 * 3.0, 1.0, 0.0),
        ));
    }

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let seq = world.next_broadcast_seq();
        let rows = world.pack_players(seq);
        assert_eq!(rows.len(), 16);
    }

    let duration = start.elapsed();
    println!(
        "Snapshot packing: {} snapshots of 16 rows in {:?} ({:.2} μs/snapshot)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks snapshot serialization round-trips at arena scale
#[test]
fn benchmark_snapshot_serialization() {
    let mut world = WorldStore::with_seed(1);
    for i in 0..16 {
        world.insert_player(&bare_row(
            &format!("p{}", i),
            Vec3::new(i as f32 * 3.0, 1.0, 0.0),
        ));
    }
    let message = Message::StateUpdate(StatePayload::Snapshot(world.pack_players(1)));

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = codec::encode(&message).unwrap();
        let _decoded = codec::decode(&bytes).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks the projectile simulation step with a busy sky
#[test]
fn benchmark_simulation_step() {
    let tuning = Tuning::default();
    let mut world = WorldStore::with_seed(1);
    for i in 0..8 {
        world.insert_player(&bare_row(
            &format!("p{}", i),
            Vec3::new(10.0 + i as f32 * 4.0, 1.0, 0.0),
        ));
    }
    for i in 0..32 {
        world.spawn_projectile(
            "p0",
            Vec3::new(-20.0, 5.0, i as f32),
            Vec3::new(0.0, 0.0, 0.32),
            1_000,
        );
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        host::simulation::step(&mut world, &tuning, 1_016);
    }

    let duration = start.elapsed();
    println!(
        "Simulation step: {} projectiles × {} ticks in {:?} ({:.2} μs/tick)",
        world.projectiles().len(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(world.projectiles().len(), 32);
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks replica reconciliation of full snapshots
#[test]
fn benchmark_replica_reconciliation() {
    use client::replica::Replica;

    let mut world = WorldStore::with_seed(1);
    world.insert_player(&bare_row("me", Vec3::new(0.0, 1.0, 0.0)));
    for i in 0..15 {
        world.insert_player(&bare_row(
            &format!("p{}", i),
            Vec3::new(i as f32 * 3.0, 1.0, 0.0),
        ));
    }

    let mut replica = Replica::new("me".to_string(), Vec3::new(0.0, 1.0, 0.0), Tuning::default());

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let seq = world.next_broadcast_seq();
        replica.apply_snapshot(world.pack_players(seq));
    }

    let duration = start.elapsed();
    println!(
        "Replica reconciliation: {} snapshots of 16 rows in {:?} ({:.2} μs/snapshot)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(replica.players().len(), 16);
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Stress tests the full authority loop with eight claiming peers
#[test]
fn stress_test_rapid_claim_rounds() {
    let config = HostConfig {
        player_id: None,
        tuning: Tuning::default(),
    };
    let (mut host, _view) = HostSession::new(config, Arc::new(SystemClock));

    let mut labels = Vec::new();
    for i in 0..8 {
        let label = format!("10.0.0.{}:6000", i);
        let (channel, _log) = MockChannel::create(&label);
        host.handle_event(
            ChannelEvent::Connected {
                peer: label.clone(),
                channel,
            },
            0,
        );
        labels.push(label);
    }

    let rounds = 1_000u64;
    let start = Instant::now();

    for round in 0..rounds {
        let now = 1_000 + round * 16;
        for (i, label) in labels.iter().enumerate() {
            let mut row = bare_row(
                &format!("p{}", i),
                Vec3::new(i as f32 * 2.0, 1.0, (round as f32) * 0.05),
            );
            row.seq = round + 1;
            let claim = Message::StateUpdate(StatePayload::Own(row));
            host.handle_event(
                ChannelEvent::Data {
                    peer: label.clone(),
                    bytes: codec::encode(&claim).unwrap(),
                },
                now,
            );
        }
        host.tick(now);
        host.broadcast();
    }

    let duration = start.elapsed();
    println!(
        "Authority loop: 8 peers × {} rounds in {:?} ({:.2} μs/round)",
        rounds,
        duration,
        duration.as_micros() as f64 / rounds as f64
    );

    assert_eq!(host.world().players().len(), 8);
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

// HELPER FUNCTIONS

fn bare_row(id: &str, pos: Vec3) -> PackedPlayer {
    PackedPlayer {
        id: id.to_string(),
        pos,
        yaw: 0.0,
        health: MAX_HEALTH,
        seq: 1,
        weapon: WeaponKind::Pistol,
        rocket_ammo: 0,
        color: None,
    }
}

struct MockChannel {
    label: String,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockChannel {
    fn create(label: &str) -> (Box<dyn Channel>, Arc<Mutex<Vec<Vec<u8>>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let channel = Box::new(Self {
            label: label.to_string(),
            sent: sent.clone(),
        });
        (channel, sent)
    }
}

impl Channel for MockChannel {
    fn send(&self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn peer(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        true
    }
}
