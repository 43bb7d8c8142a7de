//! Fixed-cadence projectile and item simulation. Velocities arrive
//! pre-scaled to one tick, so advancing is a plain addition with no
//! delta-time term.

use crate::world::{DamageOutcome, WorldStore};
use shared::model::{Projectile, Vec3};
use shared::tuning::Tuning;

/// What a simulation tick did, for the session's log lines.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Detonated { pos: Vec3, hits: Vec<SplashHit> },
    Expired { id: u64 },
    ItemRespawned { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplashHit {
    pub target: String,
    pub damage: i32,
    pub killed: bool,
}

/// Advances every projectile one tick, detonates or expires the ones that
/// are due, and brings expired items back. Expiry wins over collision when
/// both apply on the same tick.
pub fn step(world: &mut WorldStore, tuning: &Tuning, now_ms: u64) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let mut survivors = Vec::new();

    for mut projectile in world.take_projectiles() {
        projectile.pos = projectile.pos.add(&projectile.vel);

        if projectile.age_ms(now_ms) > tuning.projectile_ttl_ms {
            events.push(SimEvent::Expired { id: projectile.id });
            continue;
        }

        if projectile.pos.y <= 0.0 || direct_contact(world, &projectile, tuning) {
            let hits = detonate(world, &projectile.pos, tuning);
            events.push(SimEvent::Detonated {
                pos: projectile.pos,
                hits,
            });
            continue;
        }

        survivors.push(projectile);
    }
    world.set_projectiles(survivors);

    for id in world.respawn_due_items(now_ms) {
        events.push(SimEvent::ItemRespawned { id });
    }

    events
}

/// A projectile never triggers on its own launcher; the owner can still be
/// caught by the splash.
fn direct_contact(world: &WorldStore, projectile: &Projectile, tuning: &Tuning) -> bool {
    world.players().values().any(|player| {
        player.id != projectile.owner
            && player.pos.distance(&projectile.pos) < tuning.direct_hit_radius
    })
}

fn detonate(world: &mut WorldStore, at: &Vec3, tuning: &Tuning) -> Vec<SplashHit> {
    let in_radius: Vec<(String, f32)> = world
        .players()
        .values()
        .map(|player| (player.id.clone(), player.pos.distance(at)))
        .filter(|(_, dist)| *dist < tuning.rocket_splash_radius)
        .collect();

    let mut hits = Vec::new();
    for (target, dist) in in_radius {
        let damage = splash_damage(dist, tuning);
        if damage == 0 {
            continue;
        }
        if let Some(outcome) = world.apply_damage(&target, damage) {
            hits.push(SplashHit {
                target,
                damage,
                killed: matches!(outcome, DamageOutcome::Respawned { .. }),
            });
        }
    }
    hits
}

/// Linear falloff from full damage at the centre to zero at the edge,
/// floored to whole points.
fn splash_damage(dist: f32, tuning: &Tuning) -> i32 {
    let scaled = tuning.rocket_damage as f32 * (1.0 - dist / tuning.rocket_splash_radius);
    (scaled.floor() as i32).max(0)
}
