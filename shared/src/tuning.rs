//! Authority policy knobs. The anti-cheat thresholds are heuristics tuned
//! against the tick rate, not derived truths, so everything here is
//! overridable from the binaries' command lines.

use crate::model::{forward_from_yaw, Vec3, WeaponKind};
use std::time::Duration;

pub const DEFAULT_HOST_ADDR: &str = "127.0.0.1:5600";

/// A peer silent for this long is synthesized a disconnect by the adapter.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Tuning {
    /// Largest accepted displacement between two consecutive claims.
    pub max_move_per_update: f32,
    /// Planar cap on hit-claim distance.
    pub max_reach: f32,
    /// Cosine of the aim-cone half angle; 0.5 is a 60 degree cone.
    pub aim_cone_cos: f32,
    pub pickup_radius: f32,
    pub pistol_damage: i32,
    pub pistol_cooldown_ms: u64,
    pub rocket_damage: i32,
    pub rocket_cooldown_ms: u64,
    /// Rocket flight speed in units per second.
    pub rocket_speed: f32,
    pub rocket_splash_radius: f32,
    /// Distance at which a rocket detonates on a non-owner player.
    pub direct_hit_radius: f32,
    pub projectile_ttl_ms: u64,
    pub item_respawn_ms: u64,
    pub rocket_ammo_per_pickup: u32,
    pub health_per_pickup: i32,
    /// Self-position divergence beyond which the replica snaps to the
    /// authority (respawns and teleports).
    pub snap_distance: f32,
    pub sim_tick_ms: u64,
    pub broadcast_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_move_per_update: 1.0,
            max_reach: 60.0,
            aim_cone_cos: 0.5,
            pickup_radius: 1.5,
            pistol_damage: 15,
            pistol_cooldown_ms: 400,
            rocket_damage: 80,
            rocket_cooldown_ms: 1500,
            rocket_speed: 20.0,
            rocket_splash_radius: 6.0,
            direct_hit_radius: 1.0,
            projectile_ttl_ms: 3000,
            item_respawn_ms: 10_000,
            rocket_ammo_per_pickup: 5,
            health_per_pickup: 25,
            snap_distance: 8.0,
            sim_tick_ms: 16,
            broadcast_ms: 30,
        }
    }
}

impl Tuning {
    pub fn damage(&self, weapon: WeaponKind) -> i32 {
        match weapon {
            WeaponKind::Pistol => self.pistol_damage,
            WeaponKind::Rocket => self.rocket_damage,
        }
    }

    pub fn cooldown_ms(&self, weapon: WeaponKind) -> u64 {
        match weapon {
            WeaponKind::Pistol => self.pistol_cooldown_ms,
            WeaponKind::Rocket => self.rocket_cooldown_ms,
        }
    }

    /// Per-tick rocket displacement along a yaw. The simulation advances
    /// projectiles by their velocity once per tick, so the speed is
    /// pre-scaled here by the tick length.
    pub fn rocket_step(&self, yaw: f32) -> Vec3 {
        forward_from_yaw(yaw).scale(self.rocket_speed * self.sim_tick_ms as f32 / 1000.0)
    }
}
