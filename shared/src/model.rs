use serde::{Deserialize, Serialize};

pub const WORLD_SIZE: f32 = 100.0;
pub const PLAYER_RADIUS: f32 = 0.8;
pub const MAX_HEALTH: i32 = 100;
pub const JOIN_SPAWN_RANGE: f32 = 5.0;
pub const RESPAWN_RANGE: f32 = 10.0;
pub const SPAWN_HEIGHT: f32 = 5.0;

pub const PLAYER_COLORS: [&str; 7] = [
    "#FF5733", "#33FF57", "#3357FF", "#F033FF", "#FF33A8", "#33FFF5", "#F5FF33",
];

/// Rounds to two decimal places, the precision carried on the wire.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(&self) -> Vec3 {
        let mag = self.magnitude();
        if mag > 0.0 {
            self.scale(1.0 / mag)
        } else {
            Vec3::ZERO
        }
    }

    pub fn scale(&self, factor: f32) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude()
    }

    /// Distance in the ground plane, ignoring height.
    pub fn distance_xz(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn rounded(&self) -> Vec3 {
        Vec3::new(round2(self.x), round2(self.y), round2(self.z))
    }
}

/// Unit facing vector for a yaw angle. Yaw 0 faces +Z; yaw is in radians,
/// range (-PI, PI].
pub fn forward_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponKind {
    Pistol,
    Rocket,
}

/// Canonical per-participant state. Lives in the authority's store and in
/// every replica's mirror; never crosses the wire directly (see
/// [`crate::codec::PackedPlayer`]).
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: String,
    pub pos: Vec3,
    pub yaw: f32,
    pub color: String,
    pub health: i32,
    pub weapon: WeaponKind,
    pub rocket_ammo: u32,
    pub last_seq: u64,
}

impl PlayerState {
    pub fn new(id: String, pos: Vec3, color: String) -> Self {
        Self {
            id,
            pos,
            yaw: 0.0,
            color,
            health: MAX_HEALTH,
            weapon: WeaponKind::Pistol,
            rocket_ammo: 0,
            last_seq: 0,
        }
    }
}

/// A rocket in flight. `vel` is the per-tick displacement, scaled by weapon
/// speed at spawn; only `pos` changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: u64,
    pub owner: String,
    pub pos: Vec3,
    pub vel: Vec3,
    pub created_at_ms: u64,
}

impl Projectile {
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    RocketAmmo,
    Health,
}

/// A map-defined pickup. `respawn_at_ms` doubles as the availability flag:
/// the item is available iff the field is unset or strictly in the past.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldItem {
    pub id: String,
    pub kind: ItemKind,
    pub pos: Vec3,
    pub respawn_at_ms: Option<u64>,
}

impl WorldItem {
    pub fn new(id: &str, kind: ItemKind, pos: Vec3) -> Self {
        Self {
            id: id.to_string(),
            kind,
            pos,
            respawn_at_ms: None,
        }
    }

    pub fn is_available(&self, now_ms: u64) -> bool {
        match self.respawn_at_ms {
            None => true,
            Some(at) => at < now_ms,
        }
    }
}

/// The arena's fixed item placements. Ids are stable across the session.
pub fn default_items() -> Vec<WorldItem> {
    vec![
        WorldItem::new("ammo_east", ItemKind::RocketAmmo, Vec3::new(12.0, 1.0, 0.0)),
        WorldItem::new("ammo_west", ItemKind::RocketAmmo, Vec3::new(-12.0, 1.0, 0.0)),
        WorldItem::new("health_north", ItemKind::Health, Vec3::new(0.0, 1.0, 12.0)),
        WorldItem::new("health_south", ItemKind::Health, Vec3::new(0.0, 1.0, -12.0)),
    ]
}

/// Read-only world summary a session publishes after each broadcast or
/// applied snapshot, for binaries and tests to watch.
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    pub players: Vec<PlayerState>,
    pub items: Vec<WorldItem>,
    pub projectiles: usize,
}
