use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::codec::PackedPlayer;
use shared::model::{
    default_items, ItemKind, PlayerState, Projectile, Vec3, WorldItem, MAX_HEALTH, PLAYER_COLORS,
    RESPAWN_RANGE, SPAWN_HEIGHT,
};
use shared::policy::{authority_owns, client_owns, StateField};
use std::collections::HashMap;

/// Where a damage application ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum DamageOutcome {
    Damaged { health: i32 },
    /// Health reached zero; the player was reset and moved in the same
    /// transaction, so zero is never visible outside this call.
    Respawned { pos: Vec3 },
}

/// Canonical world state. Owned exclusively by the authority's session
/// task; the broadcaster packs rows on the same task, so every snapshot
/// serializes a consistent view without copy-on-write or locks.
pub struct WorldStore {
    players: HashMap<String, PlayerState>,
    projectiles: Vec<Projectile>,
    items: Vec<WorldItem>,
    /// Accepted-hit timestamps per shooter, written only on accepted
    /// claims, read by the rate limiter.
    hit_accepts: HashMap<String, u64>,
    broadcast_seq: u64,
    next_projectile_id: u64,
    rng: StdRng,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic store for tests: respawn positions and color picks
    /// replay identically for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            projectiles: Vec::new(),
            items: default_items(),
            hit_accepts: HashMap::new(),
            broadcast_seq: 0,
            next_projectile_id: 0,
            rng,
        }
    }

    pub fn players(&self) -> &HashMap<String, PlayerState> {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn items(&self) -> &[WorldItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&WorldItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Join path: first accepted claim from a channel creates the player at
    /// the claimed position with an authority-assigned color, full health,
    /// and no rockets. A no-op if the id is already present.
    pub fn insert_player(&mut self, claim: &PackedPlayer) {
        if self.players.contains_key(&claim.id) {
            return;
        }
        let color = PLAYER_COLORS[self.rng.gen_range(0..PLAYER_COLORS.len())].to_string();
        let mut player = PlayerState::new(claim.id.clone(), claim.pos, color);
        player.yaw = claim.yaw;
        player.weapon = claim.weapon;
        player.last_seq = claim.seq;

        info!(
            "Player {} joined at ({:.1}, {:.1}, {:.1})",
            player.id, player.pos.x, player.pos.y, player.pos.z
        );
        self.players.insert(claim.id.clone(), player);
    }

    pub fn remove_player(&mut self, id: &str) {
        if self.players.remove(id).is_some() {
            info!("Removed player {}", id);
        }
        self.hit_accepts.remove(id);
    }

    /// Overwrites the client-owned fields from an already-validated claim.
    /// Authority-owned fields in the payload are never trusted; the store
    /// keeps re-emitting its own values for them.
    pub fn apply_claim(&mut self, claim: &PackedPlayer) {
        if let Some(player) = self.players.get_mut(&claim.id) {
            if client_owns(StateField::Position) {
                player.pos = claim.pos;
            }
            if client_owns(StateField::Yaw) {
                player.yaw = claim.yaw;
            }
            if client_owns(StateField::Weapon) {
                player.weapon = claim.weapon;
            }
            debug_assert!(authority_owns(StateField::Health));
            debug_assert!(authority_owns(StateField::RocketAmmo));
            player.last_seq = claim.seq;
        }
    }

    /// Applies damage through the health/respawn transition. Health never
    /// leaves [0, MAX_HEALTH]: a lethal hit resets health, randomizes the
    /// position and zeroes rocket ammo in one step. Damage landing after a
    /// respawn in the same tick simply wounds the new life.
    pub fn apply_damage(&mut self, target: &str, amount: i32) -> Option<DamageOutcome> {
        let player = self.players.get_mut(target)?;
        player.health -= amount;

        if player.health <= 0 {
            let pos = respawn_position(&mut self.rng);
            player.health = MAX_HEALTH;
            player.pos = pos;
            player.rocket_ammo = 0;
            info!(
                "Player {} killed, respawned at ({:.1}, {:.1}, {:.1})",
                target, pos.x, pos.y, pos.z
            );
            Some(DamageOutcome::Respawned { pos })
        } else {
            Some(DamageOutcome::Damaged {
                health: player.health,
            })
        }
    }

    pub fn heal(&mut self, target: &str, amount: i32) {
        if let Some(player) = self.players.get_mut(target) {
            player.health = (player.health + amount).min(MAX_HEALTH);
        }
    }

    pub fn grant_rockets(&mut self, target: &str, count: u32) {
        if let Some(player) = self.players.get_mut(target) {
            player.rocket_ammo += count;
        }
    }

    pub fn consume_rocket(&mut self, owner: &str) -> bool {
        match self.players.get_mut(owner) {
            Some(player) if player.rocket_ammo > 0 => {
                player.rocket_ammo -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn last_hit_accept(&self, shooter: &str) -> Option<u64> {
        self.hit_accepts.get(shooter).copied()
    }

    pub fn record_hit_accept(&mut self, shooter: &str, now_ms: u64) {
        self.hit_accepts.insert(shooter.to_string(), now_ms);
    }

    pub fn spawn_projectile(&mut self, owner: &str, origin: Vec3, vel: Vec3, now_ms: u64) -> u64 {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        self.projectiles.push(Projectile {
            id,
            owner: owner.to_string(),
            pos: origin,
            vel,
            created_at_ms: now_ms,
        });
        id
    }

    pub(crate) fn take_projectiles(&mut self) -> Vec<Projectile> {
        std::mem::take(&mut self.projectiles)
    }

    pub(crate) fn set_projectiles(&mut self, projectiles: Vec<Projectile>) {
        self.projectiles = projectiles;
    }

    /// Marks an item taken. The respawn stamp is the item's only mutation;
    /// availability is derived from it.
    pub fn take_item(&mut self, item_id: &str, respawn_at_ms: u64) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == item_id) {
            item.respawn_at_ms = Some(respawn_at_ms);
        }
    }

    /// Clears expired respawn stamps, returning the ids that came back.
    pub fn respawn_due_items(&mut self, now_ms: u64) -> Vec<String> {
        let mut respawned = Vec::new();
        for item in &mut self.items {
            if item.respawn_at_ms.is_some() && item.is_available(now_ms) {
                item.respawn_at_ms = None;
                respawned.push(item.id.clone());
            }
        }
        respawned
    }

    pub fn item_effect(&self, item_id: &str) -> Option<ItemKind> {
        self.item(item_id).map(|item| item.kind)
    }

    #[cfg(test)]
    pub fn force_health(&mut self, id: &str, health: i32) {
        if let Some(player) = self.players.get_mut(id) {
            player.health = health;
        }
    }

    /// Draws the next broadcast sequence number; strictly increasing.
    pub fn next_broadcast_seq(&mut self) -> u64 {
        self.broadcast_seq += 1;
        self.broadcast_seq
    }

    /// Packs every player into quantized wire rows, all stamped with the
    /// same broadcast sequence. Color is always attached here; the session
    /// strips it per channel for already-introduced participants.
    pub fn pack_players(&self, seq: u64) -> Vec<PackedPlayer> {
        self.players
            .values()
            .map(|player| PackedPlayer::pack(player, seq, Some(player.color.clone())))
            .collect()
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new()
    }
}

fn respawn_position(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-RESPAWN_RANGE..RESPAWN_RANGE),
        SPAWN_HEIGHT,
        rng.gen_range(-RESPAWN_RANGE..RESPAWN_RANGE),
    )
}
