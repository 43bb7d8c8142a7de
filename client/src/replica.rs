//! The replica: this participant's mirror of the authoritative world, plus
//! the local state the authority never owns.

use shared::codec::PackedPlayer;
use shared::model::{default_items, PlayerState, Projectile, Vec3, WorldItem};
use shared::policy::{authority_owns, client_owns, StateField};
use shared::tuning::Tuning;
use std::collections::{HashMap, HashSet};

/// Mirror of the world as this participant sees it. The local player
/// exists from construction; everyone else appears and disappears with
/// snapshot membership.
pub struct Replica {
    self_id: String,
    players: HashMap<String, PlayerState>,
    /// Last applied broadcast sequence per participant, for stale-row
    /// suppression.
    last_seq: HashMap<String, u64>,
    /// Colors survive the rows that omit them.
    colors: HashMap<String, String>,
    items: Vec<WorldItem>,
    projectiles: Vec<Projectile>,
    next_projectile_id: u64,
    claim_seq: u64,
    tuning: Tuning,
}

impl Replica {
    pub fn new(self_id: String, spawn: Vec3, tuning: Tuning) -> Self {
        let mut players = HashMap::new();
        players.insert(
            self_id.clone(),
            PlayerState::new(self_id.clone(), spawn, String::new()),
        );
        Self {
            self_id,
            players,
            last_seq: HashMap::new(),
            colors: HashMap::new(),
            items: default_items(),
            projectiles: Vec::new(),
            next_projectile_id: 0,
            claim_seq: 0,
            tuning,
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn players(&self) -> &HashMap<String, PlayerState> {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn self_player(&self) -> Option<&PlayerState> {
        self.players.get(&self.self_id)
    }

    pub fn items(&self) -> &[WorldItem] {
        &self.items
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Merges one full snapshot. Rows older than what this replica already
    /// applied for a participant are discarded; an equal sequence re-applies
    /// harmlessly. The self row only contributes the authority-owned
    /// fields, unless the positions have diverged so far that only a snap
    /// correction explains it (respawn or teleport). Other participants are
    /// overwritten whole, and the ones missing from the snapshot are gone.
    pub fn apply_snapshot(&mut self, rows: Vec<PackedPlayer>) {
        let mut present: HashSet<String> = HashSet::with_capacity(rows.len());

        for row in rows {
            // A stale row still proves the player exists; only its data
            // is out of date.
            present.insert(row.id.clone());
            if let Some(&applied) = self.last_seq.get(&row.id) {
                if row.seq < applied {
                    continue;
                }
            }
            self.last_seq.insert(row.id.clone(), row.seq);
            if let Some(color) = &row.color {
                self.colors.insert(row.id.clone(), color.clone());
            }

            if row.id == self.self_id {
                self.merge_self(&row);
            } else {
                self.overwrite_other(&row);
            }
        }

        let self_id = self.self_id.clone();
        self.players
            .retain(|id, _| *id == self_id || present.contains(id));
        self.last_seq
            .retain(|id, _| *id == self_id || present.contains(id));
        self.colors
            .retain(|id, _| *id == self_id || present.contains(id));
    }

    fn merge_self(&mut self, row: &PackedPlayer) {
        let color = self.colors.get(&row.id).cloned();
        let snap_distance = self.tuning.snap_distance;
        if let Some(me) = self.players.get_mut(&self.self_id) {
            debug_assert!(authority_owns(StateField::Health));
            debug_assert!(authority_owns(StateField::RocketAmmo));
            me.health = row.health;
            me.rocket_ammo = row.rocket_ammo;
            if let Some(color) = color {
                me.color = color;
            }

            // Position is client-owned, but a divergence this large means
            // the authority moved us; yaw stays local even then.
            debug_assert!(client_owns(StateField::Position));
            if me.pos.distance(&row.pos) > snap_distance {
                me.pos = row.pos;
            }
        }
    }

    fn overwrite_other(&mut self, row: &PackedPlayer) {
        let color = self.colors.get(&row.id).cloned().unwrap_or_default();
        let player = self
            .players
            .entry(row.id.clone())
            .or_insert_with(|| PlayerState::new(row.id.clone(), row.pos, color.clone()));
        player.pos = row.pos;
        player.yaw = row.yaw;
        player.weapon = row.weapon;
        player.health = row.health;
        player.rocket_ammo = row.rocket_ammo;
        player.color = color;
        player.last_seq = row.seq;
    }

    pub fn local_move(&mut self, pos: Vec3, yaw: f32) {
        if let Some(me) = self.players.get_mut(&self.self_id) {
            me.pos = pos;
            me.yaw = yaw;
        }
    }

    pub fn select_weapon(&mut self, weapon: shared::model::WeaponKind) {
        if let Some(me) = self.players.get_mut(&self.self_id) {
            me.weapon = weapon;
        }
    }

    /// Optimistic pickup: hide the item locally and mirror its respawn
    /// timer before the authority answers. A rejection costs nothing since
    /// item effects only ever arrive through snapshots.
    pub fn try_pickup(&mut self, item_id: &str, now_ms: u64) -> bool {
        let Some(me_pos) = self.players.get(&self.self_id).map(|me| me.pos) else {
            return false;
        };
        let Some(item) = self.items.iter_mut().find(|item| item.id == item_id) else {
            return false;
        };
        if !item.is_available(now_ms) || me_pos.distance(&item.pos) > self.tuning.pickup_radius {
            return false;
        }
        item.respawn_at_ms = Some(now_ms + self.tuning.item_respawn_ms);
        true
    }

    /// Packs the local player as the next outgoing claim, stamped with this
    /// replica's own claim counter.
    pub fn next_claim(&mut self) -> Option<PackedPlayer> {
        let me = self.players.get(&self.self_id)?;
        self.claim_seq += 1;
        Some(PackedPlayer::pack(me, self.claim_seq, None))
    }

    /// Tracks a rocket in flight, whether relayed by the authority or
    /// launched locally.
    pub fn track_projectile(&mut self, owner: &str, origin: Vec3, vel: Vec3, now_ms: u64) {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        self.projectiles.push(Projectile {
            id,
            owner: owner.to_string(),
            pos: origin,
            vel,
            created_at_ms: now_ms,
        });
    }

    /// Local per-tick upkeep: projectiles fly and expire, hidden items come
    /// back. Purely cosmetic mirrors of what the authority simulates.
    pub fn advance(&mut self, now_ms: u64) {
        let ttl = self.tuning.projectile_ttl_ms;
        self.projectiles.retain_mut(|projectile| {
            projectile.pos = projectile.pos.add(&projectile.vel);
            projectile.pos.y > 0.0 && projectile.age_ms(now_ms) <= ttl
        });

        for item in &mut self.items {
            if item.respawn_at_ms.is_some() && item.is_available(now_ms) {
                item.respawn_at_ms = None;
            }
        }
    }
}
