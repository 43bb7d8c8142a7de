//! The authority session: one task owning the canonical world, driven by
//! channel events, local commands, and the two timers.

use crate::peers::PeerRegistry;
use crate::simulation::{self, SimEvent};
use crate::validator;
use crate::world::{DamageOutcome, WorldStore};
use log::{debug, info, warn};
use shared::clock::Clock;
use shared::codec::{self, Message, PackedPlayer, StatePayload};
use shared::command::LocalCommand;
use shared::model::{ItemKind, Vec3, WeaponKind, WorldView, MAX_HEALTH};
use shared::transport::ChannelEvent;
use shared::tuning::Tuning;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct HostConfig {
    /// When set, the authority plays too: its own player joins the store at
    /// startup and local commands drive it through the same claim paths.
    pub player_id: Option<String>,
    pub tuning: Tuning,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            player_id: None,
            tuning: Tuning::default(),
        }
    }
}

pub struct HostSession {
    config: HostConfig,
    clock: Arc<dyn Clock>,
    world: WorldStore,
    peers: PeerRegistry,
    view_tx: watch::Sender<WorldView>,
}

impl HostSession {
    pub fn new(config: HostConfig, clock: Arc<dyn Clock>) -> (Self, watch::Receiver<WorldView>) {
        let (view_tx, view_rx) = watch::channel(WorldView::default());
        let session = Self {
            config,
            clock,
            world: WorldStore::new(),
            peers: PeerRegistry::new(),
            view_tx,
        };
        (session, view_rx)
    }

    pub fn world(&self) -> &WorldStore {
        &self.world
    }

    #[cfg(test)]
    pub fn world_mut(&mut self) -> &mut WorldStore {
        &mut self.world
    }

    /// Drives the session until the event sender is dropped. Consumes the
    /// session; stopping is structural, not a flag.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ChannelEvent>,
        mut commands: mpsc::Receiver<LocalCommand>,
    ) {
        let mut sim_timer = time::interval(Duration::from_millis(self.config.tuning.sim_tick_ms));
        sim_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast_timer =
            time::interval(Duration::from_millis(self.config.tuning.broadcast_ms));
        broadcast_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        info!("Host session started");
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            let now = self.clock.now_ms();
                            self.handle_event(event, now);
                        }
                        None => break,
                    }
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            let now = self.clock.now_ms();
                            self.handle_command(command, now);
                        }
                        None => commands_open = false,
                    }
                }
                _ = sim_timer.tick() => {
                    let now = self.clock.now_ms();
                    self.tick(now);
                }
                _ = broadcast_timer.tick() => {
                    self.broadcast();
                }
            }
        }
        info!("Host session stopped");
    }

    pub fn handle_event(&mut self, event: ChannelEvent, now_ms: u64) {
        match event {
            ChannelEvent::Connected { peer, channel } => {
                info!("Peer {} connected", peer);
                self.peers.add(channel);
            }
            ChannelEvent::Data { peer, bytes } => match codec::decode(&bytes) {
                Ok(message) => self.handle_message(&peer, message, now_ms),
                Err(err) => warn!("Failed to decode packet from {}: {}", peer, err),
            },
            ChannelEvent::Disconnected { peer } => self.drop_peer(&peer),
        }
    }

    pub fn handle_message(&mut self, peer: &str, message: Message, now_ms: u64) {
        match message {
            Message::StateUpdate(StatePayload::Own(claim)) => self.handle_claim(peer, claim),
            Message::StateUpdate(StatePayload::Snapshot(_)) => {
                warn!("Ignoring snapshot payload from peer {}", peer);
            }
            // The claimant's damage hint is advisory; the authority applies
            // its own weapon damage.
            Message::HitClaim {
                target,
                damage_hint: _,
            } => {
                match self.peers.player_of(peer) {
                    Some(shooter) => {
                        let shooter = shooter.to_string();
                        self.resolve_hit(&shooter, &target, now_ms);
                    }
                    None => warn!("Hit claim from unbound peer {}", peer),
                }
            }
            Message::ProjectileSpawn { owner, origin, vel } => {
                match self.peers.player_of(peer) {
                    Some(bound) if bound == owner => {
                        let owner = owner.clone();
                        self.resolve_projectile(&owner, origin, vel, now_ms, Some(peer));
                    }
                    Some(bound) => warn!(
                        "Peer {} spawned a projectile for {} but is bound to {}",
                        peer, owner, bound
                    ),
                    None => warn!("Projectile spawn from unbound peer {}", peer),
                }
            }
            Message::ItemPickup { item } => match self.peers.player_of(peer) {
                Some(player) => {
                    let player = player.to_string();
                    self.resolve_pickup(&player, &item, now_ms);
                }
                None => warn!("Pickup claim from unbound peer {}", peer),
            },
        }
    }

    /// Local commands steer the authority's own player through the same
    /// validation as remote claims. The first Move is the host's join.
    pub fn handle_command(&mut self, command: LocalCommand, now_ms: u64) {
        let Some(own_id) = self.config.player_id.clone() else {
            return;
        };
        match command {
            LocalCommand::Move { pos, yaw } => {
                let claim = match self.own_claim(&own_id) {
                    Some(claim) => PackedPlayer { pos, yaw, ..claim },
                    None => {
                        self.world.insert_player(&PackedPlayer {
                            id: own_id,
                            pos,
                            yaw,
                            health: MAX_HEALTH,
                            seq: 1,
                            weapon: WeaponKind::Pistol,
                            rocket_ammo: 0,
                            color: None,
                        });
                        return;
                    }
                };
                match validator::check_movement(&self.world, &claim, &self.config.tuning) {
                    Ok(()) => self.world.apply_claim(&claim),
                    Err(reason) => warn!("Rejected local move: {}", reason),
                }
            }
            LocalCommand::SelectWeapon(weapon) => {
                if let Some(claim) = self.own_claim(&own_id) {
                    self.world.apply_claim(&PackedPlayer { weapon, ..claim });
                }
            }
            LocalCommand::Fire { target } => {
                let Some(player) = self.world.player(&own_id) else {
                    return;
                };
                match player.weapon {
                    WeaponKind::Pistol => match target {
                        Some(target) => self.resolve_hit(&own_id, &target, now_ms),
                        None => debug!("Pistol fire with no target"),
                    },
                    WeaponKind::Rocket => {
                        let origin = player.pos;
                        let vel = self.config.tuning.rocket_step(player.yaw);
                        self.resolve_projectile(&own_id, origin, vel, now_ms, None);
                    }
                }
            }
            LocalCommand::Pickup { item } => self.resolve_pickup(&own_id, &item, now_ms),
        }
    }

    /// One simulation tick: projectiles and item respawns.
    pub fn tick(&mut self, now_ms: u64) {
        for event in simulation::step(&mut self.world, &self.config.tuning, now_ms) {
            match event {
                SimEvent::Detonated { pos, hits } => {
                    debug!(
                        "Rocket detonated at ({:.1}, {:.1}, {:.1}), {} hit",
                        pos.x,
                        pos.y,
                        pos.z,
                        hits.len()
                    );
                    for hit in hits {
                        if hit.killed {
                            info!("Player {} killed by splash", hit.target);
                        }
                    }
                }
                SimEvent::Expired { id } => debug!("Projectile {} expired", id),
                SimEvent::ItemRespawned { id } => info!("Item {} respawned", id),
            }
        }
    }

    /// Packs the full player map once, stamps every row with one fresh
    /// sequence number, and sends a tailored copy per channel: the color
    /// rides along only the first time a channel sees a participant. A send
    /// failure retires the peer and its player.
    pub fn broadcast(&mut self) {
        let seq = self.world.next_broadcast_seq();
        let rows = self.world.pack_players(seq);

        let mut failed = Vec::new();
        for (label, peer) in self.peers.iter_mut() {
            if !peer.channel.is_open() {
                failed.push(label.clone());
                continue;
            }
            let tailored: Vec<PackedPlayer> = rows
                .iter()
                .cloned()
                .map(|mut row| {
                    if !peer.needs_intro(&row.id) {
                        row.color = None;
                    }
                    row
                })
                .collect();
            match codec::encode(&Message::StateUpdate(StatePayload::Snapshot(tailored))) {
                Ok(bytes) => {
                    if peer.channel.send(&bytes).is_err() {
                        failed.push(label.clone());
                    }
                }
                Err(err) => warn!("Failed to encode snapshot: {}", err),
            }
        }
        for label in failed {
            warn!("Dropping unreachable peer {}", label);
            self.drop_peer(&label);
        }

        self.publish_view();
    }

    fn handle_claim(&mut self, peer: &str, claim: PackedPlayer) {
        match self.peers.player_of(peer) {
            Some(bound) if bound != claim.id => {
                warn!(
                    "Peer {} claimed id {} but is bound to {}",
                    peer, claim.id, bound
                );
                return;
            }
            Some(_) => {}
            None => {
                if self.peers.get_mut(peer).is_none() {
                    warn!("Claim from unknown peer {}", peer);
                    return;
                }
                if self.peers.is_bound_elsewhere(&claim.id, peer) || self.is_own_id(&claim.id) {
                    warn!("Peer {} claimed id {} which is already taken", peer, claim.id);
                    return;
                }
                self.peers.bind(peer, &claim.id);
            }
        }

        if self.world.player(&claim.id).is_none() {
            self.world.insert_player(&claim);
            return;
        }
        match validator::check_movement(&self.world, &claim, &self.config.tuning) {
            Ok(()) => self.world.apply_claim(&claim),
            Err(reason) => warn!("Rejected movement from {}: {}", claim.id, reason),
        }
    }

    fn resolve_hit(&mut self, shooter: &str, target: &str, now_ms: u64) {
        match validator::check_hit(&self.world, shooter, target, &self.config.tuning, now_ms) {
            Ok(damage) => {
                self.world.record_hit_accept(shooter, now_ms);
                match self.world.apply_damage(target, damage) {
                    Some(DamageOutcome::Respawned { .. }) => {
                        info!("Player {} killed {}", shooter, target);
                    }
                    Some(DamageOutcome::Damaged { health }) => {
                        debug!(
                            "Player {} hit {} for {} ({} left)",
                            shooter, target, damage, health
                        );
                    }
                    None => {}
                }
            }
            Err(reason) => warn!("Rejected hit claim from {}: {}", shooter, reason),
        }
    }

    fn resolve_projectile(
        &mut self,
        owner: &str,
        origin: Vec3,
        vel: Vec3,
        now_ms: u64,
        claimant: Option<&str>,
    ) {
        match validator::check_projectile_spawn(&self.world, owner) {
            Ok(()) => {
                self.world.consume_rocket(owner);
                let id = self.world.spawn_projectile(owner, origin, vel, now_ms);
                debug!("Spawned projectile {} for {}", id, owner);
                self.relay_spawn(owner, origin, vel, claimant);
            }
            Err(reason) => warn!("Rejected projectile spawn from {}: {}", owner, reason),
        }
    }

    /// Accepted spawns are forwarded to every other open channel so
    /// replicas can show the rocket before its splash lands in a snapshot.
    fn relay_spawn(&mut self, owner: &str, origin: Vec3, vel: Vec3, exclude: Option<&str>) {
        let message = Message::ProjectileSpawn {
            owner: owner.to_string(),
            origin,
            vel,
        };
        let bytes = match codec::encode(&message) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Failed to encode projectile spawn: {}", err);
                return;
            }
        };

        let mut failed = Vec::new();
        for (label, peer) in self.peers.iter_mut() {
            if Some(label.as_str()) == exclude || !peer.channel.is_open() {
                continue;
            }
            if peer.channel.send(&bytes).is_err() {
                failed.push(label.clone());
            }
        }
        for label in failed {
            warn!("Dropping unreachable peer {}", label);
            self.drop_peer(&label);
        }
    }

    fn resolve_pickup(&mut self, player: &str, item: &str, now_ms: u64) {
        match validator::check_pickup(&self.world, player, item, &self.config.tuning, now_ms) {
            Ok(()) => {
                let effect = self.world.item_effect(item);
                self.world
                    .take_item(item, now_ms + self.config.tuning.item_respawn_ms);
                match effect {
                    Some(ItemKind::RocketAmmo) => {
                        self.world
                            .grant_rockets(player, self.config.tuning.rocket_ammo_per_pickup);
                    }
                    Some(ItemKind::Health) => {
                        self.world.heal(player, self.config.tuning.health_per_pickup);
                    }
                    None => {}
                }
                info!("Player {} picked up {}", player, item);
            }
            Err(reason) => warn!("Rejected pickup from {}: {}", player, reason),
        }
    }

    fn drop_peer(&mut self, peer: &str) {
        if let Some(gone) = self.peers.remove(peer) {
            info!("Peer {} disconnected", peer);
            if let Some(player_id) = gone.player_id {
                self.world.remove_player(&player_id);
                self.peers.forget_everywhere(&player_id);
            }
        }
    }

    fn is_own_id(&self, id: &str) -> bool {
        self.config.player_id.as_deref() == Some(id)
    }

    fn own_claim(&self, own_id: &str) -> Option<PackedPlayer> {
        let player = self.world.player(own_id)?;
        Some(PackedPlayer {
            id: own_id.to_string(),
            pos: player.pos,
            yaw: player.yaw,
            health: player.health,
            seq: player.last_seq + 1,
            weapon: player.weapon,
            rocket_ammo: player.rocket_ammo,
            color: None,
        })
    }

    fn publish_view(&self) {
        let view = WorldView {
            players: self.world.players().values().cloned().collect(),
            items: self.world.items().to_vec(),
            projectiles: self.world.projectiles().len(),
        };
        self.view_tx.send_replace(view);
    }
}
