//! The participant session: owns the replica, claims state upstream on a
//! fixed cadence, and reconciles snapshots as they arrive.

use crate::replica::Replica;
use log::{debug, info, warn};
use rand::Rng;
use shared::clock::Clock;
use shared::codec::{self, Message, StatePayload};
use shared::command::LocalCommand;
use shared::model::{Vec3, WeaponKind, WorldView, JOIN_SPAWN_RANGE, SPAWN_HEIGHT};
use shared::transport::{Channel, ChannelEvent};
use shared::tuning::Tuning;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub player_id: String,
    pub tuning: Tuning,
}

pub struct ClientSession {
    replica: Replica,
    clock: Arc<dyn Clock>,
    tuning: Tuning,
    channel: Option<Box<dyn Channel>>,
    /// Local refire gate per weapon; the authority enforces its own.
    last_fire: HashMap<WeaponKind, u64>,
    view_tx: watch::Sender<WorldView>,
}

impl ClientSession {
    /// The local player self-spawns in the join band; the authority learns
    /// the position from the first claim.
    pub fn new(config: ClientConfig, clock: Arc<dyn Clock>) -> (Self, watch::Receiver<WorldView>) {
        let mut rng = rand::thread_rng();
        let spawn = Vec3::new(
            rng.gen_range(-JOIN_SPAWN_RANGE..JOIN_SPAWN_RANGE),
            SPAWN_HEIGHT,
            rng.gen_range(-JOIN_SPAWN_RANGE..JOIN_SPAWN_RANGE),
        );
        let replica = Replica::new(config.player_id, spawn, config.tuning.clone());
        let (view_tx, view_rx) = watch::channel(WorldView::default());
        let session = Self {
            replica,
            clock,
            tuning: config.tuning,
            channel: None,
            last_fire: HashMap::new(),
            view_tx,
        };
        (session, view_rx)
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Drives the session until the authority disappears or the event
    /// sender is dropped.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ChannelEvent>,
        mut commands: mpsc::Receiver<LocalCommand>,
    ) {
        let mut send_timer = time::interval(Duration::from_millis(self.tuning.broadcast_ms));
        send_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        info!("Client session started as {}", self.replica.self_id());
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            let now = self.clock.now_ms();
                            if !self.handle_event(event, now) {
                                break;
                            }
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
                _ = send_timer.tick() => {
                    let now = self.clock.now_ms();
                    self.tick_send(now);
                }
            }
        }
        info!("Client session stopped");
    }

    /// Returns false once the authority is gone and the session should end.
    pub fn handle_event(&mut self, event: ChannelEvent, now_ms: u64) -> bool {
        match event {
            ChannelEvent::Connected { peer, channel } => {
                info!("Connected to authority at {}", peer);
                self.channel = Some(channel);
                true
            }
            ChannelEvent::Data { peer, bytes } => {
                match codec::decode(&bytes) {
                    Ok(message) => self.handle_message(message, now_ms),
                    Err(err) => warn!("Failed to decode packet from {}: {}", peer, err),
                }
                true
            }
            ChannelEvent::Disconnected { peer } => {
                warn!("Authority at {} is gone", peer);
                false
            }
        }
    }

    pub fn handle_message(&mut self, message: Message, now_ms: u64) {
        match message {
            Message::StateUpdate(StatePayload::Snapshot(rows)) => {
                self.replica.apply_snapshot(rows);
                self.publish_view();
            }
            Message::StateUpdate(StatePayload::Own(_)) => {
                warn!("Ignoring own-claim payload from the authority");
            }
            Message::ProjectileSpawn { owner, origin, vel } => {
                debug!("Tracking remote projectile from {}", owner);
                self.replica.track_projectile(&owner, origin, vel, now_ms);
            }
            Message::HitClaim { target, .. } => {
                warn!("Unexpected hit claim message for {}", target);
            }
            Message::ItemPickup { item } => {
                warn!("Unexpected pickup message for {}", item);
            }
        }
    }

    pub fn handle_command(&mut self, command: LocalCommand, now_ms: u64) {
        match command {
            LocalCommand::Move { pos, yaw } => self.replica.local_move(pos, yaw),
            LocalCommand::SelectWeapon(weapon) => self.replica.select_weapon(weapon),
            LocalCommand::Fire { target } => self.fire(target, now_ms),
            LocalCommand::Pickup { item } => {
                if self.replica.try_pickup(&item, now_ms) {
                    self.send(Message::ItemPickup { item });
                }
            }
        }
    }

    /// The claim tick: advance local mirrors, then claim own state. Runs
    /// every broadcast interval whether or not anything moved, which
    /// doubles as the keep-alive the idle timeout watches for.
    pub fn tick_send(&mut self, now_ms: u64) {
        self.replica.advance(now_ms);
        if self.channel.is_none() {
            return;
        }
        if let Some(claim) = self.replica.next_claim() {
            self.send(Message::StateUpdate(StatePayload::Own(claim)));
        }
    }

    fn fire(&mut self, target: Option<String>, now_ms: u64) {
        let (weapon, ammo, pos, yaw) = match self.replica.self_player() {
            Some(me) => (me.weapon, me.rocket_ammo, me.pos, me.yaw),
            None => return,
        };

        let cooldown = self.tuning.cooldown_ms(weapon);
        if let Some(&last) = self.last_fire.get(&weapon) {
            if now_ms.saturating_sub(last) < cooldown {
                debug!("{:?} still cooling down", weapon);
                return;
            }
        }

        match weapon {
            WeaponKind::Pistol => {
                let Some(target) = target else {
                    debug!("Pistol fire with no target");
                    return;
                };
                self.last_fire.insert(weapon, now_ms);
                self.send(Message::HitClaim {
                    target,
                    damage_hint: self.tuning.pistol_damage,
                });
            }
            WeaponKind::Rocket => {
                // Ammo is authority-owned; the local count is only a gate,
                // never decremented here.
                if ammo == 0 {
                    debug!("No rocket ammo");
                    return;
                }
                let owner = self.replica.self_id().to_string();
                let vel = self.tuning.rocket_step(yaw);
                self.last_fire.insert(weapon, now_ms);
                self.replica.track_projectile(&owner, pos, vel, now_ms);
                self.send(Message::ProjectileSpawn {
                    owner,
                    origin: pos,
                    vel,
                });
            }
        }
    }

    fn send(&self, message: Message) {
        let Some(channel) = &self.channel else {
            debug!("No channel yet, dropping outbound message");
            return;
        };
        match codec::encode(&message) {
            Ok(bytes) => {
                if let Err(err) = channel.send(&bytes) {
                    warn!("Send to authority failed: {}", err);
                }
            }
            Err(err) => warn!("Failed to encode message: {}", err),
        }
    }

    fn publish_view(&self) {
        let view = WorldView {
            players: self.replica.players().values().cloned().collect(),
            items: self.replica.items().to_vec(),
            projectiles: self.replica.projectiles().len(),
        };
        self.view_tx.send_replace(view);
    }
}
