//! Headless soak bot. Joins the arena, chases the nearest player, fires
//! whatever it has ammo for, grabs pickups it walks over, and prints a
//! status line on a fixed cadence. Useful for filling a host with traffic.

use clap::Parser;
use client::net::connect_udp;
use client::session::{ClientConfig, ClientSession};
use rand::Rng;
use shared::clock::{unix_millis, SystemClock};
use shared::command::LocalCommand;
use shared::model::{forward_from_yaw, Vec3, WeaponKind, WorldView, WORLD_SIZE};
use shared::tuning::{Tuning, DEFAULT_HOST_ADDR, PEER_TIMEOUT};
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Authority address to connect to
    #[arg(short = 's', long, default_value = DEFAULT_HOST_ADDR)]
    server: String,

    /// Participant id; generated when omitted
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Seconds between status lines
    #[arg(long, default_value_t = 5)]
    report_every: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let name = args
        .name
        .unwrap_or_else(|| format!("bot-{:04x}", rand::thread_rng().gen::<u16>()));

    let (event_tx, event_rx) = mpsc::channel(256);
    let (command_tx, command_rx) = mpsc::channel(64);
    connect_udp(&args.server, event_tx, PEER_TIMEOUT).await?;
    println!("{} joining {}", name, args.server);

    let config = ClientConfig {
        player_id: name.clone(),
        tuning: Tuning::default(),
    };
    let (session, view_rx) = ClientSession::new(config, Arc::new(SystemClock));
    let start = session
        .replica()
        .self_player()
        .map(|player| player.pos)
        .unwrap_or(Vec3::ZERO);

    tokio::spawn(drive(command_tx, view_rx.clone(), name.clone(), start));
    tokio::spawn(report(
        view_rx,
        name,
        Duration::from_secs(args.report_every.max(1)),
    ));

    tokio::select! {
        _ = session.run(event_rx, command_rx) => println!("Session over, bot exiting"),
        _ = tokio::signal::ctrl_c() => println!("Interrupted"),
    }
    Ok(())
}

/// The bot brain: walk toward the nearest player, face them, fire in
/// bursts, and pick up anything in reach along the way.
async fn drive(
    commands: mpsc::Sender<LocalCommand>,
    view: watch::Receiver<WorldView>,
    player_id: String,
    start: Vec3,
) {
    let mut pos = start;
    let mut yaw = rand::thread_rng().gen_range(-PI..PI);
    let mut weapon = WeaponKind::Pistol;
    let mut timer = time::interval(Duration::from_millis(30));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        let world = view.borrow().clone();

        if let Some(me) = world.players.iter().find(|player| player.id == player_id) {
            // A big jump in the reconciled view means the authority
            // respawned us; walk from there instead of the stale spot.
            if me.pos.distance(&pos) > 2.0 {
                pos = me.pos;
            }
            let wanted = if me.rocket_ammo > 0 {
                WeaponKind::Rocket
            } else {
                WeaponKind::Pistol
            };
            if wanted != weapon {
                weapon = wanted;
                if commands
                    .send(LocalCommand::SelectWeapon(weapon))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }

        let target = world
            .players
            .iter()
            .filter(|player| player.id != player_id)
            .min_by(|a, b| {
                a.pos
                    .distance_xz(&pos)
                    .total_cmp(&b.pos.distance_xz(&pos))
            });
        if let Some(target) = target {
            let to = target.pos.sub(&pos);
            yaw = to.x.atan2(to.z);
            if target.pos.distance_xz(&pos) < 50.0 && rand::thread_rng().gen_bool(0.3) {
                let fire = match weapon {
                    WeaponKind::Pistol => LocalCommand::Fire {
                        target: Some(target.id.clone()),
                    },
                    WeaponKind::Rocket => LocalCommand::Fire { target: None },
                };
                if commands.send(fire).await.is_err() {
                    break;
                }
            }
        } else if rand::thread_rng().gen_bool(0.02) {
            yaw = rand::thread_rng().gen_range(-PI..PI);
        }

        let now = unix_millis();
        let nearby_item = world
            .items
            .iter()
            .find(|item| item.is_available(now) && item.pos.distance(&pos) < 1.4);
        if let Some(item) = nearby_item {
            let pickup = LocalCommand::Pickup {
                item: item.id.clone(),
            };
            if commands.send(pickup).await.is_err() {
                break;
            }
        }

        pos = pos.add(&forward_from_yaw(yaw).scale(0.09));
        pos.y = (pos.y - 0.12).max(1.0);
        let half = WORLD_SIZE / 2.0;
        pos.x = pos.x.clamp(-half, half);
        pos.z = pos.z.clamp(-half, half);
        if commands
            .send(LocalCommand::Move { pos, yaw })
            .await
            .is_err()
        {
            break;
        }
    }
}

async fn report(mut view: watch::Receiver<WorldView>, player_id: String, every: Duration) {
    let mut timer = time::interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        timer.tick().await;
        let world = view.borrow_and_update().clone();
        match world.players.iter().find(|player| player.id == player_id) {
            Some(me) => println!(
                "[{}] players={} projectiles={} health={} rockets={} pos=({:.1}, {:.1}, {:.1})",
                player_id,
                world.players.len(),
                world.projectiles,
                me.health,
                me.rocket_ammo,
                me.pos.x,
                me.pos.y,
                me.pos.z,
            ),
            None => println!("[{}] waiting for the first snapshot", player_id),
        }
    }
}
