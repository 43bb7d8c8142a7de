use clap::Parser;
use host::net::spawn_udp_listener;
use host::session::{HostConfig, HostSession};
use log::info;
use rand::Rng;
use shared::clock::SystemClock;
use shared::command::LocalCommand;
use shared::model::{forward_from_yaw, Vec3, WorldView, JOIN_SPAWN_RANGE, SPAWN_HEIGHT, WORLD_SIZE};
use shared::tuning::{Tuning, DEFAULT_HOST_ADDR, PEER_TIMEOUT};
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the UDP socket to
    #[arg(short = 'b', long, default_value = DEFAULT_HOST_ADDR)]
    bind: String,

    /// Participant id for the host's own player
    #[arg(short = 'n', long, default_value = "host")]
    name: String,

    /// Run without a host-controlled player
    #[arg(long)]
    headless: bool,

    /// Largest accepted displacement per state claim, in world units
    #[arg(long, default_value_t = 1.0)]
    max_move: f32,

    /// Largest accepted planar hit distance, in world units
    #[arg(long, default_value_t = 60.0)]
    max_reach: f32,

    /// Cosine of the aim half-angle hit claims must satisfy
    #[arg(long, default_value_t = 0.5)]
    aim_cone: f32,

    /// Pickup grab radius, in world units
    #[arg(long, default_value_t = 1.5)]
    pickup_radius: f32,

    /// Pistol refire delay in milliseconds
    #[arg(long, default_value_t = 400)]
    pistol_cooldown: u64,

    /// Rocket refire delay in milliseconds
    #[arg(long, default_value_t = 1500)]
    rocket_cooldown: u64,
}

impl Args {
    fn tuning(&self) -> Tuning {
        Tuning {
            max_move_per_update: self.max_move,
            max_reach: self.max_reach,
            aim_cone_cos: self.aim_cone,
            pickup_radius: self.pickup_radius,
            pistol_cooldown_ms: self.pistol_cooldown,
            rocket_cooldown_ms: self.rocket_cooldown,
            ..Tuning::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let socket = Arc::new(UdpSocket::bind(&args.bind).await?);
    info!("Host listening on {}", socket.local_addr()?);

    let (event_tx, event_rx) = mpsc::channel(256);
    let (command_tx, command_rx) = mpsc::channel(64);
    spawn_udp_listener(socket, event_tx, PEER_TIMEOUT);

    let player_id = (!args.headless).then(|| args.name.clone());
    let config = HostConfig {
        player_id: player_id.clone(),
        tuning: args.tuning(),
    };
    let (session, view_rx) = HostSession::new(config, Arc::new(SystemClock));

    if let Some(id) = player_id {
        info!("Hosting as {}", id);
        tokio::spawn(wander(command_tx, view_rx, id));
    } else {
        info!("Hosting headless");
        drop(command_tx);
    }

    tokio::select! {
        _ = session.run(event_rx, command_rx) => {}
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }
    Ok(())
}

/// Random-walks the host's own player so local play exercises the same
/// claim paths as remote peers. The first Move doubles as the join, and a
/// large jump in the published view (a respawn) re-seeds the walk.
async fn wander(
    commands: mpsc::Sender<LocalCommand>,
    view: watch::Receiver<WorldView>,
    player_id: String,
) {
    let mut pos = Vec3::new(
        rand::thread_rng().gen_range(-JOIN_SPAWN_RANGE..JOIN_SPAWN_RANGE),
        SPAWN_HEIGHT,
        rand::thread_rng().gen_range(-JOIN_SPAWN_RANGE..JOIN_SPAWN_RANGE),
    );
    let mut yaw = rand::thread_rng().gen_range(-PI..PI);
    let mut timer = time::interval(Duration::from_millis(30));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        let published = {
            let view = view.borrow();
            view.players
                .iter()
                .find(|player| player.id == player_id)
                .map(|player| player.pos)
        };
        if let Some(actual) = published {
            if actual.distance(&pos) > 2.0 {
                pos = actual;
            }
        }
        if rand::thread_rng().gen_bool(0.02) {
            yaw = rand::thread_rng().gen_range(-PI..PI);
        }
        pos = pos.add(&forward_from_yaw(yaw).scale(0.09));
        // Spawns drop in from the air; settle to ground height.
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
