use clap::Parser;
use client::net::connect_udp;
use client::session::{ClientConfig, ClientSession};
use log::info;
use rand::Rng;
use shared::clock::SystemClock;
use shared::command::LocalCommand;
use shared::model::{forward_from_yaw, Vec3, WorldView, WORLD_SIZE};
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
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let name = args
        .name
        .unwrap_or_else(|| format!("player-{:04x}", rand::thread_rng().gen::<u16>()));

    let (event_tx, event_rx) = mpsc::channel(256);
    let (command_tx, command_rx) = mpsc::channel(64);
    connect_udp(&args.server, event_tx, PEER_TIMEOUT).await?;
    info!("Joining {} as {}", args.server, name);

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
    tokio::spawn(wander(command_tx, view_rx, name, start));

    tokio::select! {
        _ = session.run(event_rx, command_rx) => {}
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }
    Ok(())
}

/// Stand-in for a real input front end: random-walks the player. When the
/// reconciled view jumps away from the walk (a respawn snap), the walk
/// re-seeds from it.
async fn wander(
    commands: mpsc::Sender<LocalCommand>,
    view: watch::Receiver<WorldView>,
    player_id: String,
    start: Vec3,
) {
    let mut pos = start;
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
