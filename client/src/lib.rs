//! # Participant Library
//!
//! Client-side implementation for the arena: a local replica of the world,
//! a claim loop that reports the player's own state upstream, and the
//! reconciliation rules that fold authoritative snapshots back in.
//!
//! ## Architecture Overview
//!
//! The participant never waits for the authority before acting. Local
//! commands apply to the replica immediately, and the replica's view of the
//! player's own row is claimed upstream on a fixed cadence. The authority
//! validates those claims, folds them into the canonical world, and
//! broadcasts snapshots; the replica reconciles each snapshot as it lands.
//!
//! ### Reconciliation Policy
//!
//! Snapshot rows for *other* players overwrite the mirror wholesale. The
//! row for the *local* player is merged instead: health and rocket ammo are
//! always taken from the authority, position is left alone unless it has
//! diverged past the snap threshold, and yaw stays local. This keeps
//! movement feeling immediate while letting combat outcomes land the moment
//! the authority decides them.
//!
//! ### Staleness Guard
//!
//! Every snapshot row carries the broadcast sequence it was packed under.
//! Rows older than the last applied sequence for that player are discarded,
//! so reordered datagrams can never roll a player backwards.
//!
//! ### Optimistic Pickups
//!
//! Item pickups hide the item locally before the claim goes out. If the
//! authority disagrees, the next snapshot simply never reflects the grant
//! and the item reappears on its own respawn schedule.
//!
//! ## Module Organization
//!
//! - [`replica`] holds the local world mirror and all reconciliation logic.
//! - [`session`] drives the event loop: channel events in, claims out,
//!   world views published for whatever front end is watching.
//! - [`net`] is the UDP link to the authority, translated into the shared
//!   channel-event vocabulary.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::session::{ClientConfig, ClientSession};
//! use shared::clock::SystemClock;
//! use shared::tuning::{Tuning, DEFAULT_HOST_ADDR, PEER_TIMEOUT};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (event_tx, events) = mpsc::channel(256);
//!     let (_command_tx, commands) = mpsc::channel(64);
//!     client::net::connect_udp(DEFAULT_HOST_ADDR, event_tx, PEER_TIMEOUT).await?;
//!
//!     let config = ClientConfig {
//!         player_id: "player-1".into(),
//!         tuning: Tuning::default(),
//!     };
//!     let (session, _view) = ClientSession::new(config, Arc::new(SystemClock));
//!     session.run(events, commands).await;
//!     Ok(())
//! }
//! ```

pub mod net;
pub mod replica;
pub mod session;
