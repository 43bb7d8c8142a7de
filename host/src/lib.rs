//! # Authority Library
//!
//! The authority side of the arena netcode: one process owns the canonical
//! world and every other participant conforms to it.
//!
//! ## Trust Model
//!
//! Participants send claims, never facts. Position, yaw, and weapon
//! selection are client-owned and accepted as long as they pass the
//! validator's plausibility checks; health, rocket ammo, and item
//! availability are authority-owned and computed here regardless of what a
//! claim says. Rejected claims are silent no-ops: the claimant simply sees
//! the authoritative value in the next snapshot.
//!
//! ## Loop Structure
//!
//! Everything runs on a single session task. Inbound channel events, local
//! commands, the simulation tick, and the broadcast timer are multiplexed
//! with `select!`, so each handler sees the world at rest and no state is
//! shared across threads. The transport is behind the
//! [`shared::transport::Channel`] seam; the UDP adapter in [`net`] is the
//! only code that touches sockets.
//!
//! ## Module Organization
//!
//! - [`world`] holds the canonical player, projectile, and item state.
//! - [`validator`] is the pure plausibility checks for claims.
//! - [`simulation`] advances projectile flight and item respawns.
//! - [`peers`] tracks channel-to-player bindings and color introductions.
//! - [`session`] is the select! loop tying the above together.
//! - [`net`] adapts UDP datagrams to channel events.

pub mod net;
pub mod peers;
pub mod session;
pub mod simulation;
pub mod validator;
pub mod world;
