//! Claim validation. Every check is a pure function over the canonical
//! store; rejected claims are silent no-ops that the session logs.

use crate::world::WorldStore;
use shared::codec::PackedPlayer;
use shared::model::{forward_from_yaw, Vec3};
use shared::tuning::Tuning;
use std::fmt;

/// Why a claim was rejected. Carried up to the session for a warn! line,
/// never echoed to the claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    TooFast,
    UnknownPlayer,
    UnknownTarget,
    ShooterDead,
    TooSoon,
    OutOfReach,
    OutsideAimCone,
    NoAmmo,
    UnknownItem,
    ItemUnavailable,
    TooFarFromItem,
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Reject::TooFast => "movement exceeds per-update limit",
            Reject::UnknownPlayer => "claimant is not a known player",
            Reject::UnknownTarget => "target is not a known player",
            Reject::ShooterDead => "shooter has no health",
            Reject::TooSoon => "weapon still on cooldown",
            Reject::OutOfReach => "target beyond weapon reach",
            Reject::OutsideAimCone => "target outside aim cone",
            Reject::NoAmmo => "no rocket ammo",
            Reject::UnknownItem => "item does not exist",
            Reject::ItemUnavailable => "item is waiting to respawn",
            Reject::TooFarFromItem => "too far from item",
        };
        write!(f, "{}", reason)
    }
}

/// Movement gate for an already-known player: the claimed position may not
/// be further than `max_move_per_update` from the last accepted one. The
/// first claim from a new id has no previous position and passes.
pub fn check_movement(world: &WorldStore, claim: &PackedPlayer, tuning: &Tuning) -> Result<(), Reject> {
    let Some(player) = world.player(&claim.id) else {
        return Ok(());
    };
    if player.pos.distance(&claim.pos) > tuning.max_move_per_update {
        return Err(Reject::TooFast);
    }
    Ok(())
}

/// Hit validation: identity, liveness, fire rate, reach and aim cone, in
/// that order. Returns the authority's own damage for the shooter's
/// current weapon; the claimant's damage hint is never consulted.
pub fn check_hit(
    world: &WorldStore,
    shooter_id: &str,
    target_id: &str,
    tuning: &Tuning,
    now_ms: u64,
) -> Result<i32, Reject> {
    let shooter = world.player(shooter_id).ok_or(Reject::UnknownPlayer)?;
    let target = world.player(target_id).ok_or(Reject::UnknownTarget)?;

    if shooter.health <= 0 {
        return Err(Reject::ShooterDead);
    }

    let cooldown = tuning.cooldown_ms(shooter.weapon);
    if let Some(last) = world.last_hit_accept(shooter_id) {
        if now_ms.saturating_sub(last) < cooldown {
            return Err(Reject::TooSoon);
        }
    }

    if shooter.pos.distance_xz(&target.pos) > tuning.max_reach {
        return Err(Reject::OutOfReach);
    }

    // Planar aim check. Coincident positions have no direction and pass.
    let to_target = Vec3::new(
        target.pos.x - shooter.pos.x,
        0.0,
        target.pos.z - shooter.pos.z,
    );
    if to_target.magnitude() > f32::EPSILON {
        let aim = forward_from_yaw(shooter.yaw).dot(&to_target.normalize());
        if aim < tuning.aim_cone_cos {
            return Err(Reject::OutsideAimCone);
        }
    }

    Ok(tuning.damage(shooter.weapon))
}

/// Rocket launch gate: the owner must exist and hold ammo. Launch
/// direction and speed are the claimant's to choose.
pub fn check_projectile_spawn(world: &WorldStore, owner_id: &str) -> Result<(), Reject> {
    let owner = world.player(owner_id).ok_or(Reject::UnknownPlayer)?;
    if owner.rocket_ammo == 0 {
        return Err(Reject::NoAmmo);
    }
    Ok(())
}

/// Pickup gate: item exists, is not waiting to respawn, and the player is
/// within grab range.
pub fn check_pickup(
    world: &WorldStore,
    player_id: &str,
    item_id: &str,
    tuning: &Tuning,
    now_ms: u64,
) -> Result<(), Reject> {
    let player = world.player(player_id).ok_or(Reject::UnknownPlayer)?;
    let item = world.item(item_id).ok_or(Reject::UnknownItem)?;

    if !item.is_available(now_ms) {
        return Err(Reject::ItemUnavailable);
    }
    if player.pos.distance(&item.pos) > tuning.pickup_radius {
        return Err(Reject::TooFarFromItem);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::model::{Vec3, WeaponKind, MAX_HEALTH};

    fn world_with(players: &[(&str, Vec3)]) -> WorldStore {
        let mut world = WorldStore::with_seed(11);
        for (id, pos) in players {
            world.insert_player(&claim_at(id, *pos));
        }
        world
    }

    fn claim_at(id: &str, pos: Vec3) -> PackedPlayer {
        PackedPlayer {
            id: id.to_string(),
            pos,
            yaw: 0.0,
            health: MAX_HEALTH,
            seq: 1,
            weapon: WeaponKind::Pistol,
            rocket_ammo: 0,
            color: None,
        }
    }

    #[test]
    fn test_movement_within_limit_passes() {
        let world = world_with(&[("alice", Vec3::ZERO)]);
        let tuning = Tuning::default();

        let near = claim_at("alice", Vec3::new(0.99, 0.0, 0.0));
        assert_eq!(check_movement(&world, &near, &tuning), Ok(()));

        let exact = claim_at("alice", Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(check_movement(&world, &exact, &tuning), Ok(()));
    }

    #[test]
    fn test_movement_beyond_limit_rejected() {
        let world = world_with(&[("alice", Vec3::ZERO)]);
        let tuning = Tuning::default();

        let far = claim_at("alice", Vec3::new(1.01, 0.0, 0.0));
        assert_eq!(check_movement(&world, &far, &tuning), Err(Reject::TooFast));

        // Vertical teleports count too; the gate is three-dimensional.
        let up = claim_at("alice", Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(check_movement(&world, &up, &tuning), Err(Reject::TooFast));
    }

    #[test]
    fn test_first_claim_skips_movement_gate() {
        let world = world_with(&[]);
        let tuning = Tuning::default();
        let join = claim_at("newcomer", Vec3::new(50.0, 5.0, 50.0));
        assert_eq!(check_movement(&world, &join, &tuning), Ok(()));
    }

    #[test]
    fn test_hit_happy_path_returns_authority_damage() {
        let world = world_with(&[("alice", Vec3::ZERO), ("bob", Vec3::new(0.0, 0.0, 10.0))]);
        let tuning = Tuning::default();
        let damage = check_hit(&world, "alice", "bob", &tuning, 1000);
        assert_eq!(damage, Ok(tuning.pistol_damage));
    }

    #[test]
    fn test_hit_unknown_parties_rejected() {
        let world = world_with(&[("alice", Vec3::ZERO)]);
        let tuning = Tuning::default();
        assert_eq!(
            check_hit(&world, "ghost", "alice", &tuning, 0),
            Err(Reject::UnknownPlayer)
        );
        assert_eq!(
            check_hit(&world, "alice", "ghost", &tuning, 0),
            Err(Reject::UnknownTarget)
        );
    }

    #[test]
    fn test_hit_from_dead_shooter_rejected() {
        let mut world = world_with(&[("alice", Vec3::ZERO), ("bob", Vec3::new(0.0, 0.0, 5.0))]);
        world.force_health("alice", 0);
        let tuning = Tuning::default();
        assert_eq!(
            check_hit(&world, "alice", "bob", &tuning, 0),
            Err(Reject::ShooterDead)
        );
    }

    #[test]
    fn test_hit_rate_limited_by_accepted_hits_only() {
        let mut world = world_with(&[("alice", Vec3::ZERO), ("bob", Vec3::new(0.0, 0.0, 5.0))]);
        let tuning = Tuning::default();

        world.record_hit_accept("alice", 1000);
        // 100ms after an accepted pistol hit is inside the 400ms window.
        assert_eq!(
            check_hit(&world, "alice", "bob", &tuning, 1100),
            Err(Reject::TooSoon)
        );
        // Exactly one cooldown later fires again.
        assert!(check_hit(&world, "alice", "bob", &tuning, 1400).is_ok());
    }

    #[test]
    fn test_hit_beyond_reach_rejected() {
        let world = world_with(&[("alice", Vec3::ZERO), ("bob", Vec3::new(0.0, 0.0, 61.0))]);
        let tuning = Tuning::default();
        assert_eq!(
            check_hit(&world, "alice", "bob", &tuning, 0),
            Err(Reject::OutOfReach)
        );
    }

    #[test]
    fn test_hit_reach_ignores_height() {
        // 59 planar units but a large vertical gap still lands.
        let world = world_with(&[("alice", Vec3::ZERO), ("bob", Vec3::new(0.0, 40.0, 59.0))]);
        let tuning = Tuning::default();
        assert!(check_hit(&world, "alice", "bob", &tuning, 0).is_ok());
    }

    #[test]
    fn test_hit_behind_shooter_rejected() {
        // Yaw 0 faces +Z; bob sits at -Z.
        let world = world_with(&[("alice", Vec3::ZERO), ("bob", Vec3::new(0.0, 0.0, -10.0))]);
        let tuning = Tuning::default();
        assert_eq!(
            check_hit(&world, "alice", "bob", &tuning, 0),
            Err(Reject::OutsideAimCone)
        );
    }

    #[test]
    fn test_hit_coincident_positions_pass_aim_check() {
        let world = world_with(&[("alice", Vec3::ZERO), ("bob", Vec3::ZERO)]);
        let tuning = Tuning::default();
        assert!(check_hit(&world, "alice", "bob", &tuning, 0).is_ok());
    }

    #[test]
    fn test_projectile_spawn_needs_ammo_only() {
        let mut world = world_with(&[("alice", Vec3::ZERO)]);
        assert_eq!(
            check_projectile_spawn(&world, "alice"),
            Err(Reject::NoAmmo)
        );
        assert_eq!(
            check_projectile_spawn(&world, "ghost"),
            Err(Reject::UnknownPlayer)
        );

        world.grant_rockets("alice", 1);
        assert_eq!(check_projectile_spawn(&world, "alice"), Ok(()));

        // No cooldown applies: an accepted hit moments ago does not gate it.
        world.record_hit_accept("alice", 999);
        assert_eq!(check_projectile_spawn(&world, "alice"), Ok(()));
    }

    #[test]
    fn test_pickup_checks_item_and_range() {
        // ammo_east sits at (12, 1, 0).
        let mut world = world_with(&[("alice", Vec3::new(12.0, 1.0, 0.0))]);
        let tuning = Tuning::default();

        assert_eq!(check_pickup(&world, "alice", "ammo_east", &tuning, 0), Ok(()));
        assert_eq!(
            check_pickup(&world, "alice", "no_such_item", &tuning, 0),
            Err(Reject::UnknownItem)
        );
        assert_eq!(
            check_pickup(&world, "ghost", "ammo_east", &tuning, 0),
            Err(Reject::UnknownPlayer)
        );

        world.take_item("ammo_east", 10_000);
        assert_eq!(
            check_pickup(&world, "alice", "ammo_east", &tuning, 500),
            Err(Reject::ItemUnavailable)
        );
    }

    #[test]
    fn test_pickup_range_is_three_dimensional() {
        // Planar distance is zero but the player hovers above the item.
        let world = world_with(&[("alice", Vec3::new(12.0, 4.0, 0.0))]);
        let tuning = Tuning::default();
        assert_eq!(
            check_pickup(&world, "alice", "ammo_east", &tuning, 0),
            Err(Reject::TooFarFromItem)
        );
    }
}
