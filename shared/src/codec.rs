//! Wire format: a closed set of four message kinds serialized with bincode.
//! Malformed or truncated bytes fail to decode and the packet is dropped;
//! a partial update can never reach the store.

use crate::model::{round2, PlayerState, Vec3, WeaponKind};
use serde::{Deserialize, Serialize};

pub type CodecError = bincode::Error;

/// One player row as it travels on the wire. Positional fields are rounded
/// to two decimals at pack time to bound payload size. `seq` carries the
/// sender's claim counter upstream and the global broadcast counter
/// downstream. `color` is attached only when a channel first learns about
/// the participant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PackedPlayer {
    pub id: String,
    pub pos: Vec3,
    pub yaw: f32,
    pub health: i32,
    pub seq: u64,
    pub weapon: WeaponKind,
    pub rocket_ammo: u32,
    pub color: Option<String>,
}

impl PackedPlayer {
    pub fn pack(player: &PlayerState, seq: u64, color: Option<String>) -> Self {
        Self {
            id: player.id.clone(),
            pos: player.pos.rounded(),
            yaw: round2(player.yaw),
            health: player.health,
            seq,
            weapon: player.weapon,
            rocket_ammo: player.rocket_ammo,
            color,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum StatePayload {
    /// Participant -> authority: the sender's own state claim.
    Own(PackedPlayer),
    /// Authority -> all: the full player map, one broadcast sequence
    /// stamped into every row.
    Snapshot(Vec<PackedPlayer>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Message {
    StateUpdate(StatePayload),
    /// "I hit `target`." The hint is what the sender believes the damage
    /// is; the authority applies its own weapon damage regardless.
    HitClaim { target: String, damage_hint: i32 },
    /// Claim upstream; rebroadcast downstream with the owner attached so
    /// peers can show the rocket before the next snapshot.
    ProjectileSpawn { owner: String, origin: Vec3, vel: Vec3 },
    ItemPickup { item: String },
}

pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(message)
}

pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    bincode::deserialize(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MAX_HEALTH;
    use assert_approx_eq::assert_approx_eq;

    fn sample_player() -> PlayerState {
        PlayerState::new(
            "alice".to_string(),
            Vec3::new(1.23456, 5.0, -2.98765),
            "#FF5733".to_string(),
        )
    }

    #[test]
    fn test_pack_rounds_positional_fields() {
        let mut player = sample_player();
        player.yaw = 1.5708;

        let packed = PackedPlayer::pack(&player, 7, None);
        assert_approx_eq!(packed.pos.x, 1.23, 1e-6);
        assert_approx_eq!(packed.pos.z, -2.99, 1e-6);
        assert_approx_eq!(packed.yaw, 1.57, 1e-6);
        assert_eq!(packed.health, MAX_HEALTH);
        assert_eq!(packed.seq, 7);
        assert_eq!(packed.color, None);
    }

    #[test]
    fn test_own_claim_roundtrip() {
        let packed = PackedPlayer::pack(&sample_player(), 42, None);
        let message = Message::StateUpdate(StatePayload::Own(packed.clone()));

        let bytes = encode(&message).unwrap();
        match decode(&bytes).unwrap() {
            Message::StateUpdate(StatePayload::Own(row)) => assert_eq!(row, packed),
            _ => panic!("Wrong message type after decode"),
        }
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_rows() {
        let mut bob = sample_player();
        bob.id = "bob".to_string();
        bob.weapon = WeaponKind::Rocket;
        bob.rocket_ammo = 3;

        let rows = vec![
            PackedPlayer::pack(&sample_player(), 9, Some("#FF5733".to_string())),
            PackedPlayer::pack(&bob, 9, None),
        ];
        let message = Message::StateUpdate(StatePayload::Snapshot(rows.clone()));

        let bytes = encode(&message).unwrap();
        match decode(&bytes).unwrap() {
            Message::StateUpdate(StatePayload::Snapshot(decoded)) => {
                assert_eq!(decoded, rows);
                assert_eq!(decoded[1].weapon, WeaponKind::Rocket);
                assert_eq!(decoded[1].rocket_ammo, 3);
            }
            _ => panic!("Wrong message type after decode"),
        }
    }

    #[test]
    fn test_hit_claim_roundtrip() {
        let message = Message::HitClaim {
            target: "bob".to_string(),
            damage_hint: 15,
        };
        let bytes = encode(&message).unwrap();
        match decode(&bytes).unwrap() {
            Message::HitClaim { target, damage_hint } => {
                assert_eq!(target, "bob");
                assert_eq!(damage_hint, 15);
            }
            _ => panic!("Wrong message type after decode"),
        }
    }

    #[test]
    fn test_projectile_spawn_roundtrip() {
        let message = Message::ProjectileSpawn {
            owner: "alice".to_string(),
            origin: Vec3::new(0.0, 1.6, 0.0),
            vel: Vec3::new(0.0, 0.0, 0.32),
        };
        let bytes = encode(&message).unwrap();
        match decode(&bytes).unwrap() {
            Message::ProjectileSpawn { owner, origin, vel } => {
                assert_eq!(owner, "alice");
                assert_approx_eq!(origin.y, 1.6, 1e-6);
                assert_approx_eq!(vel.z, 0.32, 1e-6);
            }
            _ => panic!("Wrong message type after decode"),
        }
    }

    #[test]
    fn test_item_pickup_roundtrip() {
        let message = Message::ItemPickup {
            item: "ammo_east".to_string(),
        };
        let bytes = encode(&message).unwrap();
        match decode(&bytes).unwrap() {
            Message::ItemPickup { item } => assert_eq!(item, "ammo_east"),
            _ => panic!("Wrong message type after decode"),
        }
    }

    #[test]
    fn test_decode_fails_closed_on_garbage() {
        assert!(decode(&[0xff, 0xfe, 0xfd, 0xfc, 0xfb]).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_decode_fails_closed_on_truncation() {
        let message = Message::StateUpdate(StatePayload::Own(PackedPlayer::pack(
            &sample_player(),
            1,
            None,
        )));
        let bytes = encode(&message).unwrap();
        assert!(decode(&bytes[..bytes.len() / 2]).is_err());
    }
}
