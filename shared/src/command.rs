use crate::model::{Vec3, WeaponKind};

/// Local player intent fed into a session by the driving binary. The same
/// stream shape serves the host (whose player skips the wire but not the
/// validator) and clients.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    Move { pos: Vec3, yaw: f32 },
    SelectWeapon(WeaponKind),
    /// Pistol fire needs an aimed-at target; rocket fire launches along
    /// the current yaw and ignores the target.
    Fire { target: Option<String> },
    Pickup { item: String },
}
