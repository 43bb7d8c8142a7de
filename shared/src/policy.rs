//! Per-field ownership table. The authority's claim path and the replica's
//! merge path both read this table instead of hard-coding the split.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    Position,
    Yaw,
    Weapon,
    Health,
    RocketAmmo,
    ItemAvailability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// The authority's value always supersedes local prediction.
    AuthorityWins,
    /// The participant's own value survives reconciliation; the authority
    /// echoes it back and only large divergence forces a correction.
    ClientWins,
}

pub const fn field_policy(field: StateField) -> FieldPolicy {
    match field {
        StateField::Position | StateField::Yaw | StateField::Weapon => FieldPolicy::ClientWins,
        StateField::Health | StateField::RocketAmmo | StateField::ItemAvailability => {
            FieldPolicy::AuthorityWins
        }
    }
}

pub const fn client_owns(field: StateField) -> bool {
    matches!(field_policy(field), FieldPolicy::ClientWins)
}

pub const fn authority_owns(field: StateField) -> bool {
    matches!(field_policy(field), FieldPolicy::AuthorityWins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_fields_are_client_owned() {
        assert!(client_owns(StateField::Position));
        assert!(client_owns(StateField::Yaw));
        assert!(client_owns(StateField::Weapon));
    }

    #[test]
    fn test_combat_fields_are_authority_owned() {
        assert!(authority_owns(StateField::Health));
        assert!(authority_owns(StateField::RocketAmmo));
        assert!(authority_owns(StateField::ItemAvailability));
    }

    #[test]
    fn test_every_field_has_exactly_one_owner() {
        let fields = [
            StateField::Position,
            StateField::Yaw,
            StateField::Weapon,
            StateField::Health,
            StateField::RocketAmmo,
            StateField::ItemAvailability,
        ];
        for field in fields {
            assert_ne!(client_owns(field), authority_owns(field));
        }
    }
}
