/// Code related to verifying user permissions.
use serde::{Deserialize, Serialize};

use crate::moderation::ContentKind;

/// Coarse authorization tiers, lowest first. The derived order is the
/// permission order: a role can do everything the roles below it can.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "account_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular visitor. Can submit content and manage their own profile.
    User,
    /// Moderates the high-volume queues (tributes, gallery).
    Editor,
    /// Editor powers plus recordings and the contact inbox.
    Manager,
    /// Site administrator. May also hand out roles below their own.
    Admin,
    /// Site owner tier. Not assignable through the API; seeded directly.
    SuperAdmin,
}

impl Role {
    /// Minimum tier allowed to moderate a given content kind. Tributes and
    /// gallery images are the bulk of the queue; recordings are rarer and
    /// stay with managers.
    pub fn required_to_moderate(kind: ContentKind) -> Role {
        match kind {
            ContentKind::Tribute | ContentKind::Gallery => Role::Editor,
            ContentKind::Video | ContentKind::Audio => Role::Manager,
        }
    }

    /// Whether `self` may change `target`'s role to `new_role`. Requires
    /// admin standing and strictly outranking both the target's current role
    /// and the role being handed out, so nobody can promote a peer (or
    /// themselves) to their own tier.
    pub fn can_assign(self, target: Role, new_role: Role) -> bool {
        self >= Role::Admin && self > target && self > new_role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Role::User < Role::Editor);
        assert!(Role::Editor < Role::Manager);
        assert!(Role::Manager < Role::Admin);
        assert!(Role::Admin < Role::SuperAdmin);
    }

    mod can_assign {
        use super::*;

        #[test]
        fn admin_hands_out_lower_roles() {
            assert!(Role::Admin.can_assign(Role::User, Role::Editor));
            assert!(Role::Admin.can_assign(Role::Manager, Role::User));
            assert!(Role::SuperAdmin.can_assign(Role::Admin, Role::User));
            assert!(Role::SuperAdmin.can_assign(Role::User, Role::Admin));
        }

        #[test]
        fn below_admin_assigns_nothing() {
            assert!(!Role::Manager.can_assign(Role::User, Role::Editor));
            assert!(!Role::Editor.can_assign(Role::User, Role::User));
        }

        #[test]
        fn cannot_touch_own_tier_or_above() {
            // Peers are out of reach, and so is minting a peer.
            assert!(!Role::Admin.can_assign(Role::Admin, Role::User));
            assert!(!Role::Admin.can_assign(Role::User, Role::Admin));
            assert!(!Role::Admin.can_assign(Role::SuperAdmin, Role::User));
        }

        #[test]
        fn super_admin_is_never_assignable() {
            assert!(!Role::SuperAdmin.can_assign(Role::User, Role::SuperAdmin));
            assert!(!Role::Admin.can_assign(Role::User, Role::SuperAdmin));
        }

        #[test]
        fn self_assignment_is_impossible() {
            // actor == target means the strict outranking check fails.
            for role in [Role::Admin, Role::SuperAdmin] {
                assert!(!role.can_assign(role, Role::User));
            }
        }
    }

    #[test]
    fn moderation_gates() {
        assert_eq!(
            Role::required_to_moderate(ContentKind::Tribute),
            Role::Editor
        );
        assert_eq!(
            Role::required_to_moderate(ContentKind::Gallery),
            Role::Editor
        );
        assert_eq!(Role::required_to_moderate(ContentKind::Video), Role::Manager);
        assert_eq!(Role::required_to_moderate(ContentKind::Audio), Role::Manager);
    }
}
