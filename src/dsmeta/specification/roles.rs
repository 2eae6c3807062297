//! Roles and the permission templates built from them.

use crate::permissions::{Action, Permissions, Principals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    User,
}

pub type RoleUuids = BTreeMap<Role, Principals>;

/// Union of the principals holding any of `roles`.
///
/// `None` when no role map is configured, which leaves the action unrestricted.
pub fn select(role_uuids: Option<&RoleUuids>, roles: &[Role]) -> Option<Principals> {
    let role_uuids = role_uuids?;
    Some(
        roles
            .iter()
            .filter_map(|role| role_uuids.get(role))
            .flatten()
            .copied()
            .collect(),
    )
}

const OWNER: &[Role] = &[Role::Owner];
const EVERYONE: &[Role] = &[Role::Owner, Role::User];

/// Minimum permissions handed out by defaults and enforced by verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionTemplate {
    SharedNode,
    SharedAttribute,
    OwnerAttribute,
    /// Readable and writable by users, e.g. feature/target flags.
    AnalystAttribute,
}

impl PermissionTemplate {
    pub fn grants(&self) -> &'static [(Action, &'static [Role])] {
        match self {
            PermissionTemplate::SharedNode => &[
                (Action::Read, EVERYONE),
                (Action::WriteAttributes, OWNER),
                (Action::WriteChildNodes, OWNER),
                (Action::WritePermissions, OWNER),
            ],
            PermissionTemplate::SharedAttribute => &[
                (Action::Read, EVERYONE),
                (Action::WriteValue, OWNER),
                (Action::WritePermissions, OWNER),
            ],
            PermissionTemplate::OwnerAttribute => &[
                (Action::Read, OWNER),
                (Action::WriteValue, OWNER),
                (Action::WritePermissions, OWNER),
            ],
            PermissionTemplate::AnalystAttribute => &[
                (Action::Read, EVERYONE),
                (Action::WriteValue, EVERYONE),
                (Action::WritePermissions, OWNER),
            ],
        }
    }

    pub fn build(&self, role_uuids: Option<&RoleUuids>) -> Permissions {
        self.grants()
            .iter()
            .fold(Permissions::new(), |perms, (action, roles)| {
                perms.with(*action, select(role_uuids, roles))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn roles() -> RoleUuids {
        let mut roles = RoleUuids::new();
        roles.insert(Role::Owner, [Uuid::from_u128(1)].into());
        roles.insert(Role::User, [Uuid::from_u128(2)].into());
        roles
    }

    #[test]
    fn select_unions_roles() {
        let roles = roles();
        assert_eq!(
            select(Some(&roles), EVERYONE),
            Some([Uuid::from_u128(1), Uuid::from_u128(2)].into())
        );
        assert_eq!(select(Some(&roles), OWNER), Some([Uuid::from_u128(1)].into()));
        assert_eq!(select(None, OWNER), None);
    }

    #[test]
    fn owner_template_excludes_users() {
        let roles = roles();
        let perms = PermissionTemplate::OwnerAttribute.build(Some(&roles));
        let user: Principals = [Uuid::from_u128(2)].into();

        assert!(!Permissions::is_allowed(Some(&perms), Some(Action::Read), Some(&user)));
        let analyst = PermissionTemplate::AnalystAttribute.build(Some(&roles));
        assert!(Permissions::is_allowed(Some(&analyst), Some(Action::WriteValue), Some(&user)));
        assert!(!Permissions::is_allowed(
            Some(&analyst),
            Some(Action::WritePermissions),
            Some(&user)
        ));
    }

    #[test]
    fn templates_without_roles_are_unrestricted() {
        let perms = PermissionTemplate::SharedNode.build(None);
        assert_eq!(perms.get(Action::Read), Some(&None));
        assert!(!perms.contains(Action::WriteValue));
    }

    #[test]
    fn owner_template_nests_inside_shared() {
        let roles = roles();
        let owner = PermissionTemplate::OwnerAttribute.build(Some(&roles));
        let shared = PermissionTemplate::SharedAttribute.build(Some(&roles));
        assert!(Permissions::is_subset(Some(&owner), Some(&shared)));
        assert!(!Permissions::is_subset(Some(&shared), Some(&owner)));
    }
}
