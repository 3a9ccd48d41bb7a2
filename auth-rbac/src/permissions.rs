use crate::roles::CanonicalRole;

/// Fine-grained permission tokens, `resource:verb`.
pub mod tokens {
    pub const PROJECT_CREATE: &str = "project:create";
    pub const PROJECT_READ: &str = "project:read";
    pub const PROJECT_UPDATE: &str = "project:update";
    pub const PROJECT_DELETE: &str = "project:delete";
    pub const TASK_CREATE: &str = "task:create";
    pub const TASK_READ: &str = "task:read";
    pub const TASK_UPDATE: &str = "task:update";
    pub const TASK_DELETE: &str = "task:delete";
    pub const COMMENT_CREATE: &str = "comment:create";
    pub const MEMBER_READ: &str = "member:read";
    pub const MEMBER_MANAGE: &str = "member:manage";
    pub const ORG_MANAGE: &str = "org:manage";
}

use tokens::*;

const ALL_PERMISSIONS: &[&str] = &[
    PROJECT_CREATE,
    PROJECT_READ,
    PROJECT_UPDATE,
    PROJECT_DELETE,
    TASK_CREATE,
    TASK_READ,
    TASK_UPDATE,
    TASK_DELETE,
    COMMENT_CREATE,
    MEMBER_READ,
    MEMBER_MANAGE,
    ORG_MANAGE,
];

const MANAGER_PERMISSIONS: &[&str] = &[
    PROJECT_CREATE,
    PROJECT_READ,
    PROJECT_UPDATE,
    PROJECT_DELETE,
    TASK_CREATE,
    TASK_READ,
    TASK_UPDATE,
    TASK_DELETE,
    COMMENT_CREATE,
    MEMBER_READ,
    MEMBER_MANAGE,
];

const EMPLOYEE_PERMISSIONS: &[&str] = &[
    PROJECT_READ,
    TASK_CREATE,
    TASK_READ,
    TASK_UPDATE,
    COMMENT_CREATE,
    MEMBER_READ,
];

// Clients are external read-only collaborators who may still comment.
const CLIENT_PERMISSIONS: &[&str] = &[PROJECT_READ, TASK_READ, COMMENT_CREATE];

/// Static permission set per canonical role. Fixed tables, independent of
/// organization.
pub fn role_permissions(role: CanonicalRole) -> &'static [&'static str] {
    match role {
        CanonicalRole::GlobalAdmin | CanonicalRole::Owner => ALL_PERMISSIONS,
        CanonicalRole::Manager => MANAGER_PERMISSIONS,
        CanonicalRole::Employee => EMPLOYEE_PERMISSIONS,
        CanonicalRole::Client => CLIENT_PERMISSIONS,
    }
}

/// Expand a coarse endpoint action label into fine-grained permission
/// tokens. Labels already in `resource:verb` form pass through unchanged;
/// unknown coarse labels expand to nothing, which downstream checks treat
/// as a denial.
pub fn expand_action(action: &str) -> Vec<&str> {
    match action {
        "create_project" => vec![PROJECT_CREATE],
        "view_project" | "list_projects" => vec![PROJECT_READ],
        "update_project" => vec![PROJECT_UPDATE],
        "delete_project" => vec![PROJECT_DELETE],
        "create_task" => vec![TASK_CREATE],
        "view_task" | "list_tasks" => vec![TASK_READ],
        "update_task" | "move_task" => vec![TASK_UPDATE],
        "assign_task" => vec![TASK_UPDATE, MEMBER_READ],
        "delete_task" => vec![TASK_DELETE],
        "comment" | "create_comment" => vec![COMMENT_CREATE],
        "view_members" | "list_members" => vec![MEMBER_READ],
        "invite_member" | "remove_member" | "change_role" | "manage_members" => {
            vec![MEMBER_MANAGE]
        }
        "update_organization" | "manage_billing" | "delete_organization" => vec![ORG_MANAGE],
        other if other.contains(':') => vec![other],
        _ => vec![],
    }
}

/// ANY semantics: the role's set intersects the requested tokens.
pub fn role_allows_any(role: CanonicalRole, requested: &[&str]) -> bool {
    let granted = role_permissions(role);
    requested.iter().any(|token| granted.contains(token))
}

/// ALL semantics for stricter call sites.
pub fn role_allows_all(role: CanonicalRole, requested: &[&str]) -> bool {
    let granted = role_permissions(role);
    !requested.is_empty() && requested.iter().all(|token| granted.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_role_excludes_task_write() {
        let requested = expand_action("create_task");
        assert!(!role_allows_any(CanonicalRole::Client, &requested));
        assert!(role_allows_any(CanonicalRole::Employee, &requested));
    }

    #[test]
    fn owner_holds_every_permission() {
        for token in ALL_PERMISSIONS {
            assert!(role_allows_any(CanonicalRole::Owner, &[token]));
        }
    }

    #[test]
    fn manager_cannot_manage_organization() {
        assert!(!role_allows_any(
            CanonicalRole::Manager,
            &expand_action("manage_billing")
        ));
        assert!(role_allows_any(
            CanonicalRole::Manager,
            &expand_action("manage_members")
        ));
    }

    #[test]
    fn coarse_labels_expand_to_canonical_tokens() {
        assert_eq!(expand_action("create_project"), vec![tokens::PROJECT_CREATE]);
        assert_eq!(
            expand_action("assign_task"),
            vec![tokens::TASK_UPDATE, tokens::MEMBER_READ]
        );
    }

    #[test]
    fn fine_grained_labels_pass_through() {
        assert_eq!(expand_action("task:delete"), vec![tokens::TASK_DELETE]);
    }

    #[test]
    fn unknown_actions_expand_to_nothing() {
        assert!(expand_action("launch_rocket").is_empty());
        assert!(!role_allows_all(CanonicalRole::Owner, &[]));
    }

    #[test]
    fn any_and_all_semantics_differ() {
        // Client can read members? No; can update tasks? No. Employee can
        // update tasks but assign_task also needs member:read, which the
        // employee set includes.
        let requested = expand_action("assign_task");
        assert!(role_allows_all(CanonicalRole::Employee, &requested));
        assert!(!role_allows_any(CanonicalRole::Client, &requested));

        let mixed = [tokens::TASK_READ, tokens::ORG_MANAGE];
        assert!(role_allows_any(CanonicalRole::Client, &mixed));
        assert!(!role_allows_all(CanonicalRole::Client, &mixed));
    }
}
