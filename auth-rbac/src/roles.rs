use serde::{Deserialize, Serialize};

/// Canonical privilege levels, ordered by decreasing privilege.
///
/// `GlobalAdmin` is orthogonal to organization membership: it is derived from
/// the per-identity elevated-privilege flag and never stored on a membership
/// row. It exists here so legacy labels like "superadmin" normalize somewhere
/// instead of silently vanishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalRole {
    GlobalAdmin,
    Owner,
    Manager,
    Employee,
    Client,
}

impl CanonicalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalRole::GlobalAdmin => "global_admin",
            CanonicalRole::Owner => "owner",
            CanonicalRole::Manager => "manager",
            CanonicalRole::Employee => "employee",
            CanonicalRole::Client => "client",
        }
    }

    /// Privilege rank; lower is more privileged.
    pub fn rank(&self) -> u8 {
        match self {
            CanonicalRole::GlobalAdmin => 0,
            CanonicalRole::Owner => 1,
            CanonicalRole::Manager => 2,
            CanonicalRole::Employee => 3,
            CanonicalRole::Client => 4,
        }
    }

    pub fn at_least(&self, other: CanonicalRole) -> bool {
        self.rank() <= other.rank()
    }

    pub const ALL: [CanonicalRole; 5] = [
        CanonicalRole::GlobalAdmin,
        CanonicalRole::Owner,
        CanonicalRole::Manager,
        CanonicalRole::Employee,
        CanonicalRole::Client,
    ];
}

impl std::fmt::Display for CanonicalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw role label (current or historical) onto the canonical enum.
///
/// Total and deterministic: unrecognized input yields `None`, and `None`
/// must be treated as "no organization-level privilege", never defaulted
/// upward. Matching ignores case, surrounding whitespace, and `-`/` `
/// separators.
pub fn normalize(raw: &str) -> Option<CanonicalRole> {
    let key = raw
        .trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_");
    let role = match key.as_str() {
        "global_admin" | "globaladmin" | "super_admin" | "superadmin" | "platform_admin"
        | "root" => CanonicalRole::GlobalAdmin,
        "owner" | "top_admin" | "topadmin" | "org_owner" | "organization_owner" | "founder" => {
            CanonicalRole::Owner
        }
        "manager" | "admin" | "administrator" | "org_admin" | "project_manager" | "team_lead" => {
            CanonicalRole::Manager
        }
        "employee" | "member" | "staff" | "contributor" | "collaborator" | "user" => {
            CanonicalRole::Employee
        }
        "client" | "viewer" | "guest" | "customer" | "external" | "read_only" | "readonly" => {
            CanonicalRole::Client
        }
        _ => return None,
    };
    Some(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_names_normalize_to_themselves() {
        for role in CanonicalRole::ALL {
            assert_eq!(normalize(role.as_str()), Some(role));
        }
    }

    #[test]
    fn legacy_aliases_map_to_exactly_one_canonical_role() {
        assert_eq!(normalize("viewer"), Some(CanonicalRole::Client));
        assert_eq!(normalize("staff"), Some(CanonicalRole::Employee));
        assert_eq!(normalize("member"), Some(CanonicalRole::Employee));
        assert_eq!(normalize("admin"), Some(CanonicalRole::Manager));
        assert_eq!(normalize("org_admin"), Some(CanonicalRole::Manager));
        assert_eq!(normalize("top_admin"), Some(CanonicalRole::Owner));
        assert_eq!(normalize("founder"), Some(CanonicalRole::Owner));
        assert_eq!(normalize("superadmin"), Some(CanonicalRole::GlobalAdmin));
    }

    #[test]
    fn matching_is_case_and_separator_insensitive() {
        assert_eq!(normalize("  Viewer "), Some(CanonicalRole::Client));
        assert_eq!(normalize("Org-Admin"), Some(CanonicalRole::Manager));
        assert_eq!(normalize("READ ONLY"), Some(CanonicalRole::Client));
    }

    #[test]
    fn unknown_labels_grant_nothing() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("intern"), None);
        assert_eq!(normalize("owner2"), None);
    }

    #[test]
    fn privilege_order_is_strictly_decreasing() {
        let ranks: Vec<u8> = CanonicalRole::ALL.iter().map(|r| r.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ranks, sorted);
        assert!(CanonicalRole::Owner.at_least(CanonicalRole::Client));
        assert!(!CanonicalRole::Client.at_least(CanonicalRole::Employee));
    }

    proptest! {
        #[test]
        fn normalize_is_total(raw in ".{0,64}") {
            // Must never panic, whatever the input.
            let _ = normalize(&raw);
        }

        #[test]
        fn normalize_is_idempotent(raw in ".{0,64}") {
            if let Some(role) = normalize(&raw) {
                prop_assert_eq!(normalize(role.as_str()), Some(role));
            }
        }
    }
}
