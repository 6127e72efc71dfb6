use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse role string handed over by the session collaborator.
/// The engine never authenticates; it only uses the role to redact sensitive statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Leader,
    Stakeholder,
    #[default]
    Public, // Unauthenticated visitor
}

impl Role {
    /// Parse a role string. Unknown or empty strings fall back to `Public`.
    pub fn from_session(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => Role::Admin,
            Some("leader") | Some("pimpinan") => Role::Leader,
            Some("stakeholder") => Role::Stakeholder,
            _ => Role::Public,
        }
    }

    /// Whether sensitive derived statistics (unauthorized dump counts) may be shown.
    #[inline] pub fn can_view_sensitive(&self) -> bool { !matches!(self, Role::Public) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Leader => "leader",
            Role::Stakeholder => "stakeholder",
            Role::Public => "public",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_case_insensitively() {
        assert_eq!(Role::from_session(Some("Admin")), Role::Admin);
        assert_eq!(Role::from_session(Some(" leader ")), Role::Leader);
        assert_eq!(Role::from_session(Some("stakeholder")), Role::Stakeholder);
    }

    #[test]
    fn unknown_or_missing_is_public() {
        assert_eq!(Role::from_session(None), Role::Public);
        assert_eq!(Role::from_session(Some("guest")), Role::Public);
        assert!(!Role::Public.can_view_sensitive());
        assert!(Role::Stakeholder.can_view_sensitive());
    }
}
