//! Header sniffing: which column of an imported sheet plays which role.

use serde::Serialize;
use std::fmt;

/// Accepted spellings for the repair status column, in resolution order
pub const STATUS_ALIASES: &[&str] = &["Repair status", "repairStatus", "Repair Status", "Status"];

/// Accepted spellings for the priority column, in resolution order
pub const PRIORITY_ALIASES: &[&str] = &["Priority", "priority"];

/// Semantic column category, independent of the literal header spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Status,
    Priority,
}

impl Role {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Role::Status => STATUS_ALIASES,
            Role::Priority => PRIORITY_ALIASES,
        }
    }

    /// Canonical header shown to users when the role is missing
    pub fn label(self) -> &'static str {
        self.aliases()[0]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Status => f.write_str("status"),
            Role::Priority => f.write_str("priority"),
        }
    }
}

/// Resolve the column playing `role` among `columns`
///
/// Walks the alias list of the role in declared order and returns the first
/// alias present in `columns`, regardless of where that column sits in the
/// table. Matching is exact and case sensitive.
///
/// # Examples
/// ```
/// use fleet_dashboard::columns::{Role, resolve};
///
/// let columns = ["Priority", "repairStatus", "Status"];
/// assert_eq!(resolve(&columns, Role::Status), Some("repairStatus"));
/// assert_eq!(resolve(&columns, Role::Priority), Some("Priority"));
/// assert_eq!(resolve(&["Comments"], Role::Status), None);
/// ```
pub fn resolve<S: AsRef<str>>(columns: &[S], role: Role) -> Option<&'static str> {
    role.aliases()
        .iter()
        .copied()
        .find(|alias| columns.iter().any(|c| c.as_ref() == *alias))
}
