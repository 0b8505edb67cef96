use serde::{Deserialize, Serialize};

/// Closed set of user roles. Authorization matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Manager,
    Admin,
}

impl Role {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "worker" => Some(Role::Worker),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Helper: parse user input (CLI or JSON), case-insensitive.
    /// Accepts the legacy `care_worker` spelling as an alias of `worker`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "care_worker" | "care-worker" => Some(Role::Worker),
            other => Role::from_db_str(other),
        }
    }
}
