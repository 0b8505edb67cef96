//! Role-based access rules. Every check matches `Role` exhaustively.

use crate::errors::{AppError, AppResult};
use crate::models::role::Role;

/// Verified caller identity, produced by the authentication step and
/// passed by value into every operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Active-staff list, dashboard and perimeter management.
pub fn require_manager(principal: &Principal) -> AppResult<()> {
    match principal.role {
        Role::Manager | Role::Admin => Ok(()),
        Role::Worker => Err(AppError::Forbidden),
    }
}

/// Workers see only their own logs; managers and admins see everyone's.
pub fn can_view_logs(principal: &Principal, target_user_id: &str) -> AppResult<()> {
    match principal.role {
        Role::Manager | Role::Admin => Ok(()),
        Role::Worker if principal.user_id == target_user_id => Ok(()),
        Role::Worker => Err(AppError::Forbidden),
    }
}

/// Role changes: anyone may switch themselves between worker and manager;
/// granting admin or touching another account needs an admin.
pub fn can_change_role(principal: &Principal, target_user_id: &str, new_role: Role) -> AppResult<()> {
    if principal.role == Role::Admin {
        return Ok(());
    }

    let is_self = principal.user_id == target_user_id;
    match new_role {
        Role::Worker | Role::Manager if is_self => Ok(()),
        Role::Worker | Role::Manager | Role::Admin => Err(AppError::Forbidden),
    }
}
