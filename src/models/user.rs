use super::role::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// How the account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Password,
    Google,
}

impl AuthProvider {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AuthProvider::Password => "password",
            AuthProvider::Google => "google",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "password" => Some(AuthProvider::Password),
            "google" => Some(AuthProvider::Google),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub provider: AuthProvider,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reduced user projection embedded in staff listings.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}
