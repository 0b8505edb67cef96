//! Account logic: password hashing, bearer tokens, register / login,
//! federated upsert and role changes.

use crate::config::Config;
use crate::core::policy::{self, Principal};
use crate::db::log::audit;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::role::Role;
use crate::models::user::{AuthProvider, User};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

// ---------------------------
// Passwords
// ---------------------------

/// Argon2id with default parameters, stored as a PHC string
/// (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`).
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| AppError::Other(format!("password salt: {e}")))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Other(format!("password hash: {e}")))?;

    Ok(hash.to_string())
}

/// `false` for a wrong password and for anything that is not a PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

// ---------------------------
// Tokens
// ---------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(user_id: &str, cfg: &Config) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(cfg.token_ttl_hours)).timestamp(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )?)
}

pub fn verify_token(token: &str, cfg: &Config) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Token → verified principal. The role is read from storage so a role
/// change takes effect without re-issuing tokens.
pub fn authenticate(conn: &Connection, token: &str, cfg: &Config) -> AppResult<Principal> {
    let claims = verify_token(token, cfg)?;
    let user = queries::find_user_by_id(conn, &claims.sub)?.ok_or(AppError::Unauthorized)?;
    Ok(Principal::new(user.id, user.role))
}

// ---------------------------
// Accounts
// ---------------------------

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required<'a>(value: Option<&'a str>) -> Option<&'a str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub struct AuthLogic;

impl AuthLogic {
    pub fn register(
        conn: &Connection,
        email: Option<&str>,
        name: Option<&str>,
        password: Option<&str>,
    ) -> AppResult<User> {
        let (Some(email), Some(name), Some(password)) =
            (required(email), required(name), password.filter(|p| !p.is_empty()))
        else {
            return Err(AppError::Validation(
                "Email, name, and password are required".to_string(),
            ));
        };

        let email = normalize_email(email);
        if queries::find_user_by_email(conn, &email)?.is_some() {
            return Err(AppError::UserExists);
        }

        let user = User {
            id: queries::new_id(),
            email,
            name: name.to_string(),
            role: Role::Worker,
            provider: AuthProvider::Password,
            password_hash: Some(hash_password(password)?),
            created_at: Utc::now(),
        };
        queries::insert_user(conn, &user)?;

        audit(conn, "register", &user.id, &format!("Registered {}", user.email))?;
        tracing::info!(user_id = %user.id, "user registered");

        Ok(user)
    }

    pub fn login(conn: &Connection, email: Option<&str>, password: Option<&str>) -> AppResult<User> {
        let (Some(email), Some(password)) = (required(email), password) else {
            return Err(AppError::InvalidCredentials);
        };

        let user = queries::find_user_by_email(conn, &normalize_email(email))?
            .ok_or(AppError::InvalidCredentials)?;

        match &user.password_hash {
            Some(stored) if verify_password(password, stored) => Ok(user),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    /// Find-or-create an account for a federated identity, keyed by email.
    pub fn upsert_federated(conn: &Connection, email: &str, name: Option<&str>) -> AppResult<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::OAuth("identity provider returned no email".into()));
        }

        if let Some(existing) = queries::find_user_by_email(conn, &email)? {
            if let Some(n) = required(name)
                && n != existing.name
            {
                queries::update_user_name(conn, &existing.id, n)?;
                return Ok(User {
                    name: n.to_string(),
                    ..existing
                });
            }
            return Ok(existing);
        }

        let user = User {
            id: queries::new_id(),
            name: required(name).unwrap_or(email.as_str()).to_string(),
            email,
            role: Role::Worker,
            provider: AuthProvider::Google,
            password_hash: None,
            created_at: Utc::now(),
        };
        queries::insert_user(conn, &user)?;
        audit(conn, "register", &user.id, &format!("Registered {} via google", user.email))?;

        Ok(user)
    }

    pub fn change_role(
        conn: &Connection,
        principal: &Principal,
        target_user_id: &str,
        role: Role,
    ) -> AppResult<User> {
        policy::can_change_role(principal, target_user_id, role)?;

        if !queries::update_user_role(conn, target_user_id, role)? {
            return Err(AppError::NotFound);
        }
        audit(
            conn,
            "role",
            target_user_id,
            &format!("Role set to {} by {}", role.to_db_str(), principal.user_id),
        )?;

        queries::find_user_by_id(conn, target_user_id)?.ok_or(AppError::NotFound)
    }

    /// Operator path (local CLI with direct database access): no caller,
    /// no policy. Used to bootstrap the first admin.
    pub fn assign_role(conn: &Connection, email: &str, role: Role) -> AppResult<User> {
        let user =
            queries::find_user_by_email(conn, &normalize_email(email))?.ok_or(AppError::NotFound)?;

        queries::update_user_role(conn, &user.id, role)?;
        audit(
            conn,
            "role",
            &user.id,
            &format!("Role set to {} from the command line", role.to_db_str()),
        )?;

        Ok(User { role, ..user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::DbPool;
    use crate::db::initialize::init_db;

    fn cfg(secret: &str, ttl: i64) -> Config {
        Config {
            jwt_secret: secret.into(),
            token_ttl_hours: ttl,
            ..Config::default()
        }
    }

    fn pool() -> DbPool {
        let pool = DbPool::in_memory().unwrap();
        init_db(&pool.conn).unwrap();
        pool
    }

    #[test]
    fn password_hash_verifies_and_is_salted() {
        let a = hash_password("hunter2").unwrap();
        let b = hash_password("hunter2").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(verify_password("hunter2", &a));
        assert!(!verify_password("hunter3", &a));
        assert!(!verify_password("hunter2", "garbage"));
        assert!(!verify_password("hunter2", ""));
    }

    #[test]
    fn token_round_trip_and_rejections() {
        let token = issue_token("user-1", &cfg("secret", 1)).unwrap();
        assert_eq!(verify_token(&token, &cfg("secret", 1)).unwrap().sub, "user-1");
        assert!(matches!(
            verify_token(&token, &cfg("other", 1)),
            Err(AppError::Token(_))
        ));

        let expired = issue_token("user-1", &cfg("secret", -2)).unwrap();
        assert!(verify_token(&expired, &cfg("secret", 1)).is_err());
    }

    #[test]
    fn register_then_login() {
        let pool = pool();
        let user =
            AuthLogic::register(&pool.conn, Some(" Ann@Example.com "), Some("Ann"), Some("pw")).unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.role, Role::Worker);

        let logged = AuthLogic::login(&pool.conn, Some("ann@example.com"), Some("pw")).unwrap();
        assert_eq!(logged.id, user.id);

        assert!(matches!(
            AuthLogic::login(&pool.conn, Some("ann@example.com"), Some("nope")),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            AuthLogic::login(&pool.conn, Some("ghost@example.com"), Some("pw")),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn register_rejects_missing_fields_and_duplicates() {
        let pool = pool();
        assert!(matches!(
            AuthLogic::register(&pool.conn, Some("a@b.c"), None, Some("pw")),
            Err(AppError::Validation(_))
        ));

        AuthLogic::register(&pool.conn, Some("a@b.c"), Some("A"), Some("pw")).unwrap();
        assert!(matches!(
            AuthLogic::register(&pool.conn, Some("a@b.c"), Some("A2"), Some("pw")),
            Err(AppError::UserExists)
        ));
    }

    #[test]
    fn federated_upsert_reuses_account_and_blocks_password_login() {
        let pool = pool();
        let first = AuthLogic::upsert_federated(&pool.conn, "g@x.io", Some("Gee")).unwrap();
        let second = AuthLogic::upsert_federated(&pool.conn, "G@x.io", Some("Gee")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.provider, AuthProvider::Google);

        assert!(matches!(
            AuthLogic::login(&pool.conn, Some("g@x.io"), Some("")),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn authenticate_reads_current_role() {
        let pool = pool();
        let user = AuthLogic::register(&pool.conn, Some("m@x.io"), Some("M"), Some("pw")).unwrap();
        let cfg = cfg("k", 1);
        let token = issue_token(&user.id, &cfg).unwrap();

        let me = Principal::new(user.id.clone(), Role::Worker);
        AuthLogic::change_role(&pool.conn, &me, &user.id, Role::Manager).unwrap();

        let principal = authenticate(&pool.conn, &token, &cfg).unwrap();
        assert_eq!(principal.role, Role::Manager);
    }
}
