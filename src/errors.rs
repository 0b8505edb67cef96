//! Unified application error type.
//! All modules (db, core, api, cli) return AppError so the HTTP layer and
//! the CLI can map failures in one place.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Validation errors
    // ---------------------------
    #[error("{0}")]
    Validation(String),

    #[error("Invalid coordinates")]
    InvalidCoordinates,

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    // ---------------------------
    // Authentication / authorization
    // ---------------------------
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unauthorized")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User already exists. Please login to continue")]
    UserExists,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    // ---------------------------
    // Clock state machine
    // ---------------------------
    #[error("Already clocked in")]
    AlreadyClockedIn,

    #[error("Not clocked in")]
    NotClockedIn,

    #[error("No perimeter configured")]
    NoPerimetersConfigured,

    #[error("Outside perimeter")]
    OutsidePerimeter { distance_meters: i64 },

    // ---------------------------
    // Config / external services
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// HTTP status code this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_)
            | AppError::InvalidCoordinates
            | AppError::InvalidDate(_)
            | AppError::InvalidRole(_)
            | AppError::InvalidCredentials
            | AppError::UserExists
            | AppError::AlreadyClockedIn
            | AppError::NotClockedIn
            | AppError::NoPerimetersConfigured => 400,

            AppError::Unauthorized | AppError::Token(_) => 401,

            AppError::Forbidden | AppError::OutsidePerimeter { .. } => 403,

            AppError::NotFound => 404,

            AppError::Io(_)
            | AppError::Db(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::OAuth(_)
            | AppError::Other(_) => 500,
        }
    }

    /// True for failures whose detail must stay server-side.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

pub type AppResult<T> = Result<T, AppError>;
