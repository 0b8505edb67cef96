//! JSON HTTP surface (axum). Handlers are thin: extract, lock the
//! connection, call into `core`, serialize.

mod auth;
mod clock;
mod dto;
mod error;
mod extract;
mod perimeters;

use crate::config::Config;
use crate::core::oauth::{GoogleProvider, IdentityProvider};
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use axum::Router;
use axum::routing::get;
use parking_lot::Mutex;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared server state. One SQLite connection, serialized by the mutex.
/// Handlers reach it through [`AppState::with_db`] only.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<DbPool>>,
    pub config: Arc<Config>,
    pub oauth: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let oauth = GoogleProvider::from_config(&config)
            .map(|p| Arc::new(p) as Arc<dyn IdentityProvider>);

        Self {
            db: Arc::new(Mutex::new(pool)),
            config: Arc::new(config),
            oauth,
        }
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.oauth = Some(provider);
        self
    }

    /// Run storage work on the blocking pool. The lock is taken inside the
    /// blocking task and released when `f` returns.
    pub async fn with_db<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut DbPool) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut pool = db.lock();
            f(&mut *pool)
        })
        .await
        .map_err(|e| AppError::Other(format!("storage task failed: {e}")))?
    }
}

async fn root() -> &'static str {
    "staffclock API is running"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(auth::routes())
        .merge(clock::routes())
        .merge(perimeters::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, bind: &str) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
