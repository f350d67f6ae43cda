//! Application state for Axum web framework.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Settings, StorageBackend};
use crate::db;
use crate::error::AppResult;
use crate::repositories::{DynUserRepository, MemoryUserRepository, PgUserRepository};
use crate::services::Services;
use crate::utils::jwt::TokenVerifier;

/// Shared state handed to every handler and middleware.
///
/// Cloning is cheap: services share one repository handle behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Whole-request timeout applied by the router
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires services over an existing repository.
    pub fn new(users: DynUserRepository, settings: &Settings) -> AppResult<Self> {
        let verifier = TokenVerifier::new(
            &settings.jwt.secret,
            settings.jwt.access_token_expiration,
        );
        Ok(Self {
            services: Services::new(users, verifier, settings.orders.utc_offset_minutes)?,
            request_timeout: Duration::from_secs(settings.server.request_timeout),
        })
    }

    /// Builds the repository selected by `database.backend`, running pending
    /// migrations first when `database.auto_migrate` is set.
    ///
    /// # Example
    /// ```ignore
    /// let state = AppState::from_settings(&settings).await?;
    /// let router = create_router(state);
    /// ```
    pub async fn from_settings(settings: &Settings) -> AppResult<Self> {
        let database = &settings.database;
        let users: DynUserRepository = match database.backend {
            StorageBackend::Postgres => {
                if database.auto_migrate {
                    let applied = db::run_pending_migrations(&database.url).await?;
                    tracing::info!(count = applied.len(), "Pending migrations applied");
                }
                let pool = db::establish_async_connection_pool(database).await?;
                Arc::new(PgUserRepository::new(pool, database.query_timeout()))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Arc::new(MemoryUserRepository::new())
            }
        };

        Self::new(users, settings)
    }
}
