//! Server module for managing HTTP server lifecycle
//!
//! This module handles server initialization, startup, and graceful shutdown.

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::{Settings, StorageBackend};
use crate::state::AppState;

/// HTTP server manager
pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Builds state, binds the configured address and serves until Ctrl+C or
    /// SIGTERM.
    ///
    /// # Errors
    /// - storage initialization (pool, auto-migration)
    /// - address binding
    /// - server runtime errors
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %self.settings.application.environment,
            "Application starting"
        );
        tracing::info!(
            host = %self.settings.server.host,
            port = self.settings.server.port,
            request_timeout = self.settings.server.request_timeout,
            "Server configuration loaded"
        );
        tracing::info!(
            backend = ?self.settings.database.backend,
            max_connections = self.settings.database.max_connections,
            query_timeout_ms = self.settings.database.query_timeout,
            auto_migrate = self.settings.database.auto_migrate,
            "Storage configuration loaded"
        );
        tracing::info!(
            access_token_expiration = self.settings.jwt.access_token_expiration,
            utc_offset_minutes = self.settings.orders.utc_offset_minutes,
            "Token and order configuration loaded"
        );

        if self.settings.application.environment.is_production()
            && self.settings.database.backend == StorageBackend::Memory
        {
            tracing::warn!(
                "Production environment is using the in-memory store; data will not survive a restart"
            );
        }

        let state = AppState::from_settings(&self.settings)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;
        let router = create_router(state);

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;

        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM. A signal handler that cannot be installed
/// is logged and treated as never firing.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
