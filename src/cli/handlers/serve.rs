//! Serve command handler

use crate::config::{Settings, StorageBackend};
use crate::error::AppResult;
use crate::server::Server;

pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Runs the server until shutdown, or only checks the configuration when
    /// `dry_run` is set.
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        self.config.validate()?;

        if dry_run {
            self.report();
            return Ok(());
        }

        Server::new(self.config).run().await?;
        Ok(())
    }

    fn report(&self) {
        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        match self.config.database.backend {
            StorageBackend::Postgres => println!(
                "✓ Postgres backend, pool of {}..={} connections",
                self.config.database.min_connections, self.config.database.max_connections
            ),
            StorageBackend::Memory => println!("✓ In-memory backend (data is not persisted)"),
        }
        println!(
            "✓ Orders placed at UTC offset {} minutes",
            self.config.orders.utc_offset_minutes
        );
        println!("Dry run completed successfully");
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/test".to_string();
        config.jwt.secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[tokio::test]
    async fn test_dry_run_accepts_valid_config() {
        let handler = ServeCommandHandler::new(valid_config());
        assert_eq!(handler.config(), &valid_config());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_rejects_invalid_config() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(ServeCommandHandler::new(config).execute(true).await.is_err());
    }
}
