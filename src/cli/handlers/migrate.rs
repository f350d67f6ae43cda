//! Migrate command handler

use crate::config::{Settings, StorageBackend};
use crate::db;
use crate::error::{AppError, AppResult};

pub struct MigrateCommandHandler {
    config: Settings,
}

impl MigrateCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Applies pending migrations, lists them (`dry_run`), or reverts the
    /// last `rollback` of them.
    ///
    /// # Errors
    /// - `Validation` when the configured backend is not postgres
    /// - `StorageFailure` for connection and migration failures
    pub async fn execute(&self, dry_run: bool, rollback: Option<u32>) -> AppResult<()> {
        self.require_postgres()?;
        let url = self.config.database.url.as_str();

        if dry_run {
            println!("Checking for pending migrations...");
            let pending = db::pending_migrations(url).await?;
            if pending.is_empty() {
                println!("✓ No pending migrations");
            } else {
                println!("Found {} pending migration(s):", pending.len());
                for name in &pending {
                    println!("  - {}", name);
                }
            }
            return Ok(());
        }

        if let Some(steps) = rollback {
            println!("Rolling back {} migration(s)...", steps);
            for version in db::revert_migrations(url, steps).await? {
                println!("✓ Reverted: {}", version);
            }
            tracing::info!(steps, "Migrations rolled back");
            return Ok(());
        }

        println!("Running pending migrations...");
        let applied = db::run_pending_migrations(url).await?;
        if applied.is_empty() {
            println!("✓ Database schema is up to date");
        }
        for version in &applied {
            println!("✓ Applied: {}", version);
        }
        tracing::info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    fn require_postgres(&self) -> AppResult<()> {
        if self.config.database.backend != StorageBackend::Postgres {
            return Err(AppError::Validation {
                field: "database.backend".to_string(),
                reason: "Migrations require the postgres backend".to_string(),
            });
        }
        self.config.database.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_is_rejected() {
        let mut config = Settings::default();
        config.database.backend = StorageBackend::Memory;

        let result = MigrateCommandHandler::new(config).execute(true, None).await;
        assert!(matches!(
            result,
            Err(AppError::Validation { field, .. }) if field == "database.backend"
        ));
    }

    #[tokio::test]
    async fn test_missing_url_is_rejected_before_connecting() {
        let result = MigrateCommandHandler::new(Settings::default())
            .execute(false, None)
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
