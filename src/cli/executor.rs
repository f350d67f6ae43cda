//! Dispatches a parsed command to its handler.

use super::handlers::{MigrateCommandHandler, ServeCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::AppResult;

/// Runs the command in `cli` with already merged `settings`.
///
/// No subcommand means `serve`.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    match &cli.command {
        Some(Commands::Serve { dry_run, .. }) => {
            ServeCommandHandler::new(settings).execute(*dry_run).await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
        Some(Commands::Migrate { dry_run, rollback }) => {
            if let Some(steps) = rollback
                && *steps > 10
            {
                tracing::warn!(steps, "Rolling back a large number of migrations");
            }
            MigrateCommandHandler::new(settings)
                .execute(*dry_run, *rollback)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::error::AppError;
    use clap::Parser;

    fn memory_config() -> Settings {
        let mut config = Settings::default();
        config.database.backend = StorageBackend::Memory;
        config.jwt.secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[tokio::test]
    async fn test_execute_serve_dry_run() {
        let cli = Cli::try_parse_from(["storefront-rs", "serve", "--dry-run"]).unwrap();
        assert!(execute_command(&cli, memory_config()).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_migrate_needs_postgres() {
        let cli = Cli::try_parse_from(["storefront-rs", "migrate", "--dry-run"]).unwrap();
        assert!(matches!(
            execute_command(&cli, memory_config()).await,
            Err(AppError::Validation { .. })
        ));
    }
}
