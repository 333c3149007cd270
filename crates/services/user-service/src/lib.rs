//! User Service Library
//!
//! User data access on top of the generic `persistence` layer: the `users`
//! schema and its migrations, the listing specifications, the user service
//! and the command-line front end.

pub mod cli;
pub mod commands;
pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, IsolationLevel};
use serde_json::Value;
use tracing::info;

use common::{AppError, AppResult};
use persistence::{Persistence, RepoRegistry};

use crate::cli::{MigrateAction, UserCommand};
use crate::config::UserServiceConfig;
use crate::infra::Database;
use crate::repository::USER_REPOSITORY;
use crate::service::UserManager;

/// Wire the repository registry and open the persistence layer on `connection`.
///
/// Every repository the service resolves is checked here, so a missing
/// registration fails at startup.
pub fn build_persistence(connection: DatabaseConnection) -> AppResult<Arc<Persistence>> {
    let mut registry = RepoRegistry::new();
    repository::register(&mut registry);
    registry.ensure_registered([USER_REPOSITORY])?;

    let backend = connection.get_database_backend();
    let mut persistence = Persistence::new(connection, registry);
    if backend == DatabaseBackend::Postgres {
        persistence = persistence.with_isolation(IsolationLevel::ReadCommitted);
    }
    Ok(Arc::new(persistence))
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(config: &UserServiceConfig, action: MigrateAction) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("Resetting database and running all migrations");
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Run one user command and return the JSON to print.
pub async fn run_user_command(config: &UserServiceConfig, command: UserCommand) -> AppResult<Value> {
    let db = Database::connect(&config.database).await?;
    db.ping().await?;

    let persistence = build_persistence(db.get_connection())?;
    let users = UserManager::new(persistence)?;

    commands::execute(&users, command).await
}

/// Pretty-printed JSON for stdout.
pub fn render(value: &Value) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::internal(e.to_string()))
}
