use std::path::Path;

use async_trait::async_trait;
use migration::{MigrationError, MigrationRunner, MigrationSource, MigrationTable};
use sea_orm::DatabaseConnection;
use tracing::{debug, info};

use crate::database::{default_migrations_path, Database, DatabaseSystem};
use crate::error::DbInfraError;
use crate::infra::db::postgres::Postgres;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    AlreadyExists,
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// At least one migration was already recorded; nothing was run.
    AlreadyInitialized,
    Applied(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: usize,
    pub pending: usize,
}

/// Lifecycle operations for the database a descriptor points at.
#[async_trait]
pub trait DatabaseManager: Send + Sync {
    fn database(&self) -> &Database;

    async fn is_database_created(&self) -> Result<bool, DbInfraError>;

    async fn create_database_if_not_exists(&self) -> Result<CreateOutcome, DbInfraError>;

    /// Destroys the database. There is no confirmation at this layer.
    async fn drop_database(&self) -> Result<(), DbInfraError>;

    /// Apply every pending migration, but only when none has been applied yet.
    async fn run_init_migration(&self) -> Result<InitOutcome, DbInfraError>;

    /// Apply every pending migration and return how many ran.
    async fn run_migrations(&self) -> Result<usize, DbInfraError>;

    async fn get_pending_migrations_count(&self) -> Result<usize, DbInfraError>;

    async fn migration_status(&self) -> Result<MigrationStatus, DbInfraError>;
}

/// Pick the manager implementation for the descriptor's system.
pub fn manager_for(db: &Database) -> Result<Box<dyn DatabaseManager>, DbInfraError> {
    match db.system_kind()? {
        DatabaseSystem::Postgres => Ok(Box::new(Postgres::new(db.clone()))),
    }
}

/// Runner for the descriptor's migrations path and table.
///
/// An existing directory is read from disk. When the path is the system's
/// default and is missing, the migrations bundled into the binary are used.
pub fn migration_runner(
    db: &Database,
    system: DatabaseSystem,
) -> Result<MigrationRunner, DbInfraError> {
    let default_path = default_migrations_path(system.as_str());
    let path = if db.migrations_path.is_empty() {
        default_path.as_str()
    } else {
        db.migrations_path.as_str()
    };
    // `postgresql` sections default to `db/migrations/postgresql`
    let is_default =
        path == default_path || path == default_migrations_path(db.system.trim()).as_str();

    let source = if Path::new(path).is_dir() {
        MigrationSource::directory(path)
    } else if is_default {
        match system.bundled_migrations() {
            Some(files) => {
                debug!(path = path, "migrations directory missing, using bundled migrations");
                MigrationSource::Bundled(files)
            }
            None => {
                return Err(MigrationError::MissingSource {
                    path: path.to_string(),
                }
                .into())
            }
        }
    } else {
        return Err(MigrationError::MissingSource {
            path: path.to_string(),
        }
        .into());
    };

    Ok(MigrationRunner::new(
        source,
        MigrationTable::new(db.migrations_table.as_str()),
    ))
}

/// Apply every pending migration unless at least one is already recorded.
pub async fn init_migration(
    runner: &MigrationRunner,
    conn: &DatabaseConnection,
) -> Result<InitOutcome, DbInfraError> {
    let applied = runner.applied_count(conn).await?;
    if applied >= 1 {
        info!(applied, "database already initialized");
        return Ok(InitOutcome::AlreadyInitialized);
    }
    let n = runner.up(conn, None).await?;
    info!(applied = n, "init migration complete");
    Ok(InitOutcome::Applied(n))
}

pub async fn read_migration_status(
    runner: &MigrationRunner,
    conn: &DatabaseConnection,
) -> Result<MigrationStatus, DbInfraError> {
    let applied = runner.applied_count(conn).await?;
    let pending = runner.pending_count(conn).await?;
    Ok(MigrationStatus { applied, pending })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres(path: &str, table: &str) -> Database {
        Database {
            system: "postgres".into(),
            host: "localhost".into(),
            port: "5432".into(),
            db_name: "amassdb".into(),
            migrations_path: path.into(),
            migrations_table: table.into(),
            ..Database::default()
        }
    }

    #[test]
    fn unknown_system_is_rejected() {
        let db = Database {
            system: "cockroach".into(),
            ..postgres("", "")
        };
        let err = manager_for(&db).err().expect("dispatch should fail");
        assert!(matches!(err, DbInfraError::UnsupportedSystem { system } if system == "cockroach"));
    }

    #[test]
    fn postgres_dispatches() {
        let db = postgres("db/migrations/postgres", "migrations");
        let manager = manager_for(&db).unwrap();
        assert_eq!(manager.database().db_name, "amassdb");
    }

    #[test]
    fn existing_directory_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();
        let runner = migration_runner(&postgres(&path, "schema_history"), DatabaseSystem::Postgres).unwrap();
        assert!(matches!(runner.source(), MigrationSource::Directory(p) if p.to_str() == Some(path.as_str())));
        assert_eq!(runner.table().name(), "schema_history");
    }

    #[test]
    fn missing_default_directory_uses_bundle() {
        // Tests run from the package root, which has no db/migrations directory.
        let runner = migration_runner(
            &postgres("db/migrations/postgres", "migrations"),
            DatabaseSystem::Postgres,
        )
        .unwrap();
        assert!(matches!(runner.source(), MigrationSource::Bundled(_)));
    }

    #[test]
    fn postgresql_alias_default_path_uses_bundle() {
        let db = Database {
            system: "postgresql".into(),
            ..postgres("db/migrations/postgresql", "migrations")
        };
        let runner = migration_runner(&db, DatabaseSystem::Postgres).unwrap();
        assert!(matches!(runner.source(), MigrationSource::Bundled(_)));
    }

    #[test]
    fn missing_custom_directory_is_an_error() {
        let err = migration_runner(
            &postgres("/nonexistent/custom/migrations", "migrations"),
            DatabaseSystem::Postgres,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DbInfraError::Migration(MigrationError::MissingSource { .. })
        ));
    }

    #[test]
    fn blank_table_uses_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();
        let runner = migration_runner(&postgres(&path, ""), DatabaseSystem::Postgres).unwrap();
        assert_eq!(runner.table().name(), "migrations");
    }
}
