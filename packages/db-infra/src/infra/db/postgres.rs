use async_trait::async_trait;
use migration::MigrationRunner;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::database::{Database, DatabaseSystem};
use crate::error::DbInfraError;
use crate::infra::db::core::{close, connect, execute, is_missing_database, quote_ident};
use crate::infra::db::manager::{
    init_migration, migration_runner, read_migration_status, CreateOutcome, DatabaseManager,
    InitOutcome, MigrationStatus,
};

const SYSTEM: DatabaseSystem = DatabaseSystem::Postgres;

/// PostgreSQL implementation of [`DatabaseManager`].
pub struct Postgres {
    db: Database,
}

impl Postgres {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn runner(&self) -> Result<MigrationRunner, DbInfraError> {
        migration_runner(&self.db, SYSTEM)
    }

    async fn connect_target(&self) -> Result<DatabaseConnection, DbInfraError> {
        connect(&self.db.connection_url()?, &self.db.target()).await
    }

    async fn connect_maintenance(&self) -> Result<(DatabaseConnection, String), DbInfraError> {
        let target = format!(
            "{}:{}/{}",
            self.db.host,
            self.db.port,
            SYSTEM.maintenance_database()
        );
        let conn = connect(&self.db.maintenance_url()?, &target).await?;
        Ok((conn, target))
    }
}

#[async_trait]
impl DatabaseManager for Postgres {
    fn database(&self) -> &Database {
        &self.db
    }

    async fn is_database_created(&self) -> Result<bool, DbInfraError> {
        let target = self.db.target();
        match connect(&self.db.connection_url()?, &target).await {
            Ok(conn) => {
                close(conn, &target).await;
                Ok(true)
            }
            Err(DbInfraError::Connection { source, .. })
                if is_missing_database(&source) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_database_if_not_exists(&self) -> Result<CreateOutcome, DbInfraError> {
        if self.is_database_created().await? {
            return Ok(CreateOutcome::AlreadyExists);
        }

        info!(database = %self.db.db_name, "database does not exist, creating");
        let (conn, target) = self.connect_maintenance().await?;
        let result = execute(
            &conn,
            &format!("CREATE DATABASE {}", quote_ident(&self.db.db_name)),
            "create database",
        )
        .await;
        close(conn, &target).await;
        result?;

        info!(database = %self.db.db_name, "database created");
        Ok(CreateOutcome::Created)
    }

    async fn drop_database(&self) -> Result<(), DbInfraError> {
        let (conn, target) = self.connect_maintenance().await?;
        let result = execute(
            &conn,
            &format!("DROP DATABASE {}", quote_ident(&self.db.db_name)),
            "drop database",
        )
        .await;
        close(conn, &target).await;
        result?;

        info!(database = %self.db.db_name, "database dropped");
        Ok(())
    }

    async fn run_init_migration(&self) -> Result<InitOutcome, DbInfraError> {
        let runner = self.runner()?;
        let conn = self.connect_target().await?;

        let result = init_migration(&runner, &conn).await;
        close(conn, &self.db.target()).await;
        result
    }

    async fn run_migrations(&self) -> Result<usize, DbInfraError> {
        let runner = self.runner()?;
        let conn = self.connect_target().await?;
        let result = runner.up(&conn, None).await;
        close(conn, &self.db.target()).await;

        let n = result?;
        info!(applied = n, "migrations complete");
        Ok(n)
    }

    async fn get_pending_migrations_count(&self) -> Result<usize, DbInfraError> {
        let runner = self.runner()?;
        let conn = self.connect_target().await?;
        let result = runner.pending_count(&conn).await;
        close(conn, &self.db.target()).await;
        Ok(result?)
    }

    async fn migration_status(&self) -> Result<MigrationStatus, DbInfraError> {
        let runner = self.runner()?;
        let conn = self.connect_target().await?;

        let result = read_migration_status(&runner, &conn).await;
        close(conn, &self.db.target()).await;
        result
    }
}
