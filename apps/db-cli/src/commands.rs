use std::io::Write;

use db_infra::{CreateOutcome, DatabaseManager, DbInfraError, InitOutcome};
use thiserror::Error;
use tracing::info;

pub const UPGRADE_HINT: &str = "Run 'amass-db migrate' to apply pending migrations.";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to {stage}: {source}")]
    Db {
        stage: &'static str,
        #[source]
        source: DbInfraError,
    },
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl CommandError {
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            CommandError::Db { stage, .. } => Some(stage),
            CommandError::Output(_) => None,
        }
    }
}

fn stage(stage: &'static str) -> impl FnOnce(DbInfraError) -> CommandError {
    move |source| CommandError::Db { stage, source }
}

pub fn applied_message(n: usize) -> String {
    match n {
        0 => "No migrations to apply.".to_string(),
        1 => "Applied 1 migration!".to_string(),
        n => format!("Applied {n} migrations!"),
    }
}

pub fn pending_warning(n: usize) -> Option<String> {
    match n {
        0 => None,
        1 => Some(format!(
            "WARNING: There is a pending migration that has not been applied!\n{UPGRADE_HINT}"
        )),
        n => Some(format!(
            "WARNING: There are {n} pending migrations that have not been applied!\n{UPGRADE_HINT}"
        )),
    }
}

/// Create the database if needed, run the first migration batch and warn
/// about anything still pending.
pub async fn run_init(
    manager: &dyn DatabaseManager,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    info!(db = %manager.database(), "db-init=start");

    let created = manager
        .create_database_if_not_exists()
        .await
        .map_err(stage("create database"))?;
    if created == CreateOutcome::Created {
        writeln!(out, "Database {} created.", manager.database().db_name)?;
    }

    let outcome = manager
        .run_init_migration()
        .await
        .map_err(stage("initialize migrations"))?;
    match outcome {
        InitOutcome::AlreadyInitialized => {
            writeln!(out, "Database already initialized.")?
        }
        InitOutcome::Applied(n) => writeln!(out, "{}", applied_message(n))?,
    }

    let pending = manager
        .get_pending_migrations_count()
        .await
        .map_err(stage("get pending migrations count"))?;
    if let Some(warning) = pending_warning(pending) {
        writeln!(out, "{warning}")?;
    }

    info!("db-init=done");
    Ok(())
}

/// Drop the database. No confirmation is asked for.
pub async fn run_drop(
    manager: &dyn DatabaseManager,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    info!(db = %manager.database(), "db-drop=start");
    manager
        .drop_database()
        .await
        .map_err(stage("drop database"))?;
    writeln!(out, "Database {} dropped.", manager.database().db_name)?;
    Ok(())
}

pub async fn run_migrate(
    manager: &dyn DatabaseManager,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    info!(db = %manager.database(), "db-migrate=start");
    let n = manager
        .run_migrations()
        .await
        .map_err(stage("run migrations"))?;
    writeln!(out, "{}", applied_message(n))?;
    Ok(())
}

pub async fn run_status(
    manager: &dyn DatabaseManager,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let status = manager
        .migration_status()
        .await
        .map_err(stage("get migration status"))?;
    writeln!(
        out,
        "Database {}: {} applied, {} pending",
        manager.database().db_name,
        status.applied,
        status.pending
    )?;
    if let Some(warning) = pending_warning(status.pending) {
        writeln!(out, "{warning}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use db_infra::{Config, Database, MigrationStatus};
    use migration::MigrationError;

    use super::*;

    /// In-memory manager that follows the database state machine.
    struct FakeManager {
        db: Database,
        exists: Mutex<bool>,
        applied: Mutex<usize>,
        available: usize,
        fail: Option<&'static str>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeManager {
        fn new(exists: bool, applied: usize, available: usize) -> Self {
            Self {
                db: Config::local_sql_database_settings(&[]),
                exists: Mutex::new(exists),
                applied: Mutex::new(applied),
                available,
                fail: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, op: &'static str) -> Self {
            self.fail = Some(op);
            self
        }

        fn record(&self, op: &'static str) -> Result<(), DbInfraError> {
            self.calls.lock().unwrap().push(op);
            if self.fail == Some(op) {
                return Err(DbInfraError::Migration(MigrationError::Execution {
                    applied: 0,
                    id: "1_assets.sql".into(),
                    source: sea_orm_err(),
                }));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn sea_orm_err() -> migration::DbErr {
        migration::DbErr::Custom("boom".into())
    }

    #[async_trait]
    impl DatabaseManager for FakeManager {
        fn database(&self) -> &Database {
            &self.db
        }

        async fn is_database_created(&self) -> Result<bool, DbInfraError> {
            self.record("exists")?;
            Ok(*self.exists.lock().unwrap())
        }

        async fn create_database_if_not_exists(&self) -> Result<CreateOutcome, DbInfraError> {
            self.record("create")?;
            let mut exists = self.exists.lock().unwrap();
            if *exists {
                return Ok(CreateOutcome::AlreadyExists);
            }
            *exists = true;
            Ok(CreateOutcome::Created)
        }

        async fn drop_database(&self) -> Result<(), DbInfraError> {
            self.record("drop")?;
            *self.exists.lock().unwrap() = false;
            *self.applied.lock().unwrap() = 0;
            Ok(())
        }

        async fn run_init_migration(&self) -> Result<InitOutcome, DbInfraError> {
            self.record("init")?;
            let mut applied = self.applied.lock().unwrap();
            if *applied >= 1 {
                return Ok(InitOutcome::AlreadyInitialized);
            }
            *applied = self.available;
            Ok(InitOutcome::Applied(self.available))
        }

        async fn run_migrations(&self) -> Result<usize, DbInfraError> {
            self.record("migrate")?;
            let mut applied = self.applied.lock().unwrap();
            let n = self.available - *applied;
            *applied = self.available;
            Ok(n)
        }

        async fn get_pending_migrations_count(&self) -> Result<usize, DbInfraError> {
            self.record("pending")?;
            Ok(self.available - *self.applied.lock().unwrap())
        }

        async fn migration_status(&self) -> Result<MigrationStatus, DbInfraError> {
            self.record("status")?;
            let applied = *self.applied.lock().unwrap();
            Ok(MigrationStatus {
                applied,
                pending: self.available - applied,
            })
        }
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn messages_distinguish_singular_and_plural() {
        assert_eq!(applied_message(0), "No migrations to apply.");
        assert_eq!(applied_message(1), "Applied 1 migration!");
        assert_eq!(applied_message(4), "Applied 4 migrations!");

        assert!(pending_warning(0).is_none());
        assert!(pending_warning(1).unwrap().contains("There is a pending migration"));
        assert!(pending_warning(3).unwrap().contains("There are 3 pending migrations"));
    }

    #[tokio::test]
    async fn init_creates_then_migrates_then_checks_pending() {
        let manager = FakeManager::new(false, 0, 2);
        let mut buf = Vec::new();
        run_init(&manager, &mut buf).await.unwrap();

        assert_eq!(manager.calls(), vec!["create", "init", "pending"]);
        let out = output(buf);
        assert!(out.contains("Database amassdb created."));
        assert!(out.contains("Applied 2 migrations!"));
        assert!(!out.contains("WARNING"));
    }

    #[tokio::test]
    async fn init_on_partially_migrated_database_warns() {
        let manager = FakeManager::new(true, 1, 3);
        let mut buf = Vec::new();
        run_init(&manager, &mut buf).await.unwrap();

        let out = output(buf);
        assert!(out.contains("Database already initialized."));
        assert!(out.contains("There are 2 pending migrations"));
        assert!(out.contains(UPGRADE_HINT));
    }

    #[tokio::test]
    async fn init_stops_at_first_failure() {
        let manager = FakeManager::new(false, 0, 2).failing("init");
        let mut buf = Vec::new();
        let err = run_init(&manager, &mut buf).await.unwrap_err();

        assert_eq!(err.stage(), Some("initialize migrations"));
        assert!(err.to_string().starts_with("Failed to initialize migrations"));
        assert_eq!(manager.calls(), vec!["create", "init"]);
    }

    #[tokio::test]
    async fn drop_then_database_is_gone() {
        let manager = FakeManager::new(true, 2, 2);
        let mut buf = Vec::new();
        run_drop(&manager, &mut buf).await.unwrap();

        assert!(!manager.is_database_created().await.unwrap());
        assert!(output(buf).contains("Database amassdb dropped."));
    }

    #[tokio::test]
    async fn migrate_then_nothing_pending() {
        let manager = FakeManager::new(true, 1, 3);
        let mut buf = Vec::new();
        run_migrate(&manager, &mut buf).await.unwrap();
        assert!(output(buf).contains("Applied 2 migrations!"));
        assert_eq!(manager.get_pending_migrations_count().await.unwrap(), 0);

        let mut buf = Vec::new();
        run_migrate(&manager, &mut buf).await.unwrap();
        assert!(output(buf).contains("No migrations to apply."));
    }

    #[tokio::test]
    async fn status_reports_counts() {
        let manager = FakeManager::new(true, 1, 2);
        let mut buf = Vec::new();
        run_status(&manager, &mut buf).await.unwrap();

        let out = output(buf);
        assert!(out.contains("Database amassdb: 1 applied, 1 pending"));
        assert!(out.contains("There is a pending migration"));
    }
}
