use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use tracing::{debug, info};

use crate::error::MigrationError;
use crate::plan::{plan_up, PENDING_LIMIT};
use crate::source::{Migration, MigrationSource};
use crate::table::MigrationTable;

/// Applies migrations from one source, tracking them in one table.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    source: MigrationSource,
    table: MigrationTable,
}

impl MigrationRunner {
    pub fn new(source: MigrationSource, table: MigrationTable) -> Self {
        Self { source, table }
    }

    pub fn source(&self) -> &MigrationSource {
        &self.source
    }

    pub fn table(&self) -> &MigrationTable {
        &self.table
    }

    pub async fn applied_count(&self, db: &DatabaseConnection) -> Result<usize, MigrationError> {
        Ok(self.table.applied(db).await?.len())
    }

    /// Migrations that `up` would apply, honouring `limit` (`None` = all).
    pub async fn plan(
        &self,
        db: &DatabaseConnection,
        limit: Option<usize>,
    ) -> Result<Vec<Migration>, MigrationError> {
        let available = self.source.load()?;
        let applied = self.table.applied(db).await?;
        plan_up(available, &applied, limit)
    }

    pub async fn pending_count(&self, db: &DatabaseConnection) -> Result<usize, MigrationError> {
        Ok(self.plan(db, Some(PENDING_LIMIT)).await?.len())
    }

    /// Apply pending migrations in order and return how many were applied.
    /// Stops at the first failure; earlier migrations stay committed.
    pub async fn up(
        &self,
        db: &DatabaseConnection,
        limit: Option<usize>,
    ) -> Result<usize, MigrationError> {
        let plan = self.plan(db, limit).await?;
        info!(
            "migrate=plan source={} table={} pending={}",
            self.source.describe(),
            self.table,
            plan.len()
        );

        let mut applied = 0;
        for migration in &plan {
            if let Err(source) = self.apply(db, migration).await {
                return Err(MigrationError::Execution {
                    applied,
                    id: migration.id.clone(),
                    source,
                });
            }
            applied += 1;
            info!(migration = %migration.id, "migration applied");
        }
        Ok(applied)
    }

    async fn apply(&self, db: &DatabaseConnection, migration: &Migration) -> Result<(), DbErr> {
        let record = self
            .table
            .insert_record(db.get_database_backend(), &migration.id)?;

        if migration.no_transaction {
            debug!(migration = %migration.id, "applying without transaction");
            for statement in &migration.statements {
                db.execute_unprepared(statement).await?;
            }
            db.execute(record).await?;
            return Ok(());
        }

        let txn = db.begin().await?;
        for statement in &migration.statements {
            txn.execute_unprepared(statement).await?;
        }
        txn.execute(record).await?;
        txn.commit().await
    }
}
