use sea_orm::{DatabaseBackend, DatabaseConnection, Statement};
use sea_orm_migration::prelude::*;

use crate::source::compare_ids;

pub const DEFAULT_MIGRATIONS_TABLE: &str = "migrations";

#[derive(Iden)]
enum Record {
    Id,
    AppliedAt,
}

/// A row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub id: String,
}

/// Name of the table that records applied migrations. Passed explicitly to
/// every runner call so different databases can use different tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationTable(String);

impl MigrationTable {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            return Self::default();
        }
        Self(name)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn iden(&self) -> Alias {
        Alias::new(self.0.as_str())
    }

    /// Create the tracking table when it does not exist yet.
    pub async fn ensure(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let manager = SchemaManager::new(db);
        manager
            .create_table(
                Table::create()
                    .table(self.iden())
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Record::Id)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Record::AppliedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    /// Applied migrations in migration order.
    pub async fn applied(&self, db: &DatabaseConnection) -> Result<Vec<MigrationRecord>, DbErr> {
        self.ensure(db).await?;

        let backend = db.get_database_backend();
        let select = Query::select()
            .column(Record::Id)
            .from(self.iden())
            .to_owned();

        let rows = db.query_all(backend.build(&select)).await?;
        let mut records = rows
            .iter()
            .map(|row| row.try_get::<String>("", "id").map(|id| MigrationRecord { id }))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(records)
    }

    pub(crate) fn insert_record(
        &self,
        backend: DatabaseBackend,
        id: &str,
    ) -> Result<Statement, DbErr> {
        let insert = Query::insert()
            .into_table(self.iden())
            .columns([Record::Id, Record::AppliedAt])
            .values([id.into(), Expr::current_timestamp().into()])
            .map_err(|e| DbErr::Custom(format!("failed to build migration record: {e}")))?
            .to_owned();
        Ok(backend.build(&insert))
    }
}

impl Default for MigrationTable {
    fn default() -> Self {
        Self(DEFAULT_MIGRATIONS_TABLE.to_string())
    }
}

impl std::fmt::Display for MigrationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
