pub mod core;
pub mod manager;
pub mod postgres;

pub use manager::{
    init_migration, manager_for, migration_runner, read_migration_status, CreateOutcome,
    DatabaseManager, InitOutcome, MigrationStatus,
};
pub use postgres::Postgres;
