//! File-based schema migrations on top of SeaORM connections.
//!
//! Migrations are annotated `.sql` files, read from a directory or from the
//! copies bundled into the binary, applied strictly in order and recorded in
//! a caller-named tracking table.

pub mod bundled;
pub mod error;
pub mod parse;
pub mod plan;
pub mod runner;
pub mod source;
pub mod table;

pub use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};

pub use error::MigrationError;
pub use plan::{plan_up, PENDING_LIMIT};
pub use runner::MigrationRunner;
pub use source::{compare_ids, Migration, MigrationSource};
pub use table::{MigrationRecord, MigrationTable, DEFAULT_MIGRATIONS_TABLE};
