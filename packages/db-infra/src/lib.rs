//! Database configuration and lifecycle management for the asset store.
//! Used by the `amass-db` CLI.

pub mod config;
pub mod database;
pub mod error;
pub mod infra;

pub use config::Config;
pub use database::{Database, DatabaseSystem};
pub use error::DbInfraError;
pub use infra::db::{
    manager_for, CreateOutcome, DatabaseManager, InitOutcome, MigrationStatus, Postgres,
};
