use std::path::PathBuf;

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read migrations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse migration {id}: {message}")]
    Parse { id: String, message: String },
    #[error("duplicate migration id: {id}")]
    DuplicateId { id: String },
    #[error("no migrations found at {path}")]
    MissingSource { path: String },
    #[error("unknown migration in database: {id}")]
    UnknownApplied { id: String },
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("could not execute migration {id} ({applied} applied before failure): {source}")]
    Execution {
        applied: usize,
        id: String,
        #[source]
        source: DbErr,
    },
}

impl MigrationError {
    pub(crate) fn parse(id: &str, message: impl Into<String>) -> Self {
        MigrationError::Parse {
            id: id.to_string(),
            message: message.into(),
        }
    }

    /// Number of migrations committed before the failure, when known.
    pub fn applied_before_failure(&self) -> Option<usize> {
        match self {
            MigrationError::Execution { applied, .. } => Some(*applied),
            _ => None,
        }
    }
}
