use migration::MigrationError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbInfraError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("unsupported database system: '{system}'")]
    UnsupportedSystem { system: String },
    #[error("could not connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: DbErr,
    },
    #[error("could not {action}: {source}")]
    Statement {
        action: String,
        #[source]
        source: DbErr,
    },
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        DbInfraError::Config {
            message: message.into(),
        }
    }
}
