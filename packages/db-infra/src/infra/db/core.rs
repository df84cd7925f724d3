use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection, DbErr, RuntimeErr};
use tracing::{debug, warn};

use crate::error::DbInfraError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Postgres `invalid_catalog_name`, raised when connecting to a database that
/// does not exist.
const INVALID_CATALOG_NAME: &str = "3D000";

/// Open a single-connection pool. `target` is only used in errors and logs,
/// so it must not carry credentials.
pub async fn connect(url: &str, target: &str) -> Result<DatabaseConnection, DbInfraError> {
    let mut opt = ConnectOptions::new(url);
    opt.min_connections(1)
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .sqlx_logging(false);

    debug!(db = target, "connect=start");
    sea_orm::Database::connect(opt)
        .await
        .map_err(|source| DbInfraError::Connection {
            target: target.to_string(),
            source,
        })
}

/// Close a pool, logging instead of failing when the server already hung up.
pub async fn close(conn: DatabaseConnection, target: &str) {
    if let Err(e) = conn.close().await {
        warn!(db = target, error = %e, "failed to close connection");
    }
}

pub async fn execute(
    conn: &DatabaseConnection,
    sql: &str,
    action: &str,
) -> Result<(), DbInfraError> {
    conn.execute_unprepared(sql)
        .await
        .map(|_| ())
        .map_err(|source| DbInfraError::Statement {
            action: action.to_string(),
            source,
        })
}

fn sqlstate(err: &DbErr) -> Option<String> {
    let (DbErr::Conn(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Exec(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Query(RuntimeErr::SqlxError(sqlx_err))) = err
    else {
        return None;
    };
    sqlx_err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code.into_owned())
}

/// Whether a connection failure means the target database is absent.
pub fn is_missing_database(err: &DbErr) -> bool {
    sqlstate(err).as_deref() == Some(INVALID_CATALOG_NAME)
}

/// Double-quote an identifier for use in DDL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
