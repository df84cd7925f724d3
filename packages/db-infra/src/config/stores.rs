//! Mapping of `[graphdbs.*]` / `[sqldbs.*]` ini sections onto [`Database`].

use ini::{Ini, Properties};
use tracing::{debug, warn};

use crate::database::{default_migrations_path, Database};
use crate::error::DbInfraError;
use migration::DEFAULT_MIGRATIONS_TABLE;

pub const GRAPH_GROUP: &str = "graphdbs";
pub const SQL_GROUP: &str = "sqldbs";

/// Child sections of `group`, in declaration order, as `(child name, properties)`.
/// Names are lowercased.
pub(crate) fn child_sections<'a>(
    ini: &'a Ini,
    group: &str,
) -> impl Iterator<Item = (String, &'a Properties)> + 'a {
    let prefix = format!("{group}.");
    ini.iter().filter_map(move |(name, props)| {
        let name = name?.trim().to_ascii_lowercase();
        let rest = name.strip_prefix(&prefix)?;
        let child = rest.split('.').next().unwrap_or_default();
        if child.is_empty() {
            return None;
        }
        Some((child.to_string(), props))
    })
}

/// Map a section's keys onto a descriptor. Keys are case-insensitive and
/// unknown keys are ignored.
pub(crate) fn map_section(props: &Properties) -> Result<Database, String> {
    let mut db = Database::default();
    for (key, value) in props.iter() {
        let value = unquote(value.trim());
        match key.trim().to_ascii_lowercase().as_str() {
            "primary" => db.primary = parse_bool(value)?,
            "system" => db.system = value.to_string(),
            "url" => db.url = value.to_string(),
            "host" => db.host = value.to_string(),
            "port" => db.port = value.to_string(),
            "username" => db.username = value.to_string(),
            "password" => db.password = value.to_string(),
            "database" => db.db_name = value.to_string(),
            "sslmode" => db.ssl_mode = value.to_string(),
            "migrations_path" => db.migrations_path = value.to_string(),
            "migrations_table" => db.migrations_table = value.to_string(),
            "options" => db.options = value.to_string(),
            other => debug!(key = other, "ignoring unknown database key"),
        }
    }
    Ok(db)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Only the first token counts, so a trailing `; comment` is tolerated.
fn parse_bool(value: &str) -> Result<bool, String> {
    let token = value.split_whitespace().next().unwrap_or_default();
    match token.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(format!("invalid boolean value for 'primary': '{other}'")),
    }
}

/// Check required SQL fields and fill in defaults.
pub fn check_sql_database_settings(db: &mut Database) -> Result<(), DbInfraError> {
    if db.system.is_empty() {
        return Err(DbInfraError::config("database system was not specified"));
    }
    if db.host.is_empty() {
        return Err(DbInfraError::config("database host was not specified"));
    }
    if db.port.is_empty() {
        return Err(DbInfraError::config("database port was not specified"));
    }
    if db.db_name.is_empty() {
        return Err(DbInfraError::config("database name was not specified"));
    }
    if !db.username.is_empty() && db.password.is_empty() {
        return Err(DbInfraError::config("database password was not specified"));
    }
    if db.username.is_empty() {
        warn!(system = %db.system, "database username was not provided, the default user will be used");
    }
    if db.ssl_mode.is_empty() {
        db.ssl_mode = "disable".to_string();
    }
    if db.migrations_path.is_empty() {
        db.migrations_path = default_migrations_path(&db.system);
    }
    if db.migrations_table.is_empty() {
        db.migrations_table = DEFAULT_MIGRATIONS_TABLE.to_string();
    }
    Ok(())
}

pub(crate) fn load_graph_databases(ini: &Ini) -> Vec<Database> {
    child_sections(ini, GRAPH_GROUP)
        .filter_map(|(name, props)| match map_section(props) {
            Ok(mut db) => {
                db.system = name;
                Some(db)
            }
            Err(e) => {
                debug!(section = %name, error = %e, "skipping graph database section");
                None
            }
        })
        .collect()
}

pub(crate) fn load_sql_databases(ini: &Ini) -> Result<Vec<Database>, DbInfraError> {
    let mut dbs = Vec::new();
    for (name, props) in child_sections(ini, SQL_GROUP) {
        let mut db = map_section(props).map_err(|e| {
            DbInfraError::config(format!("failed mapping [{SQL_GROUP}.{name}]: {e}"))
        })?;
        db.system = name.clone();
        check_sql_database_settings(&mut db).map_err(|e| match e {
            DbInfraError::Config { message } => {
                DbInfraError::config(format!("[{SQL_GROUP}.{name}] {message}"))
            }
            other => other,
        })?;
        dbs.push(db);
    }
    Ok(dbs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Database {
        Database {
            system: "postgres".into(),
            host: "localhost".into(),
            port: "5432".into(),
            db_name: "amassdb".into(),
            username: "myuser".into(),
            password: "mypass".into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_filled_in() {
        let mut db = complete();
        check_sql_database_settings(&mut db).unwrap();
        assert_eq!(db.ssl_mode, "disable");
        assert_eq!(db.migrations_path, "db/migrations/postgres");
        assert_eq!(db.migrations_table, "migrations");
    }

    #[test]
    fn explicit_values_are_kept() {
        let mut db = Database {
            ssl_mode: "verify-full".into(),
            migrations_path: "custom/path".into(),
            migrations_table: "schema_history".into(),
            ..complete()
        };
        check_sql_database_settings(&mut db).unwrap();
        assert_eq!(db.ssl_mode, "verify-full");
        assert_eq!(db.migrations_path, "custom/path");
        assert_eq!(db.migrations_table, "schema_history");
    }

    #[test]
    fn each_required_field_is_checked() {
        let cases: [(fn(&mut Database), &str); 4] = [
            (|db| db.system.clear(), "system"),
            (|db| db.host.clear(), "host"),
            (|db| db.port.clear(), "port"),
            (|db| db.db_name.clear(), "name"),
        ];
        for (clear, field) in cases {
            let mut db = complete();
            clear(&mut db);
            let err = check_sql_database_settings(&mut db).unwrap_err();
            assert!(err.to_string().contains(field), "{field}: {err}");
        }
    }

    #[test]
    fn username_requires_password() {
        let mut db = Database {
            password: String::new(),
            ..complete()
        };
        let err = check_sql_database_settings(&mut db).unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn missing_username_is_allowed() {
        let mut db = Database {
            username: String::new(),
            password: String::new(),
            ..complete()
        };
        assert!(check_sql_database_settings(&mut db).is_ok());
    }

    #[test]
    fn surrounding_quotes_are_removed() {
        assert_eq!(unquote("\"amassdb\""), "amassdb");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("\"unbalanced"), "\"unbalanced");
    }

    #[test]
    fn bool_parsing_tolerates_inline_comments() {
        assert_eq!(parse_bool("true ; the primary one"), Ok(true));
        assert_eq!(parse_bool("No"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }
}
