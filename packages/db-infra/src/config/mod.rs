//! Configuration loading and primary-store resolution.

pub mod stores;

use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use tracing::{debug, info};

use crate::database::{default_migrations_path, Database, DatabaseSystem};
use crate::error::DbInfraError;
use migration::DEFAULT_MIGRATIONS_TABLE;

pub use stores::check_sql_database_settings;

pub const DEFAULT_CONFIG_FILE: &str = "config.ini";
const OUTPUT_DIR_NAME: &str = "amass";

/// Database settings read from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Output directory; `None` means the per-user default.
    pub dir: Option<PathBuf>,
    pub graph_dbs: Vec<Database>,
    pub sql_dbs: Vec<Database>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn from_ini_str(text: &str) -> Result<Self, DbInfraError> {
        let mut config = Self::new();
        config.load_ini_str(text)?;
        Ok(config)
    }

    /// Parse ini text and append its stores to this config.
    pub fn load_ini_str(&mut self, text: &str) -> Result<(), DbInfraError> {
        let mut opt = ParseOption::default();
        opt.enabled_escape = false;
        let ini = Ini::load_from_str_opt(text, opt)
            .map_err(|e| DbInfraError::config(format!("failed to parse configuration: {e}")))?;

        self.graph_dbs.extend(stores::load_graph_databases(&ini));
        self.sql_dbs.extend(stores::load_sql_databases(&ini)?);

        debug!(
            graph_dbs = self.graph_dbs.len(),
            sql_dbs = self.sql_dbs.len(),
            "database settings loaded"
        );
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), DbInfraError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DbInfraError::config(format!(
                "failed to read configuration file {}: {e}",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "loading configuration");
        self.load_ini_str(&text)
    }

    /// Build the config for one run: an explicit file if given, otherwise
    /// `config.ini` in the output directory when it exists, otherwise empty.
    pub fn acquire(config_path: Option<&Path>, dir: Option<&Path>) -> Result<Self, DbInfraError> {
        let mut config = Self {
            dir: dir.map(Path::to_path_buf),
            ..Self::default()
        };

        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => config
                .output_directory()
                .map(|d| d.join(DEFAULT_CONFIG_FILE))
                .filter(|p| p.is_file()),
        };

        match path {
            Some(path) => config.load_file(&path)?,
            None => debug!("no configuration file found, using defaults"),
        }
        Ok(config)
    }

    pub fn output_directory(&self) -> Option<PathBuf> {
        output_directory(self.dir.as_deref())
    }

    /// Descriptor for the local store in the output directory. It is primary
    /// only when none of `existing` is.
    pub fn local_database_settings(&self, existing: &[Database]) -> Database {
        Database {
            primary: !has_primary(existing),
            system: "local".to_string(),
            url: self
                .output_directory()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            ..Database::default()
        }
    }

    /// Default local SQL descriptor. It is primary only when none of
    /// `existing` is.
    pub fn local_sql_database_settings(existing: &[Database]) -> Database {
        let system = DatabaseSystem::Postgres.as_str();
        Database {
            primary: !has_primary(existing),
            system: system.to_string(),
            host: "localhost".to_string(),
            port: "5432".to_string(),
            username: "myuser".to_string(),
            password: "mypass".to_string(),
            db_name: "amassdb".to_string(),
            ssl_mode: "disable".to_string(),
            migrations_path: default_migrations_path(system),
            migrations_table: DEFAULT_MIGRATIONS_TABLE.to_string(),
            ..Database::default()
        }
    }

    /// First SQL store marked primary, or the local SQL default.
    pub fn primary_sql_database(&self) -> Database {
        first_primary(&self.sql_dbs)
            .cloned()
            .unwrap_or_else(|| Self::local_sql_database_settings(&self.sql_dbs))
    }

    /// First graph store marked primary, or the local store.
    pub fn primary_graph_database(&self) -> Database {
        first_primary(&self.graph_dbs)
            .cloned()
            .unwrap_or_else(|| self.local_database_settings(&self.graph_dbs))
    }
}

fn has_primary(dbs: &[Database]) -> bool {
    first_primary(dbs).is_some()
}

fn first_primary(dbs: &[Database]) -> Option<&Database> {
    dbs.iter().find(|db| db.primary)
}

/// The given directory, or `<user config dir>/amass`.
pub fn output_directory(dir: Option<&Path>) -> Option<PathBuf> {
    match dir {
        Some(dir) if !dir.as_os_str().is_empty() => Some(dir.to_path_buf()),
        _ => dirs::config_dir().map(|base| base.join(OUTPUT_DIR_NAME)),
    }
}
