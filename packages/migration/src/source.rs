use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MigrationError;
use crate::parse::parse_migration;

/// One schema change, identified by its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: String,
    pub statements: Vec<String>,
    pub no_transaction: bool,
}

impl Migration {
    pub fn parse(id: &str, sql: &str) -> Result<Self, MigrationError> {
        let parsed = parse_migration(id, sql)?;
        Ok(Self {
            id: id.to_string(),
            statements: parsed.statements,
            no_transaction: parsed.no_transaction,
        })
    }
}

/// Where migration files come from.
#[derive(Debug, Clone)]
pub enum MigrationSource {
    /// `.sql` files in a directory on disk.
    Directory(PathBuf),
    /// `(file name, contents)` pairs compiled into the binary.
    Bundled(&'static [(&'static str, &'static str)]),
}

impl MigrationSource {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        MigrationSource::Directory(path.into())
    }

    pub fn describe(&self) -> String {
        match self {
            MigrationSource::Directory(path) => path.display().to_string(),
            MigrationSource::Bundled(_) => "<bundled>".to_string(),
        }
    }

    /// Load, parse and order every migration in the source.
    pub fn load(&self) -> Result<Vec<Migration>, MigrationError> {
        let mut migrations = match self {
            MigrationSource::Directory(path) => load_directory(path)?,
            MigrationSource::Bundled(files) => files
                .iter()
                .map(|(id, sql)| Migration::parse(id, sql))
                .collect::<Result<Vec<_>, _>>()?,
        };

        migrations.sort_by(|a, b| compare_ids(&a.id, &b.id));

        for pair in migrations.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(MigrationError::DuplicateId {
                    id: pair[0].id.clone(),
                });
            }
        }

        debug!(
            source = %self.describe(),
            count = migrations.len(),
            "migrations loaded"
        );
        Ok(migrations)
    }
}

fn load_directory(path: &Path) -> Result<Vec<Migration>, MigrationError> {
    let io_err = |source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut migrations = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let file_path = entry.path();
        if !file_path.is_file() || file_path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let Some(id) = file_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let sql = std::fs::read_to_string(&file_path).map_err(|source| MigrationError::Io {
            path: file_path.clone(),
            source,
        })?;
        migrations.push(Migration::parse(id, &sql)?);
    }
    Ok(migrations)
}

fn numeric_prefix(id: &str) -> Option<u64> {
    let end = id.find(|c: char| !c.is_ascii_digit()).unwrap_or(id.len());
    if end == 0 {
        return None;
    }
    id[..end].parse().ok()
}

/// Migration ordering: numeric prefixes compare as numbers, everything else
/// falls back to plain string order.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (numeric_prefix(a), numeric_prefix(b)) {
        (Some(x), Some(y)) if x != y => x.cmp(&y),
        _ => a.cmp(b),
    }
}
