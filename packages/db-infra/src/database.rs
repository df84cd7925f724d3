//! Connection parameters for one configured store.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::DbInfraError;

/// Database systems this crate knows how to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseSystem {
    Postgres,
}

impl DatabaseSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseSystem::Postgres => "postgres",
        }
    }

    /// Database that always exists on the server and is used to create or
    /// drop other databases.
    pub fn maintenance_database(self) -> &'static str {
        match self {
            DatabaseSystem::Postgres => "postgres",
        }
    }

    pub fn url_scheme(self) -> &'static str {
        match self {
            DatabaseSystem::Postgres => "postgres",
        }
    }

    pub fn bundled_migrations(self) -> Option<&'static [(&'static str, &'static str)]> {
        match self {
            DatabaseSystem::Postgres => Some(migration::bundled::POSTGRES),
        }
    }
}

impl FromStr for DatabaseSystem {
    type Err = DbInfraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseSystem::Postgres),
            _ => Err(DbInfraError::UnsupportedSystem {
                system: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DatabaseSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn default_migrations_path(system: &str) -> String {
    format!("db/migrations/{system}")
}

/// Resolved parameters needed to reach one database.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Database {
    pub primary: bool,
    pub system: String,
    pub url: String,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub db_name: String,
    pub ssl_mode: String,
    pub migrations_path: String,
    pub migrations_table: String,
    pub options: String,
}

impl Database {
    pub fn system_kind(&self) -> Result<DatabaseSystem, DbInfraError> {
        self.system.parse()
    }

    /// URL for the configured database.
    pub fn connection_url(&self) -> Result<String, DbInfraError> {
        let system = self.system_kind()?;
        Ok(self.url_for(system, &self.db_name))
    }

    /// URL for the server's maintenance database, reached with the same
    /// host and credentials.
    pub fn maintenance_url(&self) -> Result<String, DbInfraError> {
        let system = self.system_kind()?;
        Ok(self.url_for(system, system.maintenance_database()))
    }

    /// `host:port/dbname`, safe to log.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db_name)
    }

    fn url_for(&self, system: DatabaseSystem, db_name: &str) -> String {
        let mut url = format!("{}://", system.url_scheme());
        if !self.username.is_empty() {
            url.push_str(&encode(&self.username));
            if !self.password.is_empty() {
                url.push(':');
                url.push_str(&encode(&self.password));
            }
            url.push('@');
        }
        url.push_str(&self.host);
        if !self.port.is_empty() {
            url.push(':');
            url.push_str(&self.port);
        }
        url.push('/');
        url.push_str(&encode(db_name));

        let mut params = Vec::new();
        if !self.ssl_mode.is_empty() {
            params.push(format!("sslmode={}", self.ssl_mode));
        }
        params.extend(
            self.options
                .split(|c: char| c == '&' || c.is_whitespace())
                .filter(|opt| !opt.is_empty())
                .map(str::to_string),
        );
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Keyword/value form with the password masked.
impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={} port={} dbname={} sslmode={}",
            self.host, self.port, self.db_name, self.ssl_mode
        )?;
        if !self.username.is_empty() {
            write!(f, " user={}", self.username)?;
        }
        if !self.password.is_empty() {
            f.write_str(" password=***")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("primary", &self.primary)
            .field("system", &self.system)
            .field("url", &self.url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("db_name", &self.db_name)
            .field("ssl_mode", &self.ssl_mode)
            .field("migrations_path", &self.migrations_path)
            .field("migrations_table", &self.migrations_table)
            .field("options", &self.options)
            .finish()
    }
}
