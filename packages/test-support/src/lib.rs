//! Test support utilities shared by the workspace crates.
//!
//! Provides idempotent tracing setup for test binaries and ULID-based
//! database names that do not collide between test runs.

pub mod logging;

use ulid::Ulid;

/// Generate a database name that is unique and safe as an unquoted
/// Postgres identifier (lowercase, underscores, at most 63 bytes).
///
/// # Examples
/// ```
/// use test_support::unique_db_name;
///
/// let name = unique_db_name("amassdb_test");
/// assert!(name.starts_with("amassdb_test_"));
/// assert!(name.len() <= 63);
/// assert_eq!(name, name.to_lowercase());
/// ```
pub fn unique_db_name(prefix: &str) -> String {
    let mut name = format!("{}_{}", prefix, Ulid::new()).to_lowercase();
    name.truncate(63);
    name
}
