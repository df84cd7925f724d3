use std::collections::HashSet;

use crate::error::MigrationError;
use crate::source::Migration;
use crate::table::MigrationRecord;

/// Upper bound used when counting pending migrations.
pub const PENDING_LIMIT: usize = i32::MAX as usize;

/// Migrations from `available` that have no record yet, in order.
///
/// Every applied record must still exist in the source; a record the source
/// does not know about means the database was migrated by a different build.
pub fn plan_up(
    available: Vec<Migration>,
    applied: &[MigrationRecord],
    limit: Option<usize>,
) -> Result<Vec<Migration>, MigrationError> {
    let known: HashSet<&str> = available.iter().map(|m| m.id.as_str()).collect();
    if let Some(unknown) = applied.iter().find(|r| !known.contains(r.id.as_str())) {
        return Err(MigrationError::UnknownApplied {
            id: unknown.id.clone(),
        });
    }

    let done: HashSet<&str> = applied.iter().map(|r| r.id.as_str()).collect();
    let pending = available
        .into_iter()
        .filter(|m| !done.contains(m.id.as_str()))
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    Ok(pending)
}
