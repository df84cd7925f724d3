//! Parser for annotated `.sql` migration files.
//!
//! A file is split into sections by `-- +migrate Up` and `-- +migrate Down`
//! markers. Only the up section is kept. Statements end at a line ending in
//! `;`, unless wrapped in `-- +migrate StatementBegin` / `StatementEnd`.

use crate::error::MigrationError;

const DIRECTIVE_PREFIX: &str = "-- +migrate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMigration {
    pub statements: Vec<String>,
    pub no_transaction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

enum Directive {
    Up { no_transaction: bool },
    Down,
    StatementBegin,
    StatementEnd,
}

fn parse_directive(id: &str, line: &str) -> Result<Option<Directive>, MigrationError> {
    let Some(rest) = line.strip_prefix(DIRECTIVE_PREFIX) else {
        return Ok(None);
    };
    let mut words = rest.split_whitespace();
    let directive = match words.next() {
        Some("Up") => {
            let mut no_transaction = false;
            for option in words {
                match option {
                    "notransaction" => no_transaction = true,
                    other => {
                        return Err(MigrationError::parse(
                            id,
                            format!("unknown option '{other}' on Up directive"),
                        ))
                    }
                }
            }
            Directive::Up { no_transaction }
        }
        Some("Down") => Directive::Down,
        Some("StatementBegin") => Directive::StatementBegin,
        Some("StatementEnd") => Directive::StatementEnd,
        Some(other) => {
            return Err(MigrationError::parse(
                id,
                format!("unknown directive '{other}'"),
            ))
        }
        None => return Err(MigrationError::parse(id, "empty migrate directive")),
    };
    Ok(Some(directive))
}

/// Parse the contents of one migration file.
pub fn parse_migration(id: &str, sql: &str) -> Result<ParsedMigration, MigrationError> {
    let mut section = Section::Preamble;
    let mut seen_up = false;
    let mut no_transaction = false;
    let mut in_block = false;
    let mut buffer = String::new();
    let mut statements = Vec::new();

    for raw in sql.lines() {
        let line = raw.trim();

        if let Some(directive) = parse_directive(id, line)? {
            match directive {
                Directive::Up { no_transaction: nt } => {
                    ensure_flushed(id, &buffer, in_block)?;
                    if seen_up {
                        return Err(MigrationError::parse(id, "duplicate Up directive"));
                    }
                    seen_up = true;
                    no_transaction = nt;
                    section = Section::Up;
                }
                Directive::Down => {
                    ensure_flushed(id, &buffer, in_block)?;
                    section = Section::Down;
                }
                Directive::StatementBegin => {
                    if in_block {
                        return Err(MigrationError::parse(id, "nested StatementBegin"));
                    }
                    if !buffer.trim().is_empty() {
                        return Err(MigrationError::parse(
                            id,
                            "StatementBegin inside an unterminated statement",
                        ));
                    }
                    in_block = true;
                }
                Directive::StatementEnd => {
                    if !in_block {
                        return Err(MigrationError::parse(
                            id,
                            "StatementEnd without StatementBegin",
                        ));
                    }
                    in_block = false;
                    flush(section, &mut buffer, &mut statements);
                }
            }
            continue;
        }

        if section == Section::Preamble {
            continue;
        }

        if !in_block && buffer.is_empty() && (line.is_empty() || line.starts_with("--")) {
            continue;
        }

        buffer.push_str(raw);
        buffer.push('\n');

        if !in_block && ends_with_semicolon(line) {
            flush(section, &mut buffer, &mut statements);
        }
    }

    ensure_flushed(id, &buffer, in_block)?;

    if !seen_up {
        return Err(MigrationError::parse(
            id,
            "no '-- +migrate Up' directive found",
        ));
    }

    Ok(ParsedMigration {
        statements,
        no_transaction,
    })
}

/// Whether the SQL part of a line ends a statement. Words from the first one
/// starting with `--` are a trailing comment.
fn ends_with_semicolon(line: &str) -> bool {
    line.split_whitespace()
        .take_while(|word| !word.starts_with("--"))
        .last()
        .is_some_and(|word| word.ends_with(';'))
}

fn flush(section: Section, buffer: &mut String, statements: &mut Vec<String>) {
    let statement = buffer.trim().to_string();
    buffer.clear();
    if section == Section::Up && !statement.is_empty() {
        statements.push(statement);
    }
}

fn ensure_flushed(id: &str, buffer: &str, in_block: bool) -> Result<(), MigrationError> {
    if in_block {
        return Err(MigrationError::parse(
            id,
            "StatementBegin is missing its StatementEnd",
        ));
    }
    if !buffer.trim().is_empty() {
        return Err(MigrationError::parse(
            id,
            "statement must end with a semicolon or '-- +migrate StatementEnd'",
        ));
    }
    Ok(())
}
