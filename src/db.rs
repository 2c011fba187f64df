use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::error::{MigrationError, Result};

/// Open (or create) the store file.
pub fn get_connection(db_path: &Path) -> Result<Connection> {
    Connection::open(db_path).map_err(|source| connect_error(db_path, source))
}

/// Open an existing store without creating it.
pub fn open_store(db_path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(db_path, flags).map_err(|source| connect_error(db_path, source))
}

fn connect_error(db_path: &Path, source: rusqlite::Error) -> MigrationError {
    tracing::error!("cannot open store {}: {source}", db_path.display());
    MigrationError::Connect {
        path: db_path.to_path_buf(),
        source,
    }
}

/// Run `f` against a connection scoped to this call. The connection is closed
/// explicitly on success and dropped on the error path.
pub fn with_store<T>(db_path: &Path, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    let conn = open_store(db_path)?;
    let out = f(&conn)?;
    conn.close().map_err(|(_, e)| MigrationError::Db(e))?;
    Ok(out)
}

pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

pub fn table_row_count(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT count(*) FROM {}", quote_ident(table));
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a loosely typed column as text. Identifiers may land in the store
/// as INTEGER, REAL or TEXT depending on what the reference CSV held.
pub fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(crate::fmt::number(f)),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}
