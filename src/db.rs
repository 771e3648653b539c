use rusqlite::Connection;
use std::path::Path;

use crate::config::AppConfig;

/// Open (creating if needed) the workspace store. Tables are created by
/// the import manager from CSV structure, not here. Foreign keys are
/// declared in the DDL but global enforcement stays off: replace imports
/// delete whole parent tables, which hard enforcement would reject while
/// child rows exist. The append path resolves its keys explicitly instead.
pub fn open_db(workspace: &Path, config: &AppConfig) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(&config.db_file);
    let conn = Connection::open(db_path)?;
    Ok(conn)
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Live column set of a table, in declaration order. `table` must already
/// be allow-list validated by the caller.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut columns = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

