// src/db/mod.rs

//! SQLite persistence for installed plugin packs and monitoring objects

pub mod models;
pub mod schema;

use crate::error::Result;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tracing::debug;

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// Create (if needed) and migrate the database at `path`
pub fn init(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    debug!("Database initialized at {}", path.display());
    Ok(())
}

/// Open an existing database, applying pending migrations
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path.as_ref())?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Fresh, migrated in-memory database
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Current UTC timestamp as stored in the database
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
