// src/db/models/macro_entry.rs

//! Custom macros attached to host and service templates

use crate::error::Result;
use rusqlite::{Connection, Row, params};

/// Which table a macro belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroOwner {
    Host,
    Service,
}

impl MacroOwner {
    fn table(self) -> &'static str {
        match self {
            MacroOwner::Host => "host_macros",
            MacroOwner::Service => "service_macros",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            MacroOwner::Host => "host_id",
            MacroOwner::Service => "service_id",
        }
    }
}

/// One macro, with its `$_HOST...$`/`$_SERVICE...$` decoration stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEntry {
    pub name: String,
    pub value: String,
    pub is_password: bool,
    pub description: String,
}

impl MacroEntry {
    /// Replace every macro of one host or service
    pub fn replace_all(conn: &Connection, owner: MacroOwner, owner_id: i64, macros: &[MacroEntry]) -> Result<()> {
        conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", owner.table(), owner.owner_column()),
            [owner_id],
        )?;

        let mut stmt = conn.prepare(&format!(
            "INSERT OR REPLACE INTO {} ({}, name, value, is_password, description) VALUES (?1, ?2, ?3, ?4, ?5)",
            owner.table(),
            owner.owner_column()
        ))?;
        for entry in macros {
            stmt.execute(params![
                owner_id,
                &entry.name,
                &entry.value,
                entry.is_password,
                &entry.description
            ])?;
        }
        Ok(())
    }

    /// Macros of one host or service, by name
    pub fn list(conn: &Connection, owner: MacroOwner, owner_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT name, value, is_password, description FROM {} WHERE {} = ?1 ORDER BY name",
            owner.table(),
            owner.owner_column()
        ))?;
        let macros = stmt
            .query_map([owner_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(macros)
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            value: row.get(1)?,
            is_password: row.get(2)?,
            description: row.get(3)?,
        })
    }
}
