// src/db/models/command.rs

//! Check command model

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Command type as stored in `commands.command_type`
pub const CHECK_COMMAND_TYPE: i64 = 2;

/// One row of `commands`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: Option<i64>,
    pub name: String,
    pub line: String,
    pub command_type: i64,
    pub locked: bool,
}

impl Command {
    pub fn new(name: String, line: String) -> Self {
        Self {
            id: None,
            name,
            line,
            command_type: CHECK_COMMAND_TYPE,
            locked: false,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO commands (name, line, command_type, locked) VALUES (?1, ?2, ?3, ?4)",
            params![&self.name, &self.line, self.command_type, self.locked],
        )?;
        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Insert or overwrite the command with the same name
    pub fn upsert(&mut self, conn: &Connection) -> Result<i64> {
        match Self::find_id_by_name(conn, &self.name)? {
            Some(id) => {
                conn.execute(
                    "UPDATE commands SET line = ?1, command_type = ?2, locked = ?3 WHERE id = ?4",
                    params![&self.line, self.command_type, self.locked, id],
                )?;
                self.id = Some(id);
                Ok(id)
            }
            None => self.insert(conn),
        }
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, line, command_type, locked FROM commands WHERE name = ?1")?;
        let command = stmt.query_row([name], Self::from_row).optional()?;
        Ok(command)
    }

    pub fn find_id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row("SELECT id FROM commands WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM commands WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Number of hosts and services (templates included) referencing a command
    pub fn usage_count(conn: &Connection, id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM hosts WHERE command_id = ?1)
                  + (SELECT COUNT(*) FROM services WHERE command_id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Registered hosts and services running this command, as display names
    pub fn registered_users(conn: &Connection, id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT name FROM hosts WHERE command_id = ?1 AND register = 1
             UNION ALL
             SELECT description FROM services WHERE command_id = ?1 AND register = 1
             ORDER BY 1",
        )?;
        let names = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            line: row.get(2)?,
            command_type: row.get(3)?,
            locked: row.get(4)?,
        })
    }
}
