// src/db/models/host.rs

//! Host model - registered hosts and host templates share one table

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

const COLUMNS: &str = "id, name, alias, comment, register, locked, command_id, icon_id, \
                       max_check_attempts, check_interval, retry_interval, active_checks, passive_checks";

/// Tri-state flag value meaning "inherit from the template"
pub const INHERIT: i64 = 2;

/// One row of `hosts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub id: Option<i64>,
    pub name: String,
    pub alias: Option<String>,
    pub comment: Option<String>,
    /// False for templates
    pub register: bool,
    pub locked: bool,
    pub command_id: Option<i64>,
    pub icon_id: Option<i64>,
    pub max_check_attempts: Option<i64>,
    pub check_interval: Option<i64>,
    pub retry_interval: Option<i64>,
    pub active_checks: i64,
    pub passive_checks: i64,
}

impl Host {
    /// A host template with inherited check settings
    pub fn new_template(name: String) -> Self {
        Self {
            id: None,
            name,
            alias: None,
            comment: None,
            register: false,
            locked: false,
            command_id: None,
            icon_id: None,
            max_check_attempts: None,
            check_interval: None,
            retry_interval: None,
            active_checks: INHERIT,
            passive_checks: INHERIT,
        }
    }

    /// A registered (monitored) host
    pub fn new_host(name: String) -> Self {
        Self {
            register: true,
            ..Self::new_template(name)
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO hosts (name, alias, comment, register, locked, command_id, icon_id,
                                max_check_attempts, check_interval, retry_interval, active_checks, passive_checks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                &self.name,
                &self.alias,
                &self.comment,
                self.register,
                self.locked,
                &self.command_id,
                &self.icon_id,
                &self.max_check_attempts,
                &self.check_interval,
                &self.retry_interval,
                self.active_checks,
                self.passive_checks,
            ],
        )?;
        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Overwrite every column of the row with this id
    pub fn update(&self, conn: &Connection, id: i64) -> Result<()> {
        conn.execute(
            "UPDATE hosts SET name = ?1, alias = ?2, comment = ?3, register = ?4, locked = ?5,
                              command_id = ?6, icon_id = ?7, max_check_attempts = ?8, check_interval = ?9,
                              retry_interval = ?10, active_checks = ?11, passive_checks = ?12
             WHERE id = ?13",
            params![
                &self.name,
                &self.alias,
                &self.comment,
                self.register,
                self.locked,
                &self.command_id,
                &self.icon_id,
                &self.max_check_attempts,
                &self.check_interval,
                &self.retry_interval,
                self.active_checks,
                self.passive_checks,
                id,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM hosts WHERE name = ?1"))?;
        let host = stmt.query_row([name], Self::from_row).optional()?;
        Ok(host)
    }

    pub fn find_id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row("SELECT id FROM hosts WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    /// Delete by name, returning whether a row was removed
    pub fn delete_by_name(conn: &Connection, name: &str) -> Result<bool> {
        let removed = conn.execute("DELETE FROM hosts WHERE name = ?1", [name])?;
        Ok(removed > 0)
    }

    pub fn set_alias(conn: &Connection, id: i64, alias: &str) -> Result<()> {
        conn.execute("UPDATE hosts SET alias = ?1 WHERE id = ?2", params![alias, id])?;
        Ok(())
    }

    /// Replace the ordered parent templates of a host
    pub fn set_parents(conn: &Connection, id: i64, parent_ids: &[i64]) -> Result<()> {
        conn.execute("DELETE FROM host_parents WHERE host_id = ?1", [id])?;
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO host_parents (host_id, parent_id, position) VALUES (?1, ?2, ?3)",
        )?;
        for (position, parent_id) in parent_ids.iter().enumerate() {
            stmt.execute(params![id, parent_id, position as i64])?;
        }
        Ok(())
    }

    /// Parent template names in inheritance order
    pub fn parent_names(conn: &Connection, id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT h.name FROM host_parents p JOIN hosts h ON h.id = p.parent_id
             WHERE p.host_id = ?1 ORDER BY p.position",
        )?;
        let names = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Names of hosts inheriting directly from the template `name`
    ///
    /// `templates` selects child templates instead of registered hosts.
    pub fn children_of(conn: &Connection, name: &str, templates: bool) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT child.name FROM host_parents p
             JOIN hosts parent ON parent.id = p.parent_id
             JOIN hosts child ON child.id = p.host_id
             WHERE parent.name = ?1 AND child.register = ?2
             ORDER BY child.name",
        )?;
        let names = stmt
            .query_map(params![name, !templates], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Link a service (or service template) to a host; false when already linked
    pub fn link_service(conn: &Connection, host_id: i64, service_id: i64) -> Result<bool> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO host_service_relations (host_id, service_id) VALUES (?1, ?2)",
            [host_id, service_id],
        )?;
        Ok(changed > 0)
    }

    pub fn unlink_service(conn: &Connection, host_id: i64, service_id: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM host_service_relations WHERE host_id = ?1 AND service_id = ?2",
            [host_id, service_id],
        )?;
        Ok(())
    }

    /// Ids of services linked to a host
    pub fn service_ids(conn: &Connection, host_id: i64) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT service_id FROM host_service_relations WHERE host_id = ?1 ORDER BY service_id",
        )?;
        let ids = stmt
            .query_map([host_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            alias: row.get(2)?,
            comment: row.get(3)?,
            register: row.get(4)?,
            locked: row.get(5)?,
            command_id: row.get(6)?,
            icon_id: row.get(7)?,
            max_check_attempts: row.get(8)?,
            check_interval: row.get(9)?,
            retry_interval: row.get(10)?,
            active_checks: row.get(11)?,
            passive_checks: row.get(12)?,
        })
    }
}
