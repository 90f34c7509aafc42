// src/db/models/service.rs

//! Service model - registered services and service templates share one table

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::host::INHERIT;

const COLUMNS: &str = "id, description, alias, comment, register, locked, template_id, command_id, icon_id, \
                       max_check_attempts, check_interval, retry_interval, active_checks, passive_checks, is_volatile";

/// One row of `services`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id: Option<i64>,
    pub description: String,
    pub alias: Option<String>,
    pub comment: Option<String>,
    /// False for templates
    pub register: bool,
    pub locked: bool,
    /// Parent service template
    pub template_id: Option<i64>,
    pub command_id: Option<i64>,
    pub icon_id: Option<i64>,
    pub max_check_attempts: Option<i64>,
    pub check_interval: Option<i64>,
    pub retry_interval: Option<i64>,
    pub active_checks: i64,
    pub passive_checks: i64,
    pub is_volatile: i64,
}

impl Service {
    pub fn new_template(description: String) -> Self {
        Self {
            id: None,
            description,
            alias: None,
            comment: None,
            register: false,
            locked: false,
            template_id: None,
            command_id: None,
            icon_id: None,
            max_check_attempts: None,
            check_interval: None,
            retry_interval: None,
            active_checks: INHERIT,
            passive_checks: INHERIT,
            is_volatile: INHERIT,
        }
    }

    /// A registered service using `template_id`
    pub fn new_service(description: String, template_id: Option<i64>) -> Self {
        Self {
            register: true,
            template_id,
            ..Self::new_template(description)
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO services (description, alias, comment, register, locked, template_id, command_id, icon_id,
                                   max_check_attempts, check_interval, retry_interval, active_checks, passive_checks, is_volatile)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                &self.description,
                &self.alias,
                &self.comment,
                self.register,
                self.locked,
                &self.template_id,
                &self.command_id,
                &self.icon_id,
                &self.max_check_attempts,
                &self.check_interval,
                &self.retry_interval,
                self.active_checks,
                self.passive_checks,
                self.is_volatile,
            ],
        )?;
        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Overwrite every column of the row with this id
    pub fn update(&self, conn: &Connection, id: i64) -> Result<()> {
        conn.execute(
            "UPDATE services SET description = ?1, alias = ?2, comment = ?3, register = ?4, locked = ?5,
                                 template_id = ?6, command_id = ?7, icon_id = ?8, max_check_attempts = ?9,
                                 check_interval = ?10, retry_interval = ?11, active_checks = ?12,
                                 passive_checks = ?13, is_volatile = ?14
             WHERE id = ?15",
            params![
                &self.description,
                &self.alias,
                &self.comment,
                self.register,
                self.locked,
                &self.template_id,
                &self.command_id,
                &self.icon_id,
                &self.max_check_attempts,
                &self.check_interval,
                &self.retry_interval,
                self.active_checks,
                self.passive_checks,
                self.is_volatile,
                id,
            ],
        )?;
        Ok(())
    }

    /// Find a service template by its description
    pub fn find_template(conn: &Connection, description: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM services WHERE description = ?1 AND register = 0"
        ))?;
        let service = stmt.query_row([description], Self::from_row).optional()?;
        Ok(service)
    }

    pub fn find_template_id(conn: &Connection, description: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM services WHERE description = ?1 AND register = 0",
                [description],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM services WHERE id = ?1"))?;
        let service = stmt.query_row([id], Self::from_row).optional()?;
        Ok(service)
    }

    /// Delete a service template by description, returning whether a row was removed
    pub fn delete_template(conn: &Connection, description: &str) -> Result<bool> {
        let removed = conn.execute(
            "DELETE FROM services WHERE description = ?1 AND register = 0",
            [description],
        )?;
        Ok(removed > 0)
    }

    pub fn set_alias(conn: &Connection, id: i64, alias: &str) -> Result<()> {
        conn.execute("UPDATE services SET alias = ?1 WHERE id = ?2", params![alias, id])?;
        Ok(())
    }

    /// Descriptions of services inheriting directly from the template `description`
    ///
    /// `templates` selects child templates instead of registered services.
    pub fn children_of(conn: &Connection, description: &str, templates: bool) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT child.description FROM services child
             JOIN services parent ON parent.id = child.template_id
             WHERE parent.description = ?1 AND parent.register = 0 AND child.register = ?2
             ORDER BY child.description",
        )?;
        let names = stmt
            .query_map(params![description, !templates], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            description: row.get(1)?,
            alias: row.get(2)?,
            comment: row.get(3)?,
            register: row.get(4)?,
            locked: row.get(5)?,
            template_id: row.get(6)?,
            command_id: row.get(7)?,
            icon_id: row.get(8)?,
            max_check_attempts: row.get(9)?,
            check_interval: row.get(10)?,
            retry_interval: row.get(11)?,
            active_checks: row.get(12)?,
            passive_checks: row.get(13)?,
            is_volatile: row.get(14)?,
        })
    }
}
