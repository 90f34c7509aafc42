// src/db/models/pluginpack.rs

//! Installed plugin pack records, their dependency edges and the
//! host/service links created on their behalf

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

const COLUMNS: &str = "id, slug, name, version, status, status_message, changelog, icon_id, \
                       monitoring_procedure, complete, installed_at, updated_at";

/// One row of `pluginpacks`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginPack {
    pub id: Option<i64>,
    pub slug: String,
    pub name: String,
    pub version: String,
    pub status: Option<String>,
    pub status_message: Option<String>,
    pub changelog: Option<String>,
    pub icon_id: Option<i64>,
    pub monitoring_procedure: Option<String>,
    /// Last install/update processed every manifest section
    pub complete: bool,
    pub installed_at: Option<String>,
    pub updated_at: Option<String>,
}

impl PluginPack {
    pub fn new(slug: String, name: String, version: String) -> Self {
        Self {
            id: None,
            slug,
            name,
            version,
            status: None,
            status_message: None,
            changelog: None,
            icon_id: None,
            monitoring_procedure: None,
            complete: false,
            installed_at: None,
            updated_at: None,
        }
    }

    /// Insert this pack into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let installed_at = crate::db::now();
        conn.execute(
            "INSERT INTO pluginpacks (slug, name, version, status, status_message, changelog, icon_id, monitoring_procedure, complete, installed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &self.slug,
                &self.name,
                &self.version,
                &self.status,
                &self.status_message,
                &self.changelog,
                &self.icon_id,
                &self.monitoring_procedure,
                self.complete,
                &installed_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        self.installed_at = Some(installed_at);
        Ok(id)
    }

    /// Rewrite the descriptive columns of an existing pack, matched by slug
    pub fn update(&mut self, conn: &Connection) -> Result<()> {
        let updated_at = crate::db::now();
        conn.execute(
            "UPDATE pluginpacks
             SET name = ?1, version = ?2, status = ?3, status_message = ?4, changelog = ?5,
                 icon_id = ?6, monitoring_procedure = ?7, updated_at = ?8
             WHERE slug = ?9",
            params![
                &self.name,
                &self.version,
                &self.status,
                &self.status_message,
                &self.changelog,
                &self.icon_id,
                &self.monitoring_procedure,
                &updated_at,
                &self.slug,
            ],
        )?;
        self.updated_at = Some(updated_at);
        Ok(())
    }

    pub fn find_by_slug(conn: &Connection, slug: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM pluginpacks WHERE slug = ?1"))?;
        let pack = stmt.query_row([slug], Self::from_row).optional()?;
        Ok(pack)
    }

    pub fn find_id_by_slug(conn: &Connection, slug: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row("SELECT id FROM pluginpacks WHERE slug = ?1", [slug], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    /// List all installed packs ordered by slug
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM pluginpacks ORDER BY slug"))?;
        let packs = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(packs)
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM pluginpacks WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Persist the completeness flag
    pub fn set_complete(conn: &Connection, slug: &str, complete: bool) -> Result<()> {
        conn.execute(
            "UPDATE pluginpacks SET complete = ?1 WHERE slug = ?2",
            params![complete, slug],
        )?;
        Ok(())
    }

    /// Replace the dependency edges of a pack
    pub fn set_dependencies(conn: &Connection, id: i64, dependency_ids: &[i64]) -> Result<()> {
        conn.execute("DELETE FROM pluginpack_dependencies WHERE pluginpack_id = ?1", [id])?;
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO pluginpack_dependencies (pluginpack_id, dependency_id) VALUES (?1, ?2)",
        )?;
        for dependency_id in dependency_ids {
            stmt.execute([id, *dependency_id])?;
        }
        Ok(())
    }

    /// Slugs this pack depends on
    pub fn dependency_slugs(conn: &Connection, id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT p.slug FROM pluginpack_dependencies d
             JOIN pluginpacks p ON p.id = d.dependency_id
             WHERE d.pluginpack_id = ?1
             ORDER BY p.slug",
        )?;
        let slugs = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(slugs)
    }

    /// Slugs of installed packs that depend on this one
    pub fn dependent_slugs(conn: &Connection, id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT p.slug FROM pluginpack_dependencies d
             JOIN pluginpacks p ON p.id = d.pluginpack_id
             WHERE d.dependency_id = ?1
             ORDER BY p.slug",
        )?;
        let slugs = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(slugs)
    }

    /// Record a host/service link created for a pack; false when already recorded
    pub fn record_host_service(conn: &Connection, id: i64, host_id: i64, service_id: i64) -> Result<bool> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO pluginpack_host_services (pluginpack_id, host_id, service_id)
             VALUES (?1, ?2, ?3)",
            [id, host_id, service_id],
        )?;
        Ok(changed > 0)
    }

    /// Host/service links recorded for a pack
    pub fn host_services(conn: &Connection, id: i64) -> Result<Vec<(i64, i64)>> {
        let mut stmt = conn.prepare(
            "SELECT host_id, service_id FROM pluginpack_host_services
             WHERE pluginpack_id = ?1 ORDER BY host_id, service_id",
        )?;
        let links = stmt
            .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(links)
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            slug: row.get(1)?,
            name: row.get(2)?,
            version: row.get(3)?,
            status: row.get(4)?,
            status_message: row.get(5)?,
            changelog: row.get(6)?,
            icon_id: row.get(7)?,
            monitoring_procedure: row.get(8)?,
            complete: row.get(9)?,
            installed_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}
