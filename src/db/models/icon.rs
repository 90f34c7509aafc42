// src/db/models/icon.rs

//! Icon (media) model

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// One row of `icons`, keyed by `<pack slug>-<icon name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub id: Option<i64>,
    pub slug: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl Icon {
    pub fn new(slug: String, data: Vec<u8>) -> Self {
        let filename = format!("{slug}.png");
        Self {
            id: None,
            slug,
            filename,
            data,
        }
    }

    /// Insert, or replace the image data of the icon with the same slug
    pub fn upsert(&mut self, conn: &Connection) -> Result<i64> {
        let id = match Self::find_id_by_slug(conn, &self.slug)? {
            Some(id) => {
                conn.execute(
                    "UPDATE icons SET filename = ?1, data = ?2 WHERE id = ?3",
                    params![&self.filename, &self.data, id],
                )?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO icons (slug, filename, data) VALUES (?1, ?2, ?3)",
                    params![&self.slug, &self.filename, &self.data],
                )?;
                conn.last_insert_rowid()
            }
        };
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_slug(conn: &Connection, slug: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare("SELECT id, slug, filename, data FROM icons WHERE slug = ?1")?;
        let icon = stmt.query_row([slug], Self::from_row).optional()?;
        Ok(icon)
    }

    pub fn find_id_by_slug(conn: &Connection, slug: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row("SELECT id FROM icons WHERE slug = ?1", [slug], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    pub fn delete_by_slug(conn: &Connection, slug: &str) -> Result<bool> {
        let removed = conn.execute("DELETE FROM icons WHERE slug = ?1", [slug])?;
        Ok(removed > 0)
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            slug: row.get(1)?,
            filename: row.get(2)?,
            data: row.get(3)?,
        })
    }
}
