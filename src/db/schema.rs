// src/db/schema.rs

//! Database schema definitions and migrations
//!
//! The schema models the slice of monitoring configuration plugin packs
//! manage: commands, host and service templates (with inheritance and
//! macros), icons, the registered hosts/services that use them, and the
//! installed pack records with their completeness flag.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("Schema migration complete. Now at version {}", SCHEMA_VERSION);
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Ok(()),
    }
}

/// Initial schema - Version 1
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        -- Icons (media) shipped by plugin packs, keyed '<pack slug>-<icon name>'
        CREATE TABLE icons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            filename TEXT NOT NULL,
            data BLOB NOT NULL
        );

        -- Installed plugin packs
        CREATE TABLE pluginpacks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            status TEXT,
            status_message TEXT,
            changelog TEXT,
            icon_id INTEGER REFERENCES icons(id) ON DELETE SET NULL,
            monitoring_procedure TEXT,
            complete INTEGER NOT NULL DEFAULT 0,
            installed_at TEXT NOT NULL,
            updated_at TEXT
        );

        CREATE TABLE pluginpack_dependencies (
            pluginpack_id INTEGER NOT NULL REFERENCES pluginpacks(id) ON DELETE CASCADE,
            dependency_id INTEGER NOT NULL REFERENCES pluginpacks(id),
            PRIMARY KEY (pluginpack_id, dependency_id)
        );

        CREATE INDEX idx_pluginpack_dependencies_dep ON pluginpack_dependencies(dependency_id);

        -- Check commands
        CREATE TABLE commands (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            line TEXT NOT NULL,
            command_type INTEGER NOT NULL DEFAULT 2,
            locked INTEGER NOT NULL DEFAULT 0
        );

        -- Hosts and host templates (register = 0)
        CREATE TABLE hosts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            alias TEXT,
            comment TEXT,
            register INTEGER NOT NULL DEFAULT 1,
            locked INTEGER NOT NULL DEFAULT 0,
            command_id INTEGER REFERENCES commands(id) ON DELETE SET NULL,
            icon_id INTEGER REFERENCES icons(id) ON DELETE SET NULL,
            max_check_attempts INTEGER,
            check_interval INTEGER,
            retry_interval INTEGER,
            active_checks INTEGER NOT NULL DEFAULT 2,
            passive_checks INTEGER NOT NULL DEFAULT 2
        );

        CREATE TABLE host_parents (
            host_id INTEGER NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
            parent_id INTEGER NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            PRIMARY KEY (host_id, parent_id)
        );

        CREATE INDEX idx_host_parents_parent ON host_parents(parent_id);

        -- Services and service templates (register = 0)
        CREATE TABLE services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            description TEXT NOT NULL,
            alias TEXT,
            comment TEXT,
            register INTEGER NOT NULL DEFAULT 1,
            locked INTEGER NOT NULL DEFAULT 0,
            template_id INTEGER REFERENCES services(id) ON DELETE SET NULL,
            command_id INTEGER REFERENCES commands(id) ON DELETE SET NULL,
            icon_id INTEGER REFERENCES icons(id) ON DELETE SET NULL,
            max_check_attempts INTEGER,
            check_interval INTEGER,
            retry_interval INTEGER,
            active_checks INTEGER NOT NULL DEFAULT 2,
            passive_checks INTEGER NOT NULL DEFAULT 2,
            is_volatile INTEGER NOT NULL DEFAULT 2
        );

        CREATE UNIQUE INDEX idx_service_templates_description
            ON services(description) WHERE register = 0;
        CREATE INDEX idx_services_template ON services(template_id);

        -- Host <-> service links (templates and registered objects alike)
        CREATE TABLE host_service_relations (
            host_id INTEGER NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
            service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
            PRIMARY KEY (host_id, service_id)
        );

        -- Links created on behalf of a plugin pack
        CREATE TABLE pluginpack_host_services (
            pluginpack_id INTEGER NOT NULL REFERENCES pluginpacks(id) ON DELETE CASCADE,
            host_id INTEGER NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
            service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
            PRIMARY KEY (pluginpack_id, host_id, service_id)
        );

        CREATE TABLE host_macros (
            host_id INTEGER NOT NULL REFERENCES hosts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            value TEXT NOT NULL DEFAULT '',
            is_password INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (host_id, name)
        );

        CREATE TABLE service_macros (
            service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            value TEXT NOT NULL DEFAULT '',
            is_password INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (service_id, name)
        );
        ",
    )?;

    Ok(())
}
