// src/resolver/plan.rs

//! Dependency check plan
//!
//! Resolves the install order of a pack and compares every entry with what
//! is installed, keeping only the packs that still need work.

use super::dependency::DependencySorter;
use crate::db::models::PluginPack;
use crate::error::Result;
use crate::manifest::PackageDescriptor;
use crate::provider::ManifestProvider;
use crate::version::PackVersion;
use rusqlite::Connection;
use serde::Serialize;
use strum_macros::Display;
use tracing::debug;

/// What a resolved dependency needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DependencyStatus {
    /// Not installed
    ToInstall,
    /// Installed at an older version, or installed incompletely
    ToUpgrade,
}

/// One pack of the install order that is not up to date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDependency {
    pub slug: String,
    pub version: String,
    pub status: DependencyStatus,
    pub installed_version: Option<String>,
}

/// Install order of `descriptor` restricted to the packs needing work
///
/// The target pack itself is part of the plan. Entries keep the resolver's
/// order, so dependencies still precede dependents.
pub fn plan_dependencies<P: ManifestProvider + ?Sized>(
    conn: &Connection,
    provider: &P,
    descriptor: &PackageDescriptor,
) -> Result<Vec<PlannedDependency>> {
    let mut sorter = DependencySorter::new(provider);
    sorter.get_sorted_dependencies(descriptor)?;

    let mut plan = Vec::new();
    for resolved in sorter.into_sorted() {
        let status = match PluginPack::find_by_slug(conn, &resolved.slug)? {
            None => Some((DependencyStatus::ToInstall, None)),
            Some(installed) => {
                let newer = PackVersion::parse(&resolved.version)? > PackVersion::parse(&installed.version)?;
                (newer || !installed.complete)
                    .then_some((DependencyStatus::ToUpgrade, Some(installed.version)))
            }
        };

        match status {
            Some((status, installed_version)) => plan.push(PlannedDependency {
                slug: resolved.slug,
                version: resolved.version,
                status,
                installed_version,
            }),
            None => debug!("{}-{} is up to date", resolved.slug, resolved.version),
        }
    }
    Ok(plan)
}
