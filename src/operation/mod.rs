// src/operation/mod.rs

//! Install, update and uninstall batches
//!
//! An operation walks a list of packages in the caller's order. Each package
//! is applied inside its own database transaction; the first failure rolls
//! that package back and stops the batch. Packages committed before the
//! failure stay committed, and the untouched tail is reported as `remaining`
//! so the caller can retry just that part.

mod actions;
mod manager;

pub use actions::{Install, Uninstall, Update, reinstall};
pub use manager::OperationManager;

use crate::db::models::PluginPack;
use crate::error::Result;
use crate::manifest::PackageDescriptor;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

/// Common entry point of the three operations
pub trait Operation {
    fn launch_operation(&mut self, packages: &[PackageDescriptor]) -> OperationResult;
}

/// Manifest sections of one pack, split by whether a handler consumed them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub managed: Vec<String>,
    pub unmanaged: Vec<String>,
}

impl SectionReport {
    /// True when every section of the manifest was understood
    pub fn is_complete(&self) -> bool {
        self.unmanaged.is_empty()
    }
}

/// First failure of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOperation {
    pub problematic: PackageDescriptor,
    /// Packages after the problematic one, never attempted
    pub remaining: Vec<PackageDescriptor>,
    pub error: String,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub succeeded: Vec<PackageDescriptor>,
    pub failed: Option<FailedOperation>,
    /// Section report of every succeeded pack, by slug
    pub sections: BTreeMap<String, SectionReport>,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// Installed pack as shown by listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackSummary {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub status: Option<String>,
    pub complete: bool,
}

impl From<PluginPack> for PackSummary {
    fn from(pack: PluginPack) -> Self {
        Self {
            slug: pack.slug,
            name: pack.name,
            version: pack.version,
            status: pack.status,
            complete: pack.complete,
        }
    }
}

/// Every installed pack, by slug
pub fn installed_packs(conn: &Connection) -> Result<Vec<PackSummary>> {
    Ok(PluginPack::list_all(conn)?
        .into_iter()
        .map(PackSummary::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_installed_packs() {
        let conn = db::open_in_memory().unwrap();
        assert!(installed_packs(&conn).unwrap().is_empty());

        let mut pack = PluginPack::new("linux".into(), "Linux".into(), "1.2.0".into());
        pack.status = Some("stable".into());
        pack.insert(&conn).unwrap();
        PluginPack::set_complete(&conn, "linux", true).unwrap();

        let packs = installed_packs(&conn).unwrap();
        assert_eq!(
            packs,
            vec![PackSummary {
                slug: "linux".into(),
                name: "Linux".into(),
                version: "1.2.0".into(),
                status: Some("stable".into()),
                complete: true,
            }]
        );
    }

    #[test]
    fn test_result_serializes() {
        let result = OperationResult {
            succeeded: vec![PackageDescriptor::new("a", "1.0.0")],
            failed: Some(FailedOperation {
                problematic: PackageDescriptor::new("b", "1.0.0"),
                remaining: vec![PackageDescriptor::new("c", "1.0.0")],
                error: "boom".into(),
            }),
            sections: BTreeMap::new(),
        };
        assert!(!result.is_success());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["failed"]["problematic"]["slug"], "b");
        assert_eq!(json["failed"]["remaining"][0]["slug"], "c");
    }
}
