// src/lib.rs

//! Plugin Pack Manager
//!
//! Installs, updates and removes plugin packs: versioned bundles of
//! monitoring commands, host templates, service templates and icons.
//!
//! # Architecture
//!
//! - Manifests come from a [`provider::ManifestProvider`] (local catalog or in-memory)
//! - [`resolver`] orders dependencies between packs and templates inside a pack
//! - [`handlers`] write one manifest section each into the SQLite store
//! - [`operation`] runs install/update/uninstall batches, one transaction per pack,
//!   stopping at the first failure

pub mod config;
pub mod db;
mod error;
pub mod handlers;
pub mod manifest;
pub mod operation;
pub mod provider;
pub mod resolver;
pub mod version;

pub use config::{Config, SorterConfig};
pub use error::{Error, Result};
pub use manifest::{Manifest, PackageDescriptor};
pub use operation::{Install, Operation, OperationResult, Uninstall, Update};
pub use provider::{Action, DirectoryProvider, ManifestProvider, MemoryProvider};
