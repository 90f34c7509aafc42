// src/operation/manager.rs

//! Batch loop shared by install, update and uninstall

use super::{FailedOperation, OperationResult, SectionReport};
use crate::config::SorterConfig;
use crate::db::models::PluginPack;
use crate::error::{Error, Result};
use crate::handlers::{
    HandlerContext, IconManager, IconMap, LinkedObjectReference, LinkedObjects, ObjectHandler,
    default_handlers,
};
use crate::manifest::{Manifest, PackageDescriptor};
use crate::provider::{Action, ManifestProvider};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Drives the registered handlers over a batch of packages
pub struct OperationManager<'a, P: ManifestProvider + ?Sized> {
    conn: &'a mut Connection,
    provider: &'a P,
    handlers: Vec<Box<dyn ObjectHandler>>,
    icons: IconManager,
}

impl<'a, P: ManifestProvider + ?Sized> OperationManager<'a, P> {
    /// Manager with the built-in handlers registered
    pub fn new(conn: &'a mut Connection, provider: &'a P, sorter: SorterConfig) -> Self {
        Self {
            conn,
            provider,
            handlers: default_handlers(sorter),
            icons: IconManager::new(),
        }
    }

    /// Manager with no handler registered
    pub fn empty(conn: &'a mut Connection, provider: &'a P) -> Self {
        Self {
            conn,
            provider,
            handlers: Vec::new(),
            icons: IconManager::new(),
        }
    }

    /// Append a handler; handlers run in registration order
    pub fn register_handler(&mut self, handler: Box<dyn ObjectHandler>) {
        self.handlers.push(handler);
    }

    pub fn connection(&self) -> &Connection {
        &*self.conn
    }

    /// Manifest of `descriptor` for `action`
    ///
    /// Uninstall always loads the manifest of the installed version.
    pub fn load_plugin_pack_json_file(
        &self,
        descriptor: &PackageDescriptor,
        action: Action,
    ) -> Result<Manifest> {
        let manifest = match action {
            Action::Uninstall => {
                let installed = PluginPack::find_by_slug(&*self.conn, &descriptor.slug)?
                    .ok_or_else(|| Error::NotInstalled(descriptor.slug.clone()))?;
                let wanted = PackageDescriptor {
                    version: installed.version,
                    ..descriptor.clone()
                };
                self.provider.manifest(&wanted, action)?
            }
            Action::Install | Action::Update => self.provider.manifest(descriptor, action)?,
        };
        manifest.check_schema()?;
        Ok(manifest)
    }

    /// Run `action` over `packages`, stopping at the first failure
    pub fn launch(&mut self, packages: &[PackageDescriptor], action: Action) -> OperationResult {
        info!("Starting {} of {} plugin pack(s)", action, packages.len());
        let mut result = OperationResult::default();

        for (index, descriptor) in packages.iter().enumerate() {
            match self.process_package(descriptor, action) {
                Ok(report) => {
                    info!("{} of plugin pack {} committed", action, descriptor);
                    result.sections.insert(descriptor.slug.clone(), report);
                    result.succeeded.push(descriptor.clone());
                }
                Err(e) => {
                    warn!("{} of plugin pack {} failed: {}", action, descriptor, e);
                    result.failed = Some(FailedOperation {
                        problematic: descriptor.clone(),
                        remaining: packages[index + 1..].to_vec(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        info!(
            "{} finished: {} succeeded, {} not done",
            action,
            result.succeeded.len(),
            packages.len() - result.succeeded.len()
        );
        result
    }

    /// Apply one package inside its own transaction
    fn process_package(&mut self, descriptor: &PackageDescriptor, action: Action) -> Result<SectionReport> {
        let manifest = self.load_plugin_pack_json_file(descriptor, action)?;

        let tx = self.conn.transaction()?;
        match apply(&tx, &mut self.handlers, &self.icons, &manifest, action) {
            Ok(report) => {
                tx.commit()?;
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!("Rollback of {} failed: {}", descriptor, rollback);
                }
                Err(e)
            }
        }
    }

    /// References outside the pack that would block its removal
    ///
    /// Loads the installed manifest and asks every handler; nothing is
    /// written.
    pub fn check_used(&mut self, descriptor: &PackageDescriptor) -> Result<Vec<LinkedObjectReference>> {
        Ok(self.inspect(descriptor)?.0)
    }

    /// [`OperationManager::check_used`] for packs removed together
    ///
    /// Users belonging to another pack of the batch are dropped, and so are
    /// references left without users. Entries follow `packages`.
    pub fn check_used_batch(
        &mut self,
        packages: &[PackageDescriptor],
    ) -> Result<Vec<(PackageDescriptor, Vec<LinkedObjectReference>)>> {
        let mut owned = HashSet::new();
        let mut checked = Vec::with_capacity(packages.len());
        for descriptor in packages {
            let (references, names) = self.inspect(descriptor)?;
            owned.extend(names);
            checked.push((descriptor.clone(), references));
        }

        Ok(checked
            .into_iter()
            .map(|(descriptor, references)| {
                let outside = references
                    .into_iter()
                    .filter_map(|mut reference| {
                        reference.used_by.retain(|user| !owned.contains(user));
                        (!reference.used_by.is_empty()).then_some(reference)
                    })
                    .collect();
                (descriptor, outside)
            })
            .collect())
    }

    /// Linked-object references of an installed pack and the names it owns
    fn inspect(&mut self, descriptor: &PackageDescriptor) -> Result<(Vec<LinkedObjectReference>, Vec<String>)> {
        let manifest = self.load_plugin_pack_json_file(descriptor, Action::Uninstall)?;
        let context = HandlerContext::new(manifest.slug(), IconMap::new());

        let mut linked = LinkedObjects::new();
        let mut owned = Vec::new();
        for handler in self.handlers.iter_mut() {
            handler.set_object_params(manifest.section(handler.key_in_json()))?;
            handler.set_context(&context);
            handler.check_linked_objects(self.conn, &mut linked)?;
            owned.extend(handler.owned_objects());
        }
        Ok((linked.into_references(), owned))
    }
}

/// Hand every handler its section and the shared context, then run the
/// prepare and launch hooks of `action`
fn apply(
    conn: &Connection,
    handlers: &mut [Box<dyn ObjectHandler>],
    icons: &IconManager,
    manifest: &Manifest,
    action: Action,
) -> Result<SectionReport> {
    let slug = manifest.slug();
    let icon_map = match action {
        Action::Install | Action::Update => icons.install(conn, slug, manifest.section(icons.key_in_json()))?,
        Action::Uninstall => IconMap::new(),
    };
    let context = HandlerContext::new(slug, icon_map);

    let mut ordered: Vec<&mut Box<dyn ObjectHandler>> = handlers.iter_mut().collect();
    if action == Action::Uninstall {
        ordered.reverse();
    }

    for handler in ordered.iter_mut() {
        handler.set_object_params(manifest.section(handler.key_in_json()))?;
        handler.set_context(&context);
    }
    for handler in ordered.iter_mut() {
        match action {
            Action::Install => handler.prepare_install(conn)?,
            Action::Update => handler.prepare_update(conn)?,
            Action::Uninstall => handler.prepare_uninstall(conn)?,
        }
    }
    for handler in ordered.iter_mut() {
        debug!("Running {} handler for {}", handler.kind(), slug);
        match action {
            Action::Install => handler.launch_install(conn)?,
            Action::Update => handler.launch_update(conn)?,
            Action::Uninstall => handler.launch_uninstall(conn)?,
        }
    }

    let report = section_report(handlers, icons, manifest);
    match action {
        Action::Install | Action::Update => init_unmanaged_objects(conn, manifest, &report)?,
        Action::Uninstall => icons.uninstall(conn, slug, manifest.section(icons.key_in_json()))?,
    }
    Ok(report)
}

/// Split the manifest sections into those a handler consumes and the rest
fn section_report(handlers: &[Box<dyn ObjectHandler>], icons: &IconManager, manifest: &Manifest) -> SectionReport {
    let managed_keys: HashSet<&str> = handlers
        .iter()
        .map(|h| h.key_in_json())
        .chain(std::iter::once(icons.key_in_json()))
        .collect();

    let (managed, unmanaged): (Vec<String>, Vec<String>) = manifest
        .section_keys()
        .map(str::to_string)
        .partition(|key| managed_keys.contains(key.as_str()));
    SectionReport { managed, unmanaged }
}

/// Persist the completeness flag of the pack
fn init_unmanaged_objects(conn: &Connection, manifest: &Manifest, report: &SectionReport) -> Result<()> {
    if !report.is_complete() {
        warn!(
            "Plugin pack {} has sections no handler understands: {}",
            manifest.descriptor(),
            report.unmanaged.join(", ")
        );
    }
    PluginPack::set_complete(conn, manifest.slug(), report.is_complete())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::handlers::HandlerKind;
    use crate::provider::MemoryProvider;
    use serde_json::{Value, json};

    fn provider() -> MemoryProvider {
        MemoryProvider::new()
            .with_json(json!({
                "information": {"slug": "base", "version": "1.0.0"},
                "commands": [{"command_name": "check_ping", "command_line": "ping"}]
            }))
            .unwrap()
            .with_json(json!({
                "information": {"slug": "base", "version": "2.0.0", "schema_version": 2}
            }))
            .unwrap()
    }

    /// Handler that fails its launch hook
    struct Failing;

    impl ObjectHandler for Failing {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Command
        }

        fn key_in_json(&self) -> &'static str {
            "broken"
        }

        fn set_object_params(&mut self, _params: Option<&Value>) -> Result<()> {
            Ok(())
        }

        fn set_context(&mut self, _context: &HandlerContext) {}

        fn launch_install(&mut self, _conn: &Connection) -> Result<()> {
            Err(Error::InvalidManifest("broken section".into()))
        }

        fn launch_uninstall(&mut self, _conn: &Connection) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_schema_checked_before_mutation() {
        let mut conn = db::open_in_memory().unwrap();
        let provider = provider();
        let mut manager = OperationManager::new(&mut conn, &provider, SorterConfig::default());

        let result = manager.launch(&[PackageDescriptor::new("base", "2.0.0")], Action::Install);
        let failed = result.failed.unwrap();
        assert!(failed.error.contains("schema version 2"));
        assert!(PluginPack::find_by_slug(manager.connection(), "base").unwrap().is_none());
    }

    #[test]
    fn test_failed_handler_rolls_back_package() {
        let mut conn = db::open_in_memory().unwrap();
        let provider = provider();
        let mut manager = OperationManager::new(&mut conn, &provider, SorterConfig::default());
        manager.register_handler(Box::new(Failing));

        let result = manager.launch(&[PackageDescriptor::new("base", "1.0.0")], Action::Install);
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed.unwrap().error, "Invalid manifest: broken section");

        let conn = manager.connection();
        assert!(PluginPack::find_by_slug(conn, "base").unwrap().is_none());
        let commands: i64 = conn
            .query_row("SELECT COUNT(*) FROM commands", [], |row| row.get(0))
            .unwrap();
        assert_eq!(commands, 0);
    }

    #[test]
    fn test_uninstall_requires_installed_pack() {
        let mut conn = db::open_in_memory().unwrap();
        let provider = provider();
        let manager = OperationManager::new(&mut conn, &provider, SorterConfig::default());
        assert!(matches!(
            manager.load_plugin_pack_json_file(&PackageDescriptor::new("base", ""), Action::Uninstall),
            Err(Error::NotInstalled(_))
        ));
    }

    #[test]
    fn test_empty_manager_reports_unmanaged_sections() {
        let mut conn = db::open_in_memory().unwrap();
        let provider = provider();
        let mut manager = OperationManager::empty(&mut conn, &provider);

        let result = manager.launch(&[PackageDescriptor::new("base", "1.0.0")], Action::Install);
        let report = &result.sections["base"];
        assert_eq!(report.managed, Vec::<String>::new());
        assert_eq!(report.unmanaged, vec!["commands", "information"]);
    }
}
