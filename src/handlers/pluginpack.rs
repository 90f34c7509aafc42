// src/handlers/pluginpack.rs

//! The installed pack record itself (`information` section)

use super::{HandlerContext, HandlerKind, LinkedObjects, ObjectHandler};
use crate::db::models::PluginPack;
use crate::error::{Error, Result};
use crate::manifest::{PackageDescriptor, dependencies_of};
use rusqlite::Connection;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Default)]
pub struct PluginPackHandler {
    information: Value,
    context: HandlerContext,
}

impl PluginPackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn descriptor(&self) -> Result<PackageDescriptor> {
        PackageDescriptor::from_value(&self.information)
    }

    fn text(&self, key: &str) -> Option<String> {
        self.information
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Row built from the `information` section
    fn record(&self) -> Result<PluginPack> {
        let descriptor = self.descriptor()?;
        let mut pack = PluginPack::new(descriptor.slug, descriptor.name, descriptor.version);
        pack.status = self.text("status");
        pack.status_message = self.text("status_message");
        pack.changelog = self.text("changelog");
        pack.monitoring_procedure = self.text("monitoring_procedure");
        pack.icon_id = self
            .context
            .icons
            .resolve(&pack.slug, self.information.get("icon").and_then(Value::as_str));
        Ok(pack)
    }

    /// Ids of the declared dependencies, all of which must be installed
    fn dependency_ids(&self, conn: &Connection, slug: &str) -> Result<Vec<i64>> {
        dependencies_of(&self.information)?
            .into_iter()
            .map(|dependency| {
                PluginPack::find_id_by_slug(conn, &dependency.slug)?.ok_or_else(|| {
                    Error::DependencyNotInstalled {
                        package: slug.to_string(),
                        dependency: dependency.slug,
                    }
                })
            })
            .collect()
    }

    fn installed(&self, conn: &Connection) -> Result<PluginPack> {
        let slug = self.descriptor()?.slug;
        PluginPack::find_by_slug(conn, &slug)?.ok_or(Error::NotInstalled(slug))
    }

    fn ensure_removable(conn: &Connection, pack: &PluginPack) -> Result<i64> {
        let id = pack.id.ok_or_else(|| Error::NotInstalled(pack.slug.clone()))?;
        let dependents = PluginPack::dependent_slugs(conn, id)?;
        if !dependents.is_empty() {
            return Err(Error::PackInUse {
                slug: pack.slug.clone(),
                dependents,
            });
        }
        Ok(id)
    }
}

impl ObjectHandler for PluginPackHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::PluginPack
    }

    fn set_object_params(&mut self, params: Option<&Value>) -> Result<()> {
        self.information = params
            .cloned()
            .ok_or_else(|| Error::InvalidManifest("missing 'information' section".to_string()))?;
        Ok(())
    }

    fn set_context(&mut self, context: &HandlerContext) {
        self.context = context.clone();
    }

    fn prepare_install(&mut self, conn: &Connection) -> Result<()> {
        let slug = self.descriptor()?.slug;
        if PluginPack::find_id_by_slug(conn, &slug)?.is_some() {
            return Err(Error::AlreadyInstalled(slug));
        }
        Ok(())
    }

    fn prepare_update(&mut self, conn: &Connection) -> Result<()> {
        self.installed(conn).map(|_| ())
    }

    fn prepare_uninstall(&mut self, conn: &Connection) -> Result<()> {
        let pack = self.installed(conn)?;
        Self::ensure_removable(conn, &pack).map(|_| ())
    }

    fn launch_install(&mut self, conn: &Connection) -> Result<()> {
        let mut pack = self.record()?;
        let dependency_ids = self.dependency_ids(conn, &pack.slug)?;
        let id = pack.insert(conn)?;
        PluginPack::set_dependencies(conn, id, &dependency_ids)?;
        debug!("Recorded plugin pack {}-{}", pack.slug, pack.version);
        Ok(())
    }

    fn launch_update(&mut self, conn: &Connection) -> Result<()> {
        let installed = self.installed(conn)?;
        let id = installed.id.ok_or_else(|| Error::NotInstalled(installed.slug.clone()))?;

        let mut pack = self.record()?;
        let dependency_ids = self.dependency_ids(conn, &pack.slug)?;
        pack.update(conn)?;
        PluginPack::set_dependencies(conn, id, &dependency_ids)?;
        debug!(
            "Updated plugin pack {} from {} to {}",
            pack.slug, installed.version, pack.version
        );
        Ok(())
    }

    fn launch_uninstall(&mut self, conn: &Connection) -> Result<()> {
        let pack = self.installed(conn)?;
        let id = Self::ensure_removable(conn, &pack)?;
        PluginPack::delete(conn, id)?;
        debug!("Removed plugin pack record {}", pack.slug);
        Ok(())
    }

    fn check_linked_objects(&self, conn: &Connection, linked: &mut LinkedObjects) -> Result<()> {
        let slug = self.descriptor()?.slug;
        if let Some(id) = PluginPack::find_id_by_slug(conn, &slug)? {
            linked.add("pluginpacks", &slug, PluginPack::dependent_slugs(conn, id)?);
        }
        Ok(())
    }

    fn owned_objects(&self) -> Vec<String> {
        self.descriptor().map(|d| vec![d.slug]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    fn handler(information: Value) -> PluginPackHandler {
        let mut handler = PluginPackHandler::new();
        handler.set_object_params(Some(&information)).unwrap();
        handler
    }

    #[test]
    fn test_install_records_dependencies() {
        let conn = db::open_in_memory().unwrap();

        let mut base = handler(json!({"slug": "base", "version": "1.0.0", "status": "stable"}));
        base.prepare_install(&conn).unwrap();
        base.launch_install(&conn).unwrap();

        let mut os = handler(json!({
            "slug": "os", "name": "OS Linux", "version": "2.0.0",
            "dependencies": [{"slug": "base", "version": "1.0.0"}]
        }));
        os.launch_install(&conn).unwrap();

        let record = PluginPack::find_by_slug(&conn, "os").unwrap().unwrap();
        assert_eq!(record.name, "OS Linux");
        assert_eq!(
            PluginPack::dependency_slugs(&conn, record.id.unwrap()).unwrap(),
            vec!["base"]
        );

        assert!(matches!(base.prepare_install(&conn), Err(Error::AlreadyInstalled(_))));
        assert!(matches!(base.prepare_uninstall(&conn), Err(Error::PackInUse { .. })));

        let mut linked = LinkedObjects::new();
        base.check_linked_objects(&conn, &mut linked).unwrap();
        assert_eq!(linked.get("pluginpacks", "base").unwrap(), ["os"]);
    }

    #[test]
    fn test_missing_dependency() {
        let conn = db::open_in_memory().unwrap();
        let mut pack = handler(json!({
            "slug": "os", "version": "1.0.0",
            "dependencies": [{"slug": "base", "version": "1.0.0"}]
        }));
        assert!(matches!(
            pack.launch_install(&conn),
            Err(Error::DependencyNotInstalled { .. })
        ));
    }

    #[test]
    fn test_update_and_uninstall() {
        let conn = db::open_in_memory().unwrap();
        let mut pack = handler(json!({"slug": "os", "version": "1.0.0"}));
        assert!(matches!(pack.prepare_update(&conn), Err(Error::NotInstalled(_))));
        pack.launch_install(&conn).unwrap();

        let mut newer = handler(json!({"slug": "os", "version": "1.1.0", "changelog": "fixes"}));
        newer.prepare_update(&conn).unwrap();
        newer.launch_update(&conn).unwrap();
        let record = PluginPack::find_by_slug(&conn, "os").unwrap().unwrap();
        assert_eq!(record.version, "1.1.0");
        assert_eq!(record.changelog.as_deref(), Some("fixes"));

        newer.prepare_uninstall(&conn).unwrap();
        newer.launch_uninstall(&conn).unwrap();
        assert!(PluginPack::find_by_slug(&conn, "os").unwrap().is_none());
    }
}
