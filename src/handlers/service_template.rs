// src/handlers/service_template.rs

//! Service templates (`service_templates` section)
//!
//! Every template is written locked, with an unlocked `-custom` companion
//! inheriting from it. Templates of the manifest inherit from the companion
//! of their parent, never from the locked template.

use super::template::{self, custom_name};
use super::{HandlerContext, HandlerKind, LinkedObjects, ObjectHandler};
use crate::config::SorterConfig;
use crate::db::models::{MacroEntry, MacroOwner, Service};
use crate::error::{Error, Result};
use crate::manifest::TemplateRecord;
use regex::Regex;
use rusqlite::Connection;
use serde_json::Value;
use tracing::debug;

#[derive(Debug)]
pub struct ServiceTemplateHandler {
    sorter: SorterConfig,
    templates: Vec<TemplateRecord>,
    context: HandlerContext,
}

impl ServiceTemplateHandler {
    pub fn new(sorter: SorterConfig) -> Self {
        Self {
            sorter,
            templates: Vec::new(),
            context: HandlerContext::default(),
        }
    }

    fn parent_id(conn: &Connection, record: &TemplateRecord) -> Result<Option<i64>> {
        let parent = match record.parents.as_slice() {
            [] => return Ok(None),
            [parent] => custom_name(parent),
            _ => {
                return Err(Error::InvalidManifest(format!(
                    "service template '{}' can only inherit from one template",
                    record.name
                )));
            }
        };
        Service::find_template_id(conn, &parent)?
            .map(Some)
            .ok_or_else(|| Error::MissingParentTemplate {
                kind: "Service",
                parent,
                template: record.name.clone(),
            })
    }

    /// Locked row for a manifest template
    fn row(&self, conn: &Connection, record: &TemplateRecord) -> Result<Service> {
        let mut service = Service::new_template(record.name.clone());
        service.alias = Some(template::alias(record));
        service.comment = template::comment(record);
        service.locked = true;
        service.template_id = Self::parent_id(conn, record)?;
        service.command_id = template::command_id(conn, record)?;
        service.icon_id = self
            .context
            .icons
            .resolve(&self.context.pack_slug, record.str_field("icon"));
        service.max_check_attempts = template::int_field(record, "max_check_attempts");
        service.check_interval = template::int_field(record, "normal_check_interval");
        service.retry_interval = template::int_field(record, "retry_check_interval");
        service.active_checks = template::flag_field(record, "active_checks_enabled");
        service.passive_checks = template::flag_field(record, "passive_checks_enabled");
        service.is_volatile = template::flag_field(record, "is_volatile");
        Ok(service)
    }

    /// Carry an alias change over to the companion unless the user renamed it
    fn propagate_alias(conn: &Connection, existing: &Service, alias: &str) -> Result<()> {
        if existing.alias.as_deref() == Some(alias) {
            return Ok(());
        }
        if let Some(custom) = Service::find_template(conn, &custom_name(&existing.description))?
            && custom.alias == existing.alias
            && let Some(custom_id) = custom.id
        {
            Service::set_alias(conn, custom_id, alias)?;
        }
        Ok(())
    }

    fn write(&self, conn: &Connection, record: &TemplateRecord, pattern: &Regex) -> Result<()> {
        let mut service = self.row(conn, record)?;
        let alias = service.alias.clone().unwrap_or_default();

        let id = match Service::find_template(conn, &record.name)? {
            Some(existing @ Service { id: Some(id), .. }) => {
                Self::propagate_alias(conn, &existing, &alias)?;
                service.update(conn, id)?;
                id
            }
            _ => service.insert(conn)?,
        };

        MacroEntry::replace_all(conn, MacroOwner::Service, id, &template::macros(record, pattern)?)?;

        let custom = custom_name(&record.name);
        if Service::find_template_id(conn, &custom)?.is_none() {
            let mut companion = Service::new_template(custom);
            companion.alias = Some(alias);
            companion.template_id = Some(id);
            companion.insert(conn)?;
        }
        Ok(())
    }
}

impl ObjectHandler for ServiceTemplateHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::ServiceTemplate
    }

    fn set_object_params(&mut self, params: Option<&Value>) -> Result<()> {
        self.templates = TemplateRecord::list_from_value(params)?;
        Ok(())
    }

    fn set_context(&mut self, context: &HandlerContext) {
        self.context = context.clone();
    }

    fn launch_install(&mut self, conn: &Connection) -> Result<()> {
        let pattern = template::macro_pattern("SERVICE")?;
        for record in template::sort_templates(&self.sorter, &self.templates, false)? {
            self.write(conn, &record, &pattern)?;
        }
        debug!("Wrote {} service templates for {}", self.templates.len(), self.context.pack_slug);
        Ok(())
    }

    fn launch_uninstall(&mut self, conn: &Connection) -> Result<()> {
        for record in template::sort_templates(&self.sorter, &self.templates, true)? {
            Service::delete_template(conn, &custom_name(&record.name))?;
            Service::delete_template(conn, &record.name)?;
        }
        Ok(())
    }

    fn check_linked_objects(&self, conn: &Connection, linked: &mut LinkedObjects) -> Result<()> {
        let owned = template::owned_names(&self.templates);
        for name in &owned {
            let children: Vec<String> = Service::children_of(conn, name, true)?
                .into_iter()
                .filter(|child| !owned.contains(child))
                .collect();
            linked.add("service_templates", name, children);
            linked.add("services", name, Service::children_of(conn, name, false)?);
        }
        Ok(())
    }

    fn owned_objects(&self) -> Vec<String> {
        template::owned_names(&self.templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    fn handler(section: Value) -> ServiceTemplateHandler {
        let mut handler = ServiceTemplateHandler::new(SorterConfig::default());
        handler.set_object_params(Some(&section)).unwrap();
        handler.set_context(&HandlerContext::new("linux", Default::default()));
        handler
    }

    #[test]
    fn test_install_parents_and_companions() {
        let conn = db::open_in_memory().unwrap();
        let mut h = handler(json!([
            {"name": "SNMP-Cpu", "alias": "Cpu", "parent_template": "SNMP-Base",
             "macros": [{"key": "$_SERVICEWARNING$", "value": "80"}]},
            {"name": "SNMP-Base", "alias": "Base"}
        ]));
        h.launch_install(&conn).unwrap();

        let cpu = Service::find_template(&conn, "SNMP-Cpu").unwrap().unwrap();
        let base_custom = Service::find_template(&conn, "SNMP-Base-custom").unwrap().unwrap();
        assert!(cpu.locked);
        assert_eq!(cpu.template_id, base_custom.id);

        let cpu_custom = Service::find_template(&conn, "SNMP-Cpu-custom").unwrap().unwrap();
        assert!(!cpu_custom.locked);
        assert_eq!(cpu_custom.template_id, cpu.id);
        assert_eq!(cpu_custom.alias.as_deref(), Some("Cpu"));

        let macros = MacroEntry::list(&conn, MacroOwner::Service, cpu.id.unwrap()).unwrap();
        assert_eq!(macros[0].name, "WARNING");
    }

    #[test]
    fn test_missing_parent() {
        let conn = db::open_in_memory().unwrap();
        let mut h = handler(json!([{"name": "child", "parent_template": "ghost"}]));
        match h.launch_install(&conn) {
            Err(Error::MissingParentTemplate { parent, template, .. }) => {
                assert_eq!(parent, "ghost-custom");
                assert_eq!(template, "child");
            }
            other => panic!("expected missing parent, got {other:?}"),
        }
    }

    #[test]
    fn test_update_keeps_user_alias() {
        let conn = db::open_in_memory().unwrap();
        handler(json!([{"name": "a", "alias": "First"}, {"name": "b", "alias": "Bee"}]))
            .launch_install(&conn)
            .unwrap();

        // User renames the companion of b only
        let b_custom = Service::find_template_id(&conn, "b-custom").unwrap().unwrap();
        Service::set_alias(&conn, b_custom, "Mine").unwrap();

        handler(json!([{"name": "a", "alias": "Second"}, {"name": "b", "alias": "Bee2"}]))
            .launch_update(&conn)
            .unwrap();

        let a_custom = Service::find_template(&conn, "a-custom").unwrap().unwrap();
        assert_eq!(a_custom.alias.as_deref(), Some("Second"));
        let b_custom = Service::find_template(&conn, "b-custom").unwrap().unwrap();
        assert_eq!(b_custom.alias.as_deref(), Some("Mine"));
        let b = Service::find_template(&conn, "b").unwrap().unwrap();
        assert_eq!(b.alias.as_deref(), Some("Bee2"));
    }

    #[test]
    fn test_uninstall_and_linked_objects() {
        let conn = db::open_in_memory().unwrap();
        let mut h = handler(json!([{"name": "base"}, {"name": "cpu", "parent_template": "base"}]));
        h.launch_install(&conn).unwrap();

        let custom_id = Service::find_template_id(&conn, "cpu-custom").unwrap();
        Service::new_service("cpu".into(), custom_id).insert(&conn).unwrap();

        let mut linked = LinkedObjects::new();
        h.check_linked_objects(&conn, &mut linked).unwrap();
        assert_eq!(linked.get("services", "cpu-custom").unwrap(), ["cpu"]);
        // Inheritance inside the pack is not a blocking reference
        assert!(linked.get("service_templates", "base-custom").is_none());

        h.launch_uninstall(&conn).unwrap();
        for name in ["base", "base-custom", "cpu", "cpu-custom"] {
            assert!(Service::find_template_id(&conn, name).unwrap().is_none());
        }
    }
}
