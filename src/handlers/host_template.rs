// src/handlers/host_template.rs

//! Host templates (`host_templates` section)
//!
//! Same locked/`-custom` pairing as service templates, with ordered
//! multi-parent inheritance. On first install the companion is also linked
//! to the companions of the service templates listed in `services`; those
//! links are recorded against the pack and never recreated by an update, so
//! links the user removed stay removed.

use super::template::{self, custom_name};
use super::{HandlerContext, HandlerKind, LinkedObjects, ObjectHandler};
use crate::config::SorterConfig;
use crate::db::models::{Host, MacroEntry, MacroOwner, PluginPack, Service};
use crate::error::{Error, Result};
use crate::manifest::TemplateRecord;
use regex::Regex;
use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct HostTemplateHandler {
    sorter: SorterConfig,
    templates: Vec<TemplateRecord>,
    context: HandlerContext,
}

impl HostTemplateHandler {
    pub fn new(sorter: SorterConfig) -> Self {
        Self {
            sorter,
            templates: Vec::new(),
            context: HandlerContext::default(),
        }
    }

    /// Ids of the `-custom` companions of every parent, in declaration order
    fn parent_ids(conn: &Connection, record: &TemplateRecord) -> Result<Vec<i64>> {
        record
            .parents
            .iter()
            .map(|parent| {
                let parent = custom_name(parent);
                Host::find_id_by_name(conn, &parent)?.ok_or_else(|| Error::MissingParentTemplate {
                    kind: "Host",
                    parent,
                    template: record.name.clone(),
                })
            })
            .collect()
    }

    fn services(record: &TemplateRecord) -> Vec<&str> {
        match record.fields.get("services") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(single)) if !single.is_empty() => vec![single.as_str()],
            _ => Vec::new(),
        }
    }

    fn row(&self, conn: &Connection, record: &TemplateRecord) -> Result<Host> {
        let mut host = Host::new_template(record.name.clone());
        host.alias = Some(template::alias(record));
        host.comment = template::comment(record);
        host.locked = true;
        host.command_id = template::command_id(conn, record)?;
        host.icon_id = self
            .context
            .icons
            .resolve(&self.context.pack_slug, record.str_field("icon"));
        host.max_check_attempts = template::int_field(record, "max_check_attempts");
        host.check_interval = template::int_field(record, "normal_check_interval");
        host.retry_interval = template::int_field(record, "retry_check_interval");
        host.active_checks = template::flag_field(record, "active_checks_enabled");
        host.passive_checks = template::flag_field(record, "passive_checks_enabled");
        Ok(host)
    }

    fn propagate_alias(conn: &Connection, existing: &Host, alias: &str) -> Result<()> {
        if existing.alias.as_deref() == Some(alias) {
            return Ok(());
        }
        if let Some(custom) = Host::find_by_name(conn, &custom_name(&existing.name))?
            && custom.alias == existing.alias
            && let Some(custom_id) = custom.id
        {
            Host::set_alias(conn, custom_id, alias)?;
        }
        Ok(())
    }

    /// Link the companion host template to the service template companions
    fn link_services(&self, conn: &Connection, host_id: i64, record: &TemplateRecord) -> Result<()> {
        let Some(pack_id) = PluginPack::find_id_by_slug(conn, &self.context.pack_slug)? else {
            warn!(
                "Plugin pack '{}' has no record, service links of '{}' are not tracked",
                self.context.pack_slug, record.name
            );
            return Ok(());
        };

        for service in Self::services(record) {
            let Some(service_id) = Service::find_template_id(conn, &custom_name(service))? else {
                debug!("Service template '{}' not found, not linking it to '{}'", service, record.name);
                continue;
            };
            if PluginPack::record_host_service(conn, pack_id, host_id, service_id)? {
                Host::link_service(conn, host_id, service_id)?;
            }
        }
        Ok(())
    }

    fn write(&self, conn: &Connection, record: &TemplateRecord, pattern: &Regex, first_install: bool) -> Result<()> {
        let mut host = self.row(conn, record)?;
        let alias = host.alias.clone().unwrap_or_default();

        let id = match Host::find_by_name(conn, &record.name)? {
            Some(existing @ Host { id: Some(id), .. }) => {
                Self::propagate_alias(conn, &existing, &alias)?;
                host.update(conn, id)?;
                id
            }
            _ => host.insert(conn)?,
        };

        Host::set_parents(conn, id, &Self::parent_ids(conn, record)?)?;
        MacroEntry::replace_all(conn, MacroOwner::Host, id, &template::macros(record, pattern)?)?;

        let custom = custom_name(&record.name);
        if Host::find_id_by_name(conn, &custom)?.is_none() {
            let mut companion = Host::new_template(custom);
            companion.alias = Some(alias);
            let custom_id = companion.insert(conn)?;
            Host::set_parents(conn, custom_id, &[id])?;

            if first_install {
                self.link_services(conn, custom_id, record)?;
            }
        }
        Ok(())
    }

    fn write_all(&self, conn: &Connection, first_install: bool) -> Result<()> {
        let pattern = template::macro_pattern("HOST")?;
        for record in template::sort_templates(&self.sorter, &self.templates, false)? {
            self.write(conn, &record, &pattern, first_install)?;
        }
        debug!("Wrote {} host templates for {}", self.templates.len(), self.context.pack_slug);
        Ok(())
    }
}

impl ObjectHandler for HostTemplateHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::HostTemplate
    }

    fn set_object_params(&mut self, params: Option<&Value>) -> Result<()> {
        self.templates = TemplateRecord::list_from_value(params)?;
        Ok(())
    }

    fn set_context(&mut self, context: &HandlerContext) {
        self.context = context.clone();
    }

    fn launch_install(&mut self, conn: &Connection) -> Result<()> {
        self.write_all(conn, true)
    }

    fn launch_update(&mut self, conn: &Connection) -> Result<()> {
        self.write_all(conn, false)
    }

    fn launch_uninstall(&mut self, conn: &Connection) -> Result<()> {
        for record in template::sort_templates(&self.sorter, &self.templates, true)? {
            Host::delete_by_name(conn, &custom_name(&record.name))?;
            Host::delete_by_name(conn, &record.name)?;
        }
        Ok(())
    }

    fn check_linked_objects(&self, conn: &Connection, linked: &mut LinkedObjects) -> Result<()> {
        let owned = template::owned_names(&self.templates);
        for name in &owned {
            let children: Vec<String> = Host::children_of(conn, name, true)?
                .into_iter()
                .filter(|child| !owned.contains(child))
                .collect();
            linked.add("host_templates", name, children);
            linked.add("hosts", name, Host::children_of(conn, name, false)?);
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

    fn handler(section: Value) -> HostTemplateHandler {
        let mut handler = HostTemplateHandler::new(SorterConfig::default());
        handler.set_object_params(Some(&section)).unwrap();
        handler.set_context(&HandlerContext::new("linux", Default::default()));
        handler
    }

    #[test]
    fn test_multi_parent_inheritance() {
        let conn = db::open_in_memory().unwrap();
        let mut h = handler(json!([
            {"name": "OS-Linux-SNMP", "parent_template": ["generic", "snmp"]},
            {"name": "generic", "macros": [{"key": "$_HOSTSNMPCOMMUNITY$", "value": "public"}]},
            {"name": "snmp", "parent_template": "generic"}
        ]));
        h.launch_install(&conn).unwrap();

        let id = Host::find_id_by_name(&conn, "OS-Linux-SNMP").unwrap().unwrap();
        assert_eq!(
            Host::parent_names(&conn, id).unwrap(),
            vec!["generic-custom", "snmp-custom"]
        );
        let custom = Host::find_by_name(&conn, "OS-Linux-SNMP-custom").unwrap().unwrap();
        assert!(!custom.locked);
        assert_eq!(
            Host::parent_names(&conn, custom.id.unwrap()).unwrap(),
            vec!["OS-Linux-SNMP"]
        );

        let generic = Host::find_id_by_name(&conn, "generic").unwrap().unwrap();
        let macros = MacroEntry::list(&conn, MacroOwner::Host, generic).unwrap();
        assert_eq!(macros[0].name, "SNMPCOMMUNITY");
    }

    #[test]
    fn test_missing_parent() {
        let conn = db::open_in_memory().unwrap();
        let mut h = handler(json!([{"name": "child", "parent_template": ["absent"]}]));
        assert!(matches!(
            h.launch_install(&conn),
            Err(Error::MissingParentTemplate { kind: "Host", .. })
        ));
    }

    #[test]
    fn test_service_links_on_install_only() {
        let conn = db::open_in_memory().unwrap();
        PluginPack::new("linux".into(), "linux".into(), "1.0.0".into())
            .insert(&conn)
            .unwrap();
        let mut cpu = Service::new_template("cpu-custom".into());
        let cpu_id = cpu.insert(&conn).unwrap();

        let section = json!([{"name": "os", "services": ["cpu", "absent"]}]);
        handler(section.clone()).launch_install(&conn).unwrap();

        let custom_id = Host::find_id_by_name(&conn, "os-custom").unwrap().unwrap();
        assert_eq!(Host::service_ids(&conn, custom_id).unwrap(), vec![cpu_id]);
        let pack_id = PluginPack::find_id_by_slug(&conn, "linux").unwrap().unwrap();
        assert_eq!(
            PluginPack::host_services(&conn, pack_id).unwrap(),
            vec![(custom_id, cpu_id)]
        );

        // The user drops the link; an update must not bring it back
        Host::unlink_service(&conn, custom_id, cpu_id).unwrap();
        handler(section).launch_update(&conn).unwrap();
        assert!(Host::service_ids(&conn, custom_id).unwrap().is_empty());
    }

    #[test]
    fn test_linked_objects_and_uninstall() {
        let conn = db::open_in_memory().unwrap();
        let mut h = handler(json!([{"name": "base"}, {"name": "os", "parent_template": "base"}]));
        h.launch_install(&conn).unwrap();

        let custom = Host::find_id_by_name(&conn, "os-custom").unwrap().unwrap();
        let srv = Host::new_host("srv01".into()).insert(&conn).unwrap();
        Host::set_parents(&conn, srv, &[custom]).unwrap();
        let user_tpl = Host::new_template("mine".into()).insert(&conn).unwrap();
        Host::set_parents(&conn, user_tpl, &[custom]).unwrap();

        let mut linked = LinkedObjects::new();
        h.check_linked_objects(&conn, &mut linked).unwrap();
        assert_eq!(linked.get("hosts", "os-custom").unwrap(), ["srv01"]);
        assert_eq!(linked.get("host_templates", "os-custom").unwrap(), ["mine"]);
        assert!(linked.get("host_templates", "base-custom").is_none());

        h.launch_uninstall(&conn).unwrap();
        for name in ["base", "base-custom", "os", "os-custom"] {
            assert!(Host::find_id_by_name(&conn, name).unwrap().is_none());
        }
        assert!(Host::parent_names(&conn, srv).unwrap().is_empty());
    }
}
