// src/handlers/mod.rs

//! Object handlers
//!
//! Each handler owns one manifest section and knows how to write, rewrite
//! and remove the rows that section describes. The operation manager drives
//! every handler through the same lifecycle:
//!
//! 1. [`ObjectHandler::set_object_params`] with the handler's section
//! 2. [`ObjectHandler::set_context`] with the owning pack and its icons
//! 3. the `prepare_*` hook of the action, for every handler
//! 4. the `launch_*` hook of the action, for every handler
//!
//! Handlers run in [`HandlerKind::ORDER`] on install and update and in the
//! reverse order on uninstall, so commands exist before the templates
//! that reference them and outlive them on removal.

mod command;
mod host_template;
mod icon;
mod pluginpack;
mod service_template;
mod template;

pub use command::CommandHandler;
pub use host_template::HostTemplateHandler;
pub use icon::{IconManager, IconMap};
pub use pluginpack::PluginPackHandler;
pub use service_template::ServiceTemplateHandler;

use crate::config::SorterConfig;
use crate::error::Result;
use crate::manifest::section;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use strum_macros::Display;

/// The entity types the engine manages, in install order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum HandlerKind {
    PluginPack,
    Command,
    ServiceTemplate,
    HostTemplate,
}

impl HandlerKind {
    /// Registration order of the built-in handlers
    pub const ORDER: [HandlerKind; 4] = [
        HandlerKind::PluginPack,
        HandlerKind::Command,
        HandlerKind::ServiceTemplate,
        HandlerKind::HostTemplate,
    ];

    /// Manifest section this kind of handler consumes
    pub fn key_in_json(&self) -> &'static str {
        match self {
            Self::PluginPack => section::INFORMATION,
            Self::Command => section::COMMANDS,
            Self::ServiceTemplate => section::SERVICE_TEMPLATES,
            Self::HostTemplate => section::HOST_TEMPLATES,
        }
    }
}

/// Values shared by every handler while one pack is processed
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    pub pack_slug: String,
    pub icons: IconMap,
}

impl HandlerContext {
    pub fn new(pack_slug: impl Into<String>, icons: IconMap) -> Self {
        Self {
            pack_slug: pack_slug.into(),
            icons,
        }
    }
}

/// One blocking reference reported before an uninstall
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedObjectReference {
    /// Kind of the referencing objects (`hosts`, `service_templates`, ...)
    pub category: String,
    /// Object of the pack being referenced
    pub object: String,
    pub used_by: Vec<String>,
}

/// Accumulator for [`ObjectHandler::check_linked_objects`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedObjects {
    entries: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl LinkedObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `used_by` as users of `object`; empty lists are ignored
    pub fn add(&mut self, category: &str, object: &str, used_by: Vec<String>) {
        if used_by.is_empty() {
            return;
        }
        let users = self
            .entries
            .entry(category.to_string())
            .or_default()
            .entry(object.to_string())
            .or_default();
        for user in used_by {
            if !users.contains(&user) {
                users.push(user);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, category: &str, object: &str) -> Option<&[String]> {
        self.entries
            .get(category)
            .and_then(|objects| objects.get(object))
            .map(Vec::as_slice)
    }

    pub fn into_references(self) -> Vec<LinkedObjectReference> {
        self.entries
            .into_iter()
            .flat_map(|(category, objects)| {
                objects.into_iter().map(move |(object, used_by)| LinkedObjectReference {
                    category: category.clone(),
                    object,
                    used_by,
                })
            })
            .collect()
    }
}

/// Capability contract every object handler satisfies
pub trait ObjectHandler {
    fn kind(&self) -> HandlerKind;

    /// Manifest section handed to [`ObjectHandler::set_object_params`]
    fn key_in_json(&self) -> &'static str {
        self.kind().key_in_json()
    }

    /// Receive the handler's manifest section (absent sections give `None`)
    fn set_object_params(&mut self, params: Option<&Value>) -> Result<()>;

    fn set_context(&mut self, context: &HandlerContext);

    fn prepare_install(&mut self, _conn: &Connection) -> Result<()> {
        Ok(())
    }

    fn prepare_update(&mut self, _conn: &Connection) -> Result<()> {
        Ok(())
    }

    fn prepare_uninstall(&mut self, _conn: &Connection) -> Result<()> {
        Ok(())
    }

    fn launch_install(&mut self, conn: &Connection) -> Result<()>;

    fn launch_update(&mut self, conn: &Connection) -> Result<()> {
        self.launch_install(conn)
    }

    fn launch_uninstall(&mut self, conn: &Connection) -> Result<()>;

    /// Report objects outside the pack that still use the pack's objects
    fn check_linked_objects(&self, _conn: &Connection, _linked: &mut LinkedObjects) -> Result<()> {
        Ok(())
    }

    /// Names of the objects this handler writes for the current section
    fn owned_objects(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Build the handler for one kind
pub fn handler_for(kind: HandlerKind, sorter: SorterConfig) -> Box<dyn ObjectHandler> {
    match kind {
        HandlerKind::PluginPack => Box::new(PluginPackHandler::new()),
        HandlerKind::Command => Box::new(CommandHandler::new()),
        HandlerKind::ServiceTemplate => Box::new(ServiceTemplateHandler::new(sorter)),
        HandlerKind::HostTemplate => Box::new(HostTemplateHandler::new(sorter)),
    }
}

/// The built-in handlers in registration order
pub fn default_handlers(sorter: SorterConfig) -> Vec<Box<dyn ObjectHandler>> {
    HandlerKind::ORDER
        .iter()
        .map(|kind| handler_for(*kind, sorter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let handlers = default_handlers(SorterConfig::default());
        let keys: Vec<_> = handlers.iter().map(|h| h.key_in_json()).collect();
        assert_eq!(
            keys,
            vec!["information", "commands", "service_templates", "host_templates"]
        );
        assert_eq!(HandlerKind::ServiceTemplate.to_string(), "service_template");
    }

    #[test]
    fn test_linked_objects_accumulate() {
        let mut linked = LinkedObjects::new();
        linked.add("hosts", "os-linux", vec!["srv1".into()]);
        linked.add("hosts", "os-linux", vec!["srv1".into(), "srv2".into()]);
        linked.add("hosts", "unused", Vec::new());
        linked.add("commands", "check_ping", vec!["srv3".into()]);

        assert_eq!(linked.get("hosts", "os-linux").unwrap(), ["srv1", "srv2"]);
        assert!(linked.get("hosts", "unused").is_none());

        let refs = linked.into_references();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].category, "commands");
        assert_eq!(refs[1].used_by, vec!["srv1", "srv2"]);
    }
}
