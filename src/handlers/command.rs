// src/handlers/command.rs

//! Check commands (`commands` section)

use super::{HandlerContext, HandlerKind, LinkedObjects, ObjectHandler};
use crate::db::models::{CHECK_COMMAND_TYPE, Command};
use crate::error::{Error, Result};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// One entry of the `commands` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandRecord {
    pub command_name: String,
    #[serde(default)]
    pub command_line: String,
    #[serde(default)]
    pub command_type: Option<i64>,
}

impl CommandRecord {
    fn row(&self) -> Command {
        let mut command = Command::new(self.command_name.clone(), self.command_line.clone());
        command.command_type = self.command_type.unwrap_or(CHECK_COMMAND_TYPE);
        command
    }
}

#[derive(Debug, Default)]
pub struct CommandHandler {
    commands: Vec<CommandRecord>,
    context: HandlerContext,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectHandler for CommandHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Command
    }

    fn set_object_params(&mut self, params: Option<&Value>) -> Result<()> {
        self.commands = match params {
            None | Some(Value::Null) => Vec::new(),
            Some(value @ Value::Array(_)) => Vec::<CommandRecord>::deserialize(value)
                .map_err(|e| Error::InvalidManifest(format!("commands: {e}")))?,
            Some(other) => {
                return Err(Error::InvalidManifest(format!(
                    "commands must be a list, got {other}"
                )));
            }
        };
        Ok(())
    }

    fn set_context(&mut self, context: &HandlerContext) {
        self.context = context.clone();
    }

    fn launch_install(&mut self, conn: &Connection) -> Result<()> {
        for record in &self.commands {
            record.row().upsert(conn)?;
        }
        debug!("Wrote {} commands for {}", self.commands.len(), self.context.pack_slug);
        Ok(())
    }

    fn launch_uninstall(&mut self, conn: &Connection) -> Result<()> {
        for record in &self.commands {
            let Some(id) = Command::find_id_by_name(conn, &record.command_name)? else {
                continue;
            };
            if Command::usage_count(conn, id)? > 0 {
                info!("Keeping command '{}', still in use", record.command_name);
                continue;
            }
            Command::delete(conn, id)?;
        }
        Ok(())
    }

    fn check_linked_objects(&self, conn: &Connection, linked: &mut LinkedObjects) -> Result<()> {
        for record in &self.commands {
            if let Some(id) = Command::find_id_by_name(conn, &record.command_name)? {
                linked.add("commands", &record.command_name, Command::registered_users(conn, id)?);
            }
        }
        Ok(())
    }

    fn owned_objects(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.command_name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::Host;
    use serde_json::json;

    fn handler(section: Value) -> CommandHandler {
        let mut handler = CommandHandler::new();
        handler.set_object_params(Some(&section)).unwrap();
        handler
    }

    #[test]
    fn test_install_overwrites_line() {
        let conn = db::open_in_memory().unwrap();
        handler(json!([{"command_name": "check_ping", "command_line": "ping -c 1"}]))
            .launch_install(&conn)
            .unwrap();
        handler(json!([{"command_name": "check_ping", "command_line": "ping -c 3", "command_type": 1}]))
            .launch_update(&conn)
            .unwrap();

        let command = Command::find_by_name(&conn, "check_ping").unwrap().unwrap();
        assert_eq!(command.line, "ping -c 3");
        assert_eq!(command.command_type, 1);
    }

    #[test]
    fn test_uninstall_keeps_used_commands() {
        let conn = db::open_in_memory().unwrap();
        let mut h = handler(json!([
            {"command_name": "check_ping", "command_line": "ping"},
            {"command_name": "check_load", "command_line": "load"}
        ]));
        h.launch_install(&conn).unwrap();

        let mut host = Host::new_host("srv01".into());
        host.command_id = Command::find_id_by_name(&conn, "check_ping").unwrap();
        host.insert(&conn).unwrap();

        let mut linked = LinkedObjects::new();
        h.check_linked_objects(&conn, &mut linked).unwrap();
        assert_eq!(linked.get("commands", "check_ping").unwrap(), ["srv01"]);
        assert!(linked.get("commands", "check_load").is_none());

        h.launch_uninstall(&conn).unwrap();
        assert!(Command::find_id_by_name(&conn, "check_ping").unwrap().is_some());
        assert!(Command::find_id_by_name(&conn, "check_load").unwrap().is_none());
    }

    #[test]
    fn test_invalid_section() {
        let mut h = CommandHandler::new();
        assert!(h.set_object_params(Some(&json!({"command_name": "x"}))).is_err());
        assert!(h.set_object_params(Some(&json!([{"command_line": "x"}]))).is_err());
        assert!(h.set_object_params(None).is_ok());
    }
}
