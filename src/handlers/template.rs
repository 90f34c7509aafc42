// src/handlers/template.rs

//! Field mapping shared by the host and service template handlers

use crate::config::SorterConfig;
use crate::db::models::{Command, INHERIT, MacroEntry};
use crate::error::{Error, Result};
use crate::manifest::TemplateRecord;
use regex::Regex;
use rusqlite::Connection;
use serde_json::Value;
use tracing::warn;

/// Suffix of the editable companion of a locked template
pub const CUSTOM_SUFFIX: &str = "-custom";

pub fn custom_name(name: &str) -> String {
    format!("{name}{CUSTOM_SUFFIX}")
}

/// Order templates with a fresh sorter; `reverse` puts children first
pub fn sort_templates(
    sorter: &SorterConfig,
    templates: &[TemplateRecord],
    reverse: bool,
) -> Result<Vec<TemplateRecord>> {
    let mut sorter = sorter.build_sorter();
    sorter.set_input(templates.to_vec());
    sorter.perform_sort(reverse)?;
    Ok(sorter.into_data())
}

/// Integer field, accepting numbers and numeric strings
pub fn int_field(record: &TemplateRecord, key: &str) -> Option<i64> {
    match record.fields.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Tri-state check flag (0, 1, or 2 for "inherit")
pub fn flag_field(record: &TemplateRecord, key: &str) -> i64 {
    int_field(record, key)
        .filter(|v| (0..=2).contains(v))
        .unwrap_or(INHERIT)
}

/// Id of the command named by `command_name`, if any
pub fn command_id(conn: &Connection, record: &TemplateRecord) -> Result<Option<i64>> {
    let Some(name) = record.str_field("command_name") else {
        return Ok(None);
    };
    let id = Command::find_id_by_name(conn, name)?;
    if id.is_none() {
        warn!("Command '{}' used by template '{}' does not exist", name, record.name);
    }
    Ok(id)
}

/// Alias of a template, defaulting to its name
pub fn alias(record: &TemplateRecord) -> String {
    record.str_field("alias").unwrap_or(&record.name).to_string()
}

pub fn comment(record: &TemplateRecord) -> Option<String> {
    record.str_field("_comment").map(str::to_string)
}

/// Pattern extracting the bare name of a `$_<prefix>NAME$` or `$NAME$` macro key
pub fn macro_pattern(prefix: &str) -> Result<Regex> {
    Regex::new(&format!(r"^\$(?:_{prefix})?(.+)\$$"))
        .map_err(|e| Error::InvalidManifest(format!("macro pattern: {e}")))
}

/// Macros of a template; keys not matching `pattern` are skipped
pub fn macros(record: &TemplateRecord, pattern: &Regex) -> Result<Vec<MacroEntry>> {
    let items = match record.fields.get("macros") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::InvalidManifest(format!(
                "macros of '{}' must be a list, got {other}",
                record.name
            )));
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let key = item.get("key").and_then(Value::as_str).unwrap_or_default();
        let Some(name) = pattern.captures(key).and_then(|c| c.get(1)) else {
            warn!("Skipping macro '{}' of template '{}'", key, record.name);
            continue;
        };
        entries.push(MacroEntry {
            name: name.as_str().to_string(),
            value: scalar_string(item.get("value")),
            is_password: item.get("password").is_some_and(truthy),
            description: scalar_string(item.get("description")),
        });
    }
    Ok(entries)
}

fn scalar_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|v| v != 0),
        Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    }
}

/// Names of a template and its companion, for every template of a manifest
pub fn owned_names(templates: &[TemplateRecord]) -> Vec<String> {
    templates
        .iter()
        .flat_map(|t| [t.name.clone(), custom_name(&t.name)])
        .collect()
}
