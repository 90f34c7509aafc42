// tests/common/mod.rs

//! Shared catalog and database helpers for integration tests.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ppm::db;
use ppm::{MemoryProvider, PackageDescriptor};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a migrated database in a temp dir.
///
/// Returns (TempDir, db_path) - keep the TempDir alive to prevent cleanup.
pub fn setup_test_db() -> (TempDir, String) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("ppm.db")
        .to_str()
        .unwrap()
        .to_string();

    db::init(&db_path).unwrap();

    (temp_dir, db_path)
}

pub fn base_generic() -> Value {
    json!({
        "information": {
            "slug": "base-generic",
            "name": "Base Generic",
            "version": "1.0.0",
            "status": "stable"
        },
        "commands": [
            {"command_name": "base_host_alive", "command_line": "$USER1$/check_icmp -H $HOSTADDRESS$"}
        ],
        "service_templates": [
            {"name": "base-service", "alias": "Base", "max_check_attempts": 3}
        ],
        "host_templates": [
            {
                "name": "generic-host",
                "command_name": "base_host_alive",
                "macros": [{"key": "$_HOSTSNMPCOMMUNITY$", "value": "public"}]
            }
        ]
    })
}

pub fn os_linux(version: &str) -> Value {
    let mut service_templates = vec![json!({
        "name": "OS-Linux-Cpu",
        "alias": if version == "1.0.0" { "Cpu" } else { "Processor" },
        "parent_template": "base-service",
        "command_name": "os_linux_snmp_cpu",
        "macros": [{"key": "$_SERVICEWARNING$", "value": "80"}]
    })];
    if version != "1.0.0" {
        service_templates.push(json!({"name": "OS-Linux-Load", "parent_template": "base-service"}));
    }

    json!({
        "information": {
            "slug": "os-linux",
            "name": "Linux SNMP",
            "version": version,
            "icon": "tux",
            "dependencies": [{"slug": "base-generic", "version": "1.0.0"}]
        },
        "commands": [
            {"command_name": "os_linux_snmp_cpu", "command_line": "centreon_plugins --mode=cpu"}
        ],
        "service_templates": service_templates,
        "host_templates": [
            {"name": "OS-Linux", "parent_template": ["generic-host"], "icon": "tux", "services": ["OS-Linux-Cpu"]}
        ],
        "icons": {"tux": STANDARD.encode(b"\x89PNG tux")}
    })
}

/// A pack whose service template inherits from a template nobody ships
pub fn broken() -> Value {
    json!({
        "information": {"slug": "broken", "version": "1.0.0"},
        "commands": [{"command_name": "broken_cmd", "command_line": "false"}],
        "service_templates": [{"name": "Broken-Svc", "parent_template": "does-not-exist"}]
    })
}

/// A pack carrying a section no handler understands
pub fn extra() -> Value {
    json!({
        "information": {"slug": "extra", "version": "1.0.0"},
        "discovery_rules": [{"name": "snmp-disco"}]
    })
}

pub fn catalog() -> MemoryProvider {
    [base_generic(), os_linux("1.0.0"), os_linux("1.1.0"), broken(), extra()]
        .into_iter()
        .fold(MemoryProvider::new(), |provider, manifest| provider.with_json(manifest).unwrap())
}

/// Write manifests as `<root>/<slug>/<version>.json`
pub fn write_catalog(root: &Path, manifests: &[Value]) {
    for manifest in manifests {
        let info = &manifest["information"];
        let dir = root.join(info["slug"].as_str().unwrap());
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join(format!("{}.json", info["version"].as_str().unwrap()));
        fs::write(file, serde_json::to_string_pretty(manifest).unwrap()).unwrap();
    }
}

pub fn pack(slug: &str, version: &str) -> PackageDescriptor {
    PackageDescriptor::new(slug, version)
}
