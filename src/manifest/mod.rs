// src/manifest/mod.rs

//! Plugin pack manifests and package descriptors
//!
//! A manifest is a JSON document keyed by section name (`information`,
//! `commands`, `host_templates`, `service_templates`, `icons`, ...). The
//! engine only interprets the sections it has handlers for; everything else
//! is carried through untouched and reported as unmanaged.
//!
//! Older manifests identify packs by `name` instead of `slug`. That fallback
//! is applied once, when a descriptor or manifest is constructed, so the rest
//! of the crate only ever sees slugs.

use crate::error::{Error, Result};
use crate::version::PackVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Highest manifest schema version this engine can interpret
pub const SUPPORTED_SCHEMA_VERSION: u64 = 1;

/// Well-known manifest section names
pub mod section {
    pub const INFORMATION: &str = "information";
    pub const COMMANDS: &str = "commands";
    pub const HOST_TEMPLATES: &str = "host_templates";
    pub const SERVICE_TEMPLATES: &str = "service_templates";
    pub const ICONS: &str = "icons";
}

/// Accepted values for `information.status`
pub const VALID_STATUSES: &[&str] = &[
    "stable",
    "testing",
    "dev",
    "development",
    "experimental",
    "deprecated",
];

/// Identity of one plugin pack at one version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct PackageDescriptor {
    pub slug: String,
    pub name: String,
    pub version: String,
}

/// Wire shape of a descriptor, before the slug/name fallback is applied
#[derive(Deserialize)]
struct RawDescriptor {
    slug: Option<String>,
    name: Option<String>,
    version: Option<String>,
}

impl TryFrom<RawDescriptor> for PackageDescriptor {
    type Error = Error;

    fn try_from(raw: RawDescriptor) -> Result<Self> {
        PackageDescriptor::from_fields(
            raw.slug.as_deref(),
            raw.name.as_deref(),
            raw.version.as_deref().unwrap_or_default(),
        )
    }
}

impl PackageDescriptor {
    /// Create a descriptor whose display name is its slug
    pub fn new(slug: impl Into<String>, version: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            name: slug.clone(),
            slug,
            version: version.into(),
        }
    }

    /// Build a descriptor from possibly-legacy fields
    ///
    /// `slug` wins when present and non-empty; otherwise `name` is used as
    /// the slug. Fails when neither is usable.
    pub fn from_fields(slug: Option<&str>, name: Option<&str>, version: &str) -> Result<Self> {
        let slug = slug.map(str::trim).filter(|s| !s.is_empty());
        let name = name.map(str::trim).filter(|s| !s.is_empty());

        let resolved_slug = slug
            .or(name)
            .ok_or_else(|| Error::InvalidManifest("plugin pack has neither slug nor name".to_string()))?;

        Ok(Self {
            slug: resolved_slug.to_string(),
            name: name.unwrap_or(resolved_slug).to_string(),
            version: version.trim().to_string(),
        })
    }

    /// Parse a `{slug|name, version}` JSON object
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidManifest(format!("expected an object, got {value}")))?;
        Self::from_fields(
            obj.get("slug").and_then(Value::as_str),
            obj.get("name").and_then(Value::as_str),
            obj.get("version").and_then(Value::as_str).unwrap_or_default(),
        )
    }

    /// Parse a CLI-style `slug` or `slug@version` argument
    pub fn parse_arg(arg: &str) -> Result<Self> {
        match arg.split_once('@') {
            Some((slug, version)) => Self::from_fields(Some(slug), None, version),
            None => Self::from_fields(Some(arg), None, ""),
        }
    }

    /// Parsed version, if one was given
    pub fn pack_version(&self) -> Result<Option<PackVersion>> {
        if self.version.is_empty() {
            return Ok(None);
        }
        PackVersion::parse(&self.version).map(Some)
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.slug)
        } else {
            write!(f, "{}-{}", self.slug, self.version)
        }
    }
}

/// `dependencies` list of an `information` section
pub fn dependencies_of(information: &Value) -> Result<Vec<PackageDescriptor>> {
    match information.get("dependencies") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(PackageDescriptor::from_value).collect(),
        Some(other) => Err(Error::InvalidManifest(format!(
            "dependencies must be a list, got {other}"
        ))),
    }
}

/// Parent reference of a template: absent, a single name, or a list
fn parents_of(value: Option<&Value>) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !matches!(v, Value::String(s) if s.trim().is_empty()))
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    Error::InvalidManifest(format!("parent_template entries must be strings, got {v}"))
                })
            })
            .collect(),
        Some(other) => Err(Error::InvalidManifest(format!(
            "parent_template must be a string or a list, got {other}"
        ))),
    }
}

/// One host or service template definition from a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRecord {
    pub name: String,
    pub parents: Vec<String>,
    /// The full manifest entry, for the handlers that persist it
    pub fields: Map<String, Value>,
}

impl TemplateRecord {
    /// Create a bare record (no extra fields)
    pub fn new(name: impl Into<String>, parents: Vec<String>) -> Self {
        Self {
            name: name.into(),
            parents,
            fields: Map::new(),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value
            .as_object()
            .ok_or_else(|| Error::InvalidManifest(format!("template must be an object, got {value}")))?;
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidManifest("template without a name".to_string()))?;

        Ok(Self {
            name: name.to_string(),
            parents: parents_of(fields.get("parent_template"))?,
            fields: fields.clone(),
        })
    }

    /// String field lookup, treating empty strings as absent
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Parse a manifest section (a list of templates)
    pub fn list_from_value(value: Option<&Value>) -> Result<Vec<Self>> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(Self::from_value).collect(),
            Some(other) => Err(Error::InvalidManifest(format!(
                "template section must be a list, got {other}"
            ))),
        }
    }
}

/// A plugin pack manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    sections: Map<String, Value>,
    descriptor: PackageDescriptor,
}

impl Manifest {
    /// Validate and wrap a manifest document
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(sections) = value else {
            return Err(Error::InvalidManifest("manifest must be a JSON object".to_string()));
        };

        let information = sections
            .get(section::INFORMATION)
            .ok_or_else(|| Error::InvalidManifest("missing 'information' section".to_string()))?;
        let descriptor = PackageDescriptor::from_value(information)?;
        if descriptor.version.is_empty() {
            return Err(Error::InvalidManifest(format!(
                "plugin pack '{}' has no version",
                descriptor.slug
            )));
        }
        PackVersion::parse(&descriptor.version)?;

        if let Some(status) = information.get("status").and_then(Value::as_str)
            && !status.is_empty()
            && !VALID_STATUSES.contains(&status)
        {
            return Err(Error::InvalidManifest(format!(
                "invalid status '{status}' for plugin pack '{}'",
                descriptor.slug
            )));
        }

        Ok(Self {
            sections,
            descriptor,
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(s)?)
    }

    /// Descriptor built from the `information` section
    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    pub fn slug(&self) -> &str {
        &self.descriptor.slug
    }

    pub fn version(&self) -> &str {
        &self.descriptor.version
    }

    /// The `information` section
    pub fn information(&self) -> &Value {
        // Presence is checked in from_value
        &self.sections[section::INFORMATION]
    }

    /// `information.schema_version`, 0 for legacy manifests
    pub fn schema_version(&self) -> u64 {
        self.information()
            .get("schema_version")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(0)
    }

    /// Refuse manifests newer than this engine
    pub fn check_schema(&self) -> Result<()> {
        let found = self.schema_version();
        if found > SUPPORTED_SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                slug: self.slug().to_string(),
                found,
                supported: SUPPORTED_SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    /// Declared dependencies, in manifest order, versions being minimums
    pub fn dependencies(&self) -> Result<Vec<PackageDescriptor>> {
        dependencies_of(self.information())
    }

    /// Raw section lookup
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections.get(key)
    }

    /// Top-level section names, sorted
    pub fn section_keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_prefers_slug() {
        let d = PackageDescriptor::from_fields(Some("linux"), Some("Linux SNMP"), "1.0.0").unwrap();
        assert_eq!(d.slug, "linux");
        assert_eq!(d.name, "Linux SNMP");
    }

    #[test]
    fn test_descriptor_name_fallback() {
        let d: PackageDescriptor =
            serde_json::from_value(json!({"name": "base-generic", "version": "2.0.0"})).unwrap();
        assert_eq!(d.slug, "base-generic");
        assert_eq!(d.version, "2.0.0");

        let d = PackageDescriptor::from_fields(Some(""), Some("legacy"), "1").unwrap();
        assert_eq!(d.slug, "legacy");
    }

    #[test]
    fn test_descriptor_requires_identity() {
        assert!(PackageDescriptor::from_fields(None, None, "1.0.0").is_err());
        assert!(serde_json::from_value::<PackageDescriptor>(json!({"version": "1.0.0"})).is_err());
    }

    #[test]
    fn test_parse_arg() {
        let d = PackageDescriptor::parse_arg("cisco@3.2.1").unwrap();
        assert_eq!(d.slug, "cisco");
        assert_eq!(d.version, "3.2.1");
        assert_eq!(d.to_string(), "cisco-3.2.1");

        let d = PackageDescriptor::parse_arg("cisco").unwrap();
        assert!(d.version.is_empty());
        assert!(d.pack_version().unwrap().is_none());
    }

    #[test]
    fn test_manifest_schema_version_defaults_to_zero() {
        let m = Manifest::from_value(json!({
            "information": {"slug": "a", "version": "1.0.0"}
        }))
        .unwrap();
        assert_eq!(m.schema_version(), 0);
        assert!(m.check_schema().is_ok());
    }

    #[test]
    fn test_manifest_rejects_newer_schema() {
        let m = Manifest::from_value(json!({
            "information": {"slug": "a", "version": "1.0.0", "schema_version": 2}
        }))
        .unwrap();
        assert!(matches!(
            m.check_schema(),
            Err(Error::UnsupportedSchema { found: 2, .. })
        ));
    }

    #[test]
    fn test_manifest_requires_information() {
        assert!(Manifest::from_value(json!({"commands": []})).is_err());
        assert!(Manifest::from_value(json!({"information": {"slug": "a"}})).is_err());
        assert!(Manifest::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_manifest_status_validation() {
        let bad = json!({"information": {"slug": "a", "version": "1.0.0", "status": "shiny"}});
        assert!(matches!(Manifest::from_value(bad), Err(Error::InvalidManifest(_))));

        let ok = json!({"information": {"slug": "a", "version": "1.0.0", "status": "stable"}});
        assert!(Manifest::from_value(ok).is_ok());
    }

    #[test]
    fn test_manifest_dependencies() {
        let m = Manifest::from_value(json!({
            "information": {
                "slug": "x",
                "version": "1.0.0",
                "dependencies": [{"slug": "y", "version": "1.2.0"}, {"name": "z", "version": "0.1.0"}]
            }
        }))
        .unwrap();
        let deps = m.dependencies().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].slug, "y");
        assert_eq!(deps[1].slug, "z");
    }

    #[test]
    fn test_template_parent_forms() {
        let single = TemplateRecord::from_value(&json!({"name": "a", "parent_template": "b"})).unwrap();
        assert_eq!(single.parents, vec!["b".to_string()]);

        let many = TemplateRecord::from_value(&json!({"name": "a", "parent_template": ["b", "c"]})).unwrap();
        assert_eq!(many.parents, vec!["b".to_string(), "c".to_string()]);

        let none = TemplateRecord::from_value(&json!({"name": "a", "parent_template": ""})).unwrap();
        assert!(none.parents.is_empty());

        assert!(TemplateRecord::from_value(&json!({"name": "a", "parent_template": 3})).is_err());
        assert!(TemplateRecord::from_value(&json!({"alias": "no name"})).is_err());
    }
}
