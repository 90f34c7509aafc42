// src/error.rs

//! Error types for the plugin pack manager

use thiserror::Error;

/// Errors raised by resolution, ordering and the install/update/uninstall engine
#[derive(Error, Debug)]
pub enum Error {
    /// A pack transitively depends on itself
    #[error("Circular dependency detected on plugin pack '{slug}' ({})", path.join(" -> "))]
    CircularDependency { slug: String, path: Vec<String> },

    /// A declared minimum version is newer than anything the catalog offers
    #[error(
        "Plugin pack '{package}' requires '{dependency}' >= {required}, but only {available} is available"
    )]
    DependencyNotSatisfiable {
        package: String,
        dependency: String,
        required: String,
        available: String,
    },

    /// Manifest format is newer than this engine understands
    #[error(
        "Plugin pack '{slug}' uses manifest schema version {found} (supported up to {supported}); upgrade ppm to handle it"
    )]
    UnsupportedSchema {
        slug: String,
        found: u64,
        supported: u64,
    },

    /// Template parent graph could not be linearized
    #[error("Cannot order templates after {iterations} passes; unresolved: {}", unresolved.join(", "))]
    UnresolvableTemplateOrder {
        iterations: usize,
        unresolved: Vec<String>,
    },

    /// Package or version absent from the manifest provider
    #[error("Manifest not found for plugin pack '{slug}'{}", version.as_ref().map(|v| format!(" version {v}")).unwrap_or_default())]
    ManifestNotFound {
        slug: String,
        version: Option<String>,
    },

    /// Manifest content is structurally invalid
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Slug cannot name a catalog entry
    #[error("Invalid plugin pack slug '{0}'")]
    InvalidSlug(String),

    /// Version string could not be parsed as a dotted tuple
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    /// Parent template required by a manifest template does not exist
    #[error("{kind} template '{parent}' required by '{template}' cannot be retrieved")]
    MissingParentTemplate {
        kind: &'static str,
        parent: String,
        template: String,
    },

    /// A declared dependency is not installed yet
    #[error("Plugin pack '{package}' depends on '{dependency}', which is not installed")]
    DependencyNotInstalled { package: String, dependency: String },

    /// Other installed packs still depend on this one
    #[error("Plugin pack '{slug}' can't be removed: required by {}", dependents.join(", "))]
    PackInUse { slug: String, dependents: Vec<String> },

    /// Operation targets a pack that has no installed record
    #[error("Plugin pack '{0}' is not installed")]
    NotInstalled(String),

    /// Install targets a pack that already has an installed record
    #[error("Plugin pack '{0}' is already installed")]
    AlreadyInstalled(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_message() {
        let err = Error::CircularDependency {
            slug: "a".to_string(),
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected on plugin pack 'a' (a -> b -> a)"
        );
    }

    #[test]
    fn test_manifest_not_found_message() {
        let err = Error::ManifestNotFound {
            slug: "linux".to_string(),
            version: Some("1.0.0".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Manifest not found for plugin pack 'linux' version 1.0.0"
        );

        let err = Error::ManifestNotFound {
            slug: "linux".to_string(),
            version: None,
        };
        assert_eq!(err.to_string(), "Manifest not found for plugin pack 'linux'");
    }
}
