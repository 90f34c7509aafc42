// src/provider/mod.rs

//! Manifest providers
//!
//! The engine never fetches manifests itself. It asks a [`ManifestProvider`]
//! for the manifest matching a descriptor and an action, or for the latest
//! manifest of a slug when resolving dependencies. Whether the catalog lives
//! on disk or behind a remote API is the provider's business.

use crate::error::{Error, Result};
use crate::manifest::{Manifest, PackageDescriptor};
use crate::version::PackVersion;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Lifecycle action a manifest is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Install,
    Update,
    Uninstall,
}

/// Source of plugin pack manifests
pub trait ManifestProvider {
    /// Manifest for `descriptor` as needed by `action`
    ///
    /// An empty descriptor version means "latest".
    fn manifest(&self, descriptor: &PackageDescriptor, action: Action) -> Result<Manifest>;

    /// Manifest of the newest version available for the descriptor's slug
    fn latest_manifest(&self, descriptor: &PackageDescriptor) -> Result<Manifest>;
}

impl<P: ManifestProvider + ?Sized> ManifestProvider for &P {
    fn manifest(&self, descriptor: &PackageDescriptor, action: Action) -> Result<Manifest> {
        (**self).manifest(descriptor, action)
    }

    fn latest_manifest(&self, descriptor: &PackageDescriptor) -> Result<Manifest> {
        (**self).latest_manifest(descriptor)
    }
}

fn not_found(descriptor: &PackageDescriptor, version: Option<&str>) -> Error {
    Error::ManifestNotFound {
        slug: descriptor.slug.clone(),
        version: version.filter(|v| !v.is_empty()).map(str::to_string),
    }
}

/// Every version of one slug, ordered by version
#[derive(Debug, Default, Clone)]
struct VersionShelf {
    versions: BTreeMap<PackVersion, Manifest>,
}

impl VersionShelf {
    fn get(&self, descriptor: &PackageDescriptor) -> Result<&Manifest> {
        match descriptor.pack_version()? {
            Some(version) => self
                .versions
                .get(&version)
                .ok_or_else(|| not_found(descriptor, Some(&descriptor.version))),
            None => self.latest(descriptor),
        }
    }

    fn latest(&self, descriptor: &PackageDescriptor) -> Result<&Manifest> {
        self.versions
            .values()
            .next_back()
            .ok_or_else(|| not_found(descriptor, None))
    }
}

/// In-memory catalog
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    shelves: HashMap<String, VersionShelf>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a manifest version
    pub fn add(&mut self, manifest: Manifest) -> Result<()> {
        let version = PackVersion::parse(manifest.version())?;
        self.shelves
            .entry(manifest.slug().to_string())
            .or_default()
            .versions
            .insert(version, manifest);
        Ok(())
    }

    /// Builder-style [`MemoryProvider::add`] taking raw JSON
    pub fn with_json(mut self, value: serde_json::Value) -> Result<Self> {
        self.add(Manifest::from_value(value)?)?;
        Ok(self)
    }

    fn shelf(&self, descriptor: &PackageDescriptor) -> Result<&VersionShelf> {
        self.shelves
            .get(&descriptor.slug)
            .ok_or_else(|| not_found(descriptor, Some(&descriptor.version)))
    }
}

impl ManifestProvider for MemoryProvider {
    fn manifest(&self, descriptor: &PackageDescriptor, action: Action) -> Result<Manifest> {
        debug!("Loading manifest {} for {}", descriptor, action);
        self.shelf(descriptor)?.get(descriptor).cloned()
    }

    fn latest_manifest(&self, descriptor: &PackageDescriptor) -> Result<Manifest> {
        self.shelf(descriptor)?.latest(descriptor).cloned()
    }
}

/// Local catalog laid out as `<root>/<slug>/<version>.json`
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Catalog directory of a slug; slugs must stay a single path component
    fn slug_dir(&self, slug: &str) -> Result<PathBuf> {
        if slug.is_empty() || slug == "." || slug.contains("..") || slug.contains(['/', '\\']) {
            return Err(Error::InvalidSlug(slug.to_string()));
        }
        Ok(self.root.join(slug))
    }

    /// Available versions of a slug, unordered
    fn versions(&self, descriptor: &PackageDescriptor) -> Result<Vec<(PackVersion, PathBuf)>> {
        let dir = self.slug_dir(&descriptor.slug)?;
        if !dir.is_dir() {
            return Err(not_found(descriptor, Some(&descriptor.version)));
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match PackVersion::parse(stem) {
                Ok(version) => versions.push((version, path)),
                Err(_) => debug!("Skipping catalog file with non-version name: {}", path.display()),
            }
        }
        Ok(versions)
    }

    fn load(&self, descriptor: &PackageDescriptor, path: &Path) -> Result<Manifest> {
        let content = fs::read_to_string(path)?;
        let manifest = Manifest::from_json_str(&content)?;
        if manifest.slug() != descriptor.slug {
            return Err(Error::InvalidManifest(format!(
                "{} declares slug '{}', expected '{}'",
                path.display(),
                manifest.slug(),
                descriptor.slug
            )));
        }
        Ok(manifest)
    }
}

impl ManifestProvider for DirectoryProvider {
    fn manifest(&self, descriptor: &PackageDescriptor, action: Action) -> Result<Manifest> {
        debug!("Loading manifest {} for {} from {}", descriptor, action, self.root.display());
        let Some(wanted) = descriptor.pack_version()? else {
            return self.latest_manifest(descriptor);
        };
        let path = self
            .versions(descriptor)?
            .into_iter()
            .find(|(version, _)| *version == wanted)
            .map(|(_, path)| path)
            .ok_or_else(|| not_found(descriptor, Some(&descriptor.version)))?;
        self.load(descriptor, &path)
    }

    fn latest_manifest(&self, descriptor: &PackageDescriptor) -> Result<Manifest> {
        let path = self
            .versions(descriptor)?
            .into_iter()
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, path)| path)
            .ok_or_else(|| not_found(descriptor, None))?;
        self.load(descriptor, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(slug: &str, version: &str) -> serde_json::Value {
        json!({"information": {"slug": slug, "version": version}})
    }

    #[test]
    fn test_action_strings() {
        assert_eq!(Action::Install.to_string(), "install");
        assert_eq!("uninstall".parse::<Action>().unwrap(), Action::Uninstall);
    }

    #[test]
    fn test_memory_provider_latest() {
        let provider = MemoryProvider::new()
            .with_json(manifest("y", "1.5.0"))
            .unwrap()
            .with_json(manifest("y", "1.10.0"))
            .unwrap()
            .with_json(manifest("y", "1.2.0"))
            .unwrap();

        let latest = provider
            .latest_manifest(&PackageDescriptor::new("y", "1.2.0"))
            .unwrap();
        assert_eq!(latest.version(), "1.10.0");

        let exact = provider
            .manifest(&PackageDescriptor::new("y", "1.5.0"), Action::Install)
            .unwrap();
        assert_eq!(exact.version(), "1.5.0");
    }

    #[test]
    fn test_memory_provider_not_found() {
        let provider = MemoryProvider::new().with_json(manifest("y", "1.0.0")).unwrap();
        assert!(matches!(
            provider.manifest(&PackageDescriptor::new("nope", "1.0.0"), Action::Install),
            Err(Error::ManifestNotFound { .. })
        ));
        assert!(matches!(
            provider.manifest(&PackageDescriptor::new("y", "9.0.0"), Action::Install),
            Err(Error::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_directory_provider() {
        let dir = tempfile::tempdir().unwrap();
        let pack_dir = dir.path().join("linux");
        fs::create_dir_all(&pack_dir).unwrap();
        fs::write(pack_dir.join("1.0.0.json"), manifest("linux", "1.0.0").to_string()).unwrap();
        fs::write(pack_dir.join("1.9.0.json"), manifest("linux", "1.9.0").to_string()).unwrap();
        fs::write(pack_dir.join("README.md"), "ignored").unwrap();

        let provider = DirectoryProvider::new(dir.path());
        let latest = provider
            .latest_manifest(&PackageDescriptor::new("linux", ""))
            .unwrap();
        assert_eq!(latest.version(), "1.9.0");

        let exact = provider
            .manifest(&PackageDescriptor::new("linux", "1.0.0"), Action::Update)
            .unwrap();
        assert_eq!(exact.version(), "1.0.0");

        assert!(matches!(
            provider.latest_manifest(&PackageDescriptor::new("windows", "")),
            Err(Error::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_directory_provider_rejects_path_slugs() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog");
        fs::create_dir_all(&catalog).unwrap();
        // A manifest sitting next to the catalog must stay unreachable
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("1.0.0.json"), manifest("outside", "1.0.0").to_string()).unwrap();

        let provider = DirectoryProvider::new(&catalog);
        for slug in ["../outside", "..", ".", "a/b", "a\\b"] {
            assert!(
                matches!(
                    provider.latest_manifest(&PackageDescriptor::new(slug, "")),
                    Err(Error::InvalidSlug(_))
                ),
                "{slug}"
            );
        }
        assert!(matches!(
            provider.manifest(&PackageDescriptor::new("../outside", "1.0.0"), Action::Install),
            Err(Error::InvalidSlug(_))
        ));
    }
}
