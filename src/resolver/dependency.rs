// src/resolver/dependency.rs

//! Dependency ordering across plugin packs
//!
//! Depth-first topological sort over the dependencies declared in manifests.
//! Every node is visited with its latest available manifest. A node found
//! again while still on the current path is a cycle; a node already finished
//! is skipped, so shared dependencies are only walked once. Minimum-version
//! checks happen during the same walk, before anything is written.

use crate::error::{Error, Result};
use crate::manifest::PackageDescriptor;
use crate::provider::ManifestProvider;
use crate::version::PackVersion;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Per-slug bookkeeping for one resolution session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCheckState {
    /// On the current DFS path
    pub temporary: bool,
    /// Fully processed
    pub marked: bool,
    pub version: String,
}

impl Default for DependencyCheckState {
    fn default() -> Self {
        Self {
            temporary: false,
            marked: false,
            version: "0.0.0".to_string(),
        }
    }
}

/// One entry of the install order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackage {
    pub slug: String,
    /// Version of the manifest the resolver processed
    pub version: String,
}

/// Builds an install order where dependencies precede their dependents
///
/// State is owned by the sorter value: calls on the same sorter share
/// memoization and accumulate into one plan, separate sorters never
/// interact.
pub struct DependencySorter<'p, P: ManifestProvider + ?Sized> {
    provider: &'p P,
    states: HashMap<String, DependencyCheckState>,
    sorted: Vec<ResolvedPackage>,
    path: Vec<String>,
}

impl<'p, P: ManifestProvider + ?Sized> DependencySorter<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self {
            provider,
            states: HashMap::new(),
            sorted: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Resolve `package` and its dependencies, appending to the shared plan
    ///
    /// Returns the whole accumulated plan. After an error the session state
    /// is inconsistent; call [`DependencySorter::reset`] before reusing it.
    pub fn get_sorted_dependencies(&mut self, package: &PackageDescriptor) -> Result<&[ResolvedPackage]> {
        self.visit(package)?;
        Ok(&self.sorted)
    }

    /// Accumulated plan so far
    pub fn sorted_dependencies(&self) -> &[ResolvedPackage] {
        &self.sorted
    }

    pub fn into_sorted(self) -> Vec<ResolvedPackage> {
        self.sorted
    }

    pub fn state(&self, slug: &str) -> Option<&DependencyCheckState> {
        self.states.get(slug)
    }

    /// Forget all memoized state and the accumulated plan
    pub fn reset(&mut self) {
        self.states.clear();
        self.sorted.clear();
        self.path.clear();
    }

    fn visit(&mut self, package: &PackageDescriptor) -> Result<()> {
        let slug = package.slug.clone();
        let state = self.states.entry(slug.clone()).or_default();

        if state.temporary {
            let mut cycle = self.path.clone();
            cycle.push(slug.clone());
            return Err(Error::CircularDependency { slug, path: cycle });
        }
        if state.marked {
            return Ok(());
        }
        state.temporary = true;
        self.path.push(slug.clone());

        let manifest = self.provider.latest_manifest(package)?;
        manifest.check_schema()?;
        debug!("Resolving dependencies of {}-{}", slug, manifest.version());

        for dependency in manifest.dependencies()? {
            self.visit(&dependency)?;

            let available = self.provider.latest_manifest(&dependency)?;
            let available_version = PackVersion::parse(available.version())?;
            if let Some(required) = dependency.pack_version()?
                && !available_version.satisfies_minimum(&required)
            {
                return Err(Error::DependencyNotSatisfiable {
                    package: slug,
                    dependency: dependency.slug,
                    required: required.to_string(),
                    available: available_version.to_string(),
                });
            }
        }

        self.path.pop();
        let state = self.states.entry(slug.clone()).or_default();
        state.temporary = false;
        state.marked = true;
        state.version = manifest.version().to_string();

        self.sorted.push(ResolvedPackage {
            slug,
            version: manifest.version().to_string(),
        });
        Ok(())
    }
}
