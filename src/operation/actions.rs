// src/operation/actions.rs

//! The three batch operations and reinstall

use super::{Operation, OperationManager, OperationResult};
use crate::config::SorterConfig;
use crate::error::Result;
use crate::handlers::LinkedObjectReference;
use crate::manifest::PackageDescriptor;
use crate::provider::{Action, ManifestProvider};
use rusqlite::Connection;
use tracing::info;

macro_rules! operation {
    ($(#[$doc:meta])* $name:ident, $action:expr) => {
        $(#[$doc])*
        pub struct $name<'a, P: ManifestProvider + ?Sized> {
            manager: OperationManager<'a, P>,
        }

        impl<'a, P: ManifestProvider + ?Sized> $name<'a, P> {
            pub fn new(conn: &'a mut Connection, provider: &'a P, sorter: SorterConfig) -> Self {
                Self::with_manager(OperationManager::new(conn, provider, sorter))
            }

            /// Wrap a manager with custom handlers registered
            pub fn with_manager(manager: OperationManager<'a, P>) -> Self {
                Self { manager }
            }

            pub fn manager(&self) -> &OperationManager<'a, P> {
                &self.manager
            }

            pub fn manager_mut(&mut self) -> &mut OperationManager<'a, P> {
                &mut self.manager
            }
        }

        impl<P: ManifestProvider + ?Sized> Operation for $name<'_, P> {
            fn launch_operation(&mut self, packages: &[PackageDescriptor]) -> OperationResult {
                self.manager.launch(packages, $action)
            }
        }
    };
}

operation!(
    /// Install packs that have no installed record yet
    Install,
    Action::Install
);

operation!(
    /// Rewrite installed packs from a newer (or the same) manifest
    Update,
    Action::Update
);

operation!(
    /// Remove installed packs, using the manifest of the installed version
    Uninstall,
    Action::Uninstall
);

impl<P: ManifestProvider + ?Sized> Uninstall<'_, P> {
    /// Objects outside the pack still using its objects
    pub fn check_used(&mut self, descriptor: &PackageDescriptor) -> Result<Vec<LinkedObjectReference>> {
        self.manager.check_used(descriptor)
    }

    /// Blocking references of every pack, ignoring users removed in the same batch
    pub fn check_used_batch(
        &mut self,
        packages: &[PackageDescriptor],
    ) -> Result<Vec<(PackageDescriptor, Vec<LinkedObjectReference>)>> {
        self.manager.check_used_batch(packages)
    }
}

/// Update every pack on its own, carrying on after failures
pub fn reinstall<P: ManifestProvider + ?Sized>(
    conn: &mut Connection,
    provider: &P,
    sorter: SorterConfig,
    packages: &[PackageDescriptor],
) -> Vec<OperationResult> {
    let mut update = Update::new(conn, provider, sorter);
    let results: Vec<OperationResult> = packages
        .iter()
        .map(|package| update.launch_operation(std::slice::from_ref(package)))
        .collect();

    let failures = results.iter().filter(|r| !r.is_success()).count();
    info!("Reinstalled {} plugin pack(s), {} failed", packages.len() - failures, failures);
    results
}
