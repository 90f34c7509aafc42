// src/commands/operation.rs
//! Install, update, reinstall and uninstall commands

use super::{open_db, parse_packages, print_json};
use anyhow::{Context, Result, bail};
use ppm::operation::reinstall;
use ppm::resolver::{DependencyStatus, PlannedDependency, plan_dependencies};
use ppm::{Config, DirectoryProvider, Install, Operation, OperationResult, PackageDescriptor, Uninstall, Update};
use std::collections::HashSet;
use tracing::{info, warn};

fn finish(result: &OperationResult) -> Result<()> {
    print_json(result)?;
    if let Some(failed) = &result.failed {
        bail!(
            "{} failed: {} ({} not attempted)",
            failed.problematic,
            failed.error,
            failed.remaining.len()
        );
    }
    Ok(())
}

/// Runs of the merged dependency plans sharing one status
///
/// Plans are concatenated in request order, keeping the first entry of each
/// slug. Consecutive entries with the same status form one batch, so every
/// dependency is applied before its dependents.
fn dependency_batches(
    plans: impl IntoIterator<Item = PlannedDependency>,
) -> Vec<(DependencyStatus, Vec<PackageDescriptor>)> {
    let mut seen = HashSet::new();
    let mut batches: Vec<(DependencyStatus, Vec<PackageDescriptor>)> = Vec::new();

    for entry in plans {
        if !seen.insert(entry.slug.clone()) {
            continue;
        }
        let descriptor = PackageDescriptor::new(entry.slug, entry.version);
        match batches.last_mut() {
            Some((status, run)) if *status == entry.status => run.push(descriptor),
            _ => batches.push((entry.status, vec![descriptor])),
        }
    }
    batches
}

/// Expand the requested packs into ordered install/upgrade batches
fn with_dependencies(
    conn: &rusqlite::Connection,
    provider: &DirectoryProvider,
    packages: &[PackageDescriptor],
) -> Result<Vec<(DependencyStatus, Vec<PackageDescriptor>)>> {
    let mut plans = Vec::new();
    for package in packages {
        if !package.version.is_empty() {
            bail!(
                "--with-deps installs the latest {0}; drop '@{1}' or install {0}@{1} without --with-deps",
                package.slug,
                package.version
            );
        }
        plans.extend(
            plan_dependencies(conn, provider, package)
                .with_context(|| format!("Failed to resolve dependencies of {}", package))?,
        );
    }
    Ok(dependency_batches(plans))
}

/// Install plugin packs
pub fn cmd_install(config: &Config, args: &[String], with_deps: bool) -> Result<()> {
    let packages = parse_packages(args)?;
    let mut conn = open_db(config)?;
    let provider = DirectoryProvider::new(&config.catalog_dir);

    if !with_deps {
        let result = Install::new(&mut conn, &provider, config.sorter).launch_operation(&packages);
        return finish(&result);
    }

    let batches = with_dependencies(&conn, &provider, &packages)?;
    if batches.is_empty() {
        info!("Everything requested is up to date");
    }
    for (status, batch) in batches {
        info!("Applying {} batch of {} plugin pack(s)", status, batch.len());
        let result = match status {
            DependencyStatus::ToInstall => {
                Install::new(&mut conn, &provider, config.sorter).launch_operation(&batch)
            }
            DependencyStatus::ToUpgrade => {
                Update::new(&mut conn, &provider, config.sorter).launch_operation(&batch)
            }
        };
        finish(&result)?;
    }
    Ok(())
}

/// Update installed plugin packs
pub fn cmd_update(config: &Config, args: &[String]) -> Result<()> {
    let packages = parse_packages(args)?;
    let mut conn = open_db(config)?;
    let provider = DirectoryProvider::new(&config.catalog_dir);

    let result = Update::new(&mut conn, &provider, config.sorter).launch_operation(&packages);
    finish(&result)
}

/// Update every pack independently
pub fn cmd_reinstall(config: &Config, args: &[String]) -> Result<()> {
    let packages = parse_packages(args)?;
    let mut conn = open_db(config)?;
    let provider = DirectoryProvider::new(&config.catalog_dir);

    let results = reinstall(&mut conn, &provider, config.sorter, &packages);
    print_json(&results)?;

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{} of {} plugin pack(s) failed to reinstall", failed, packages.len());
    }
    Ok(())
}

/// Remove plugin packs, refusing while their objects are in use unless forced
pub fn cmd_uninstall(config: &Config, args: &[String], force: bool) -> Result<()> {
    let packages = parse_packages(args)?;
    let mut conn = open_db(config)?;
    let provider = DirectoryProvider::new(&config.catalog_dir);
    let mut uninstall = Uninstall::new(&mut conn, &provider, config.sorter);

    let checked = uninstall
        .check_used_batch(&packages)
        .context("Failed to check usage of the plugin packs")?;
    for (package, references) in checked {
        if references.is_empty() {
            continue;
        }
        if force {
            warn!("{} is still in use, removing anyway", package);
            continue;
        }
        print_json(&references)?;
        bail!("{} is still in use; pass --force to remove it anyway", package);
    }

    let result = uninstall.launch_operation(&packages);
    finish(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppm::db::models::PluginPack;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn planned(slug: &str, status: DependencyStatus) -> PlannedDependency {
        PlannedDependency {
            slug: slug.to_string(),
            version: "1.0.0".to_string(),
            status,
            installed_version: None,
        }
    }

    fn write_manifest(catalog: &Path, slug: &str, version: &str, dependencies: serde_json::Value) {
        let dir = catalog.join(slug);
        fs::create_dir_all(&dir).unwrap();
        let manifest = json!({
            "information": {"slug": slug, "version": version, "dependencies": dependencies}
        });
        fs::write(dir.join(format!("{version}.json")), manifest.to_string()).unwrap();
    }

    /// b 1.0.0, b 2.0.0 depending on c, c 1.0.0
    fn setup() -> (TempDir, Config) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: temp_dir.path().join("ppm.db"),
            catalog_dir: temp_dir.path().join("catalog"),
            ..Config::default()
        };
        write_manifest(&config.catalog_dir, "b", "1.0.0", json!([]));
        write_manifest(&config.catalog_dir, "b", "2.0.0", json!([{"slug": "c", "version": "1.0.0"}]));
        write_manifest(&config.catalog_dir, "c", "1.0.0", json!([]));
        (temp_dir, config)
    }

    #[test]
    fn test_batches_keep_plan_order() {
        let batches = dependency_batches(vec![
            planned("c", DependencyStatus::ToInstall),
            planned("d", DependencyStatus::ToInstall),
            planned("b", DependencyStatus::ToUpgrade),
            planned("a", DependencyStatus::ToInstall),
            planned("c", DependencyStatus::ToInstall),
        ]);
        let shape: Vec<_> = batches
            .iter()
            .map(|(status, run)| (*status, run.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (DependencyStatus::ToInstall, vec!["c", "d"]),
                (DependencyStatus::ToUpgrade, vec!["b"]),
                (DependencyStatus::ToInstall, vec!["a"]),
            ]
        );
    }

    #[test]
    fn test_install_with_deps_installs_new_dependency_before_upgrade() {
        let (_temp_dir, config) = setup();
        cmd_install(&config, &["b@1.0.0".to_string()], false).unwrap();

        cmd_install(&config, &["b".to_string()], true).unwrap();

        let conn = ppm::db::open(&config.db_path).unwrap();
        let b = PluginPack::find_by_slug(&conn, "b").unwrap().unwrap();
        assert_eq!(b.version, "2.0.0");
        assert_eq!(PluginPack::dependency_slugs(&conn, b.id.unwrap()).unwrap(), vec!["c"]);
        assert!(PluginPack::find_by_slug(&conn, "c").unwrap().is_some());
    }

    #[test]
    fn test_install_with_deps_rejects_pinned_version() {
        let (_temp_dir, config) = setup();
        let err = cmd_install(&config, &["b@1.0.0".to_string()], true).unwrap_err();
        assert!(err.to_string().contains("--with-deps"));

        let conn = ppm::db::open(&config.db_path).unwrap();
        assert!(PluginPack::list_all(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_uninstall_dependent_and_dependency_together() {
        let (_temp_dir, config) = setup();
        cmd_install(&config, &["b".to_string()], true).unwrap();

        // c is used by b, which goes first in the same batch
        cmd_uninstall(&config, &["b".to_string(), "c".to_string()], false).unwrap();

        let conn = ppm::db::open(&config.db_path).unwrap();
        assert!(PluginPack::list_all(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_uninstall_refuses_dependency_alone() {
        let (_temp_dir, config) = setup();
        cmd_install(&config, &["b".to_string()], true).unwrap();

        let err = cmd_uninstall(&config, &["c".to_string()], false).unwrap_err();
        assert!(err.to_string().contains("still in use"));
    }
}
