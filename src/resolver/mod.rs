// src/resolver/mod.rs

//! Ordering algorithms
//!
//! [`DependencySorter`] orders packs so dependencies come first,
//! [`TemplateSorter`] orders the templates inside one manifest so parents
//! come first, and [`plan_dependencies`] compares a resolved order with
//! what is installed.

mod dependency;
mod plan;
mod sorter;

pub use dependency::{DependencyCheckState, DependencySorter, ResolvedPackage};
pub use plan::{DependencyStatus, PlannedDependency, plan_dependencies};
pub use sorter::{DEFAULT_MAX_ITERATIONS, ParentPolicy, TemplateSorter, template_exists_in_templates};
