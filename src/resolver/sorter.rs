// src/resolver/sorter.rs

//! Ordering of templates inside one manifest
//!
//! Templates may inherit from other templates of the same manifest, so they
//! have to be written parents first. Parents that are not part of the
//! manifest are assumed to exist already and never block a template.
//!
//! This is a fixed-point scan rather than a graph algorithm: each pass moves
//! every template whose parents are satisfied to the output, in input order,
//! until nothing is left. Manifests hold tens of templates, so the quadratic
//! scan is fine. A pass count bound turns circular parent references into an
//! error instead of a hang.

use crate::error::{Error, Result};
use crate::manifest::TemplateRecord;
use tracing::debug;

/// Default bound on the number of passes
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// How multi-parent templates are released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentPolicy {
    /// Released as soon as one parent is satisfied (historical behavior)
    #[default]
    AnySatisfied,
    /// Released only once every parent is satisfied
    AllSatisfied,
}

/// True when a template named `name` is in `templates`
pub fn template_exists_in_templates(name: &str, templates: &[TemplateRecord]) -> bool {
    templates.iter().any(|t| t.name == name)
}

/// Orders host or service templates so parents precede children
#[derive(Debug, Clone)]
pub struct TemplateSorter {
    data: Vec<TemplateRecord>,
    policy: ParentPolicy,
    max_iterations: usize,
}

impl Default for TemplateSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSorter {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            policy: ParentPolicy::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_policy(mut self, policy: ParentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn set_input(&mut self, templates: Vec<TemplateRecord>) {
        self.data = templates;
    }

    /// Current data: the input before sorting, the ordered list afterwards
    pub fn data_to_sort(&self) -> &[TemplateRecord] {
        &self.data
    }

    pub fn into_data(self) -> Vec<TemplateRecord> {
        self.data
    }

    /// Sort the input in place and return it
    ///
    /// With `reverse`, children come before their parents, which is the
    /// order needed for deletion. On error the input is left untouched.
    pub fn perform_sort(&mut self, reverse: bool) -> Result<&[TemplateRecord]> {
        let mut sorted = self.sorted()?;
        if reverse {
            sorted.reverse();
        }
        self.data = sorted;
        Ok(&self.data)
    }

    fn is_releasable(&self, template: &TemplateRecord, sorted: &[TemplateRecord]) -> bool {
        if template.parents.is_empty() {
            return true;
        }

        let satisfied = |parent: &String| {
            !template_exists_in_templates(parent, &self.data)
                || template_exists_in_templates(parent, sorted)
        };

        match self.policy {
            ParentPolicy::AnySatisfied => template.parents.iter().any(satisfied),
            ParentPolicy::AllSatisfied => template.parents.iter().all(satisfied),
        }
    }

    fn sorted(&self) -> Result<Vec<TemplateRecord>> {
        let mut remaining: Vec<&TemplateRecord> = self.data.iter().collect();
        let mut sorted: Vec<TemplateRecord> = Vec::with_capacity(self.data.len());
        let mut iterations = 0;

        while !remaining.is_empty() {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(self.unresolvable(iterations - 1, &remaining));
            }

            let before = remaining.len();
            let mut still_waiting = Vec::with_capacity(before);
            for template in remaining {
                if self.is_releasable(template, &sorted) {
                    sorted.push(template.clone());
                } else {
                    still_waiting.push(template);
                }
            }
            remaining = still_waiting;

            // A pass that releases nothing will never release anything
            if remaining.len() == before {
                return Err(self.unresolvable(iterations, &remaining));
            }
        }

        debug!("Ordered {} templates in {} passes", sorted.len(), iterations);
        Ok(sorted)
    }

    fn unresolvable(&self, iterations: usize, remaining: &[&TemplateRecord]) -> Error {
        Error::UnresolvableTemplateOrder {
            iterations,
            unresolved: remaining.iter().map(|t| t.name.clone()).collect(),
        }
    }
}
