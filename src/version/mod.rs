// src/version/mod.rs

//! Version handling for plugin packs
//!
//! Plugin pack versions are dotted tuples ("MAJOR.MINOR.PATCH", optionally
//! followed by more components). Each component compares numerically, so
//! "2.10.0" sorts after "2.9.9". Dependencies only ever declare a minimum
//! version.

use crate::error::{Error, Result};
use semver::Version;
use std::cmp::Ordering;
use std::fmt;

/// A parsed plugin pack version
#[derive(Debug, Clone)]
pub struct PackVersion {
    raw: String,
    parsed: Version,
    /// Components past the third, trailing zeros dropped
    extra: Vec<u64>,
}

impl PackVersion {
    /// Parse a version string
    ///
    /// Accepts full semver ("1.2.3", "1.2.3-beta") as well as dotted tuples
    /// of any length ("1", "1.2", "1.2.3.4"). Missing components default
    /// to 0. Leading/trailing whitespace and a leading 'v' are ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);

        if body.is_empty() {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        if let Ok(parsed) = Version::parse(body) {
            return Ok(Self {
                raw: trimmed.to_string(),
                parsed,
                extra: Vec::new(),
            });
        }

        let mut parts = body
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| Error::InvalidVersion(s.to_string())))
            .collect::<Result<Vec<u64>>>()?;
        while parts.len() > 3 && parts.last() == Some(&0) {
            parts.pop();
        }
        parts.resize(parts.len().max(3), 0);
        let extra = parts.split_off(3);

        Ok(Self {
            raw: trimmed.to_string(),
            parsed: Version::new(parts[0], parts[1], parts[2]),
            extra,
        })
    }

    /// The version as it was written in the manifest
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when this version is at least `minimum`
    pub fn satisfies_minimum(&self, minimum: &PackVersion) -> bool {
        self >= minimum
    }
}

impl fmt::Display for PackVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for PackVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackVersion {}

impl std::hash::Hash for PackVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.parsed.hash(state);
        self.extra.hash(state);
    }
}

impl Ord for PackVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parsed
            .cmp(&other.parsed)
            .then_with(|| self.extra.cmp(&other.extra))
    }
}

impl PartialOrd for PackVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
