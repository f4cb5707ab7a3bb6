//! Pack-level dependency declarations and version predicates

use crate::identifier::Identifier;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version predicate parse errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PredicateError {
    #[error("Invalid version '{input}': {reason}")]
    Version { input: String, reason: String },

    #[error("Unsupported version comparator in '{0}'")]
    Comparator(String),

    #[error("Inverted version bounds: {min} is not below {max}")]
    InvertedBounds { min: Version, max: Version },
}

/// Registry a dependency is resolved against
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Content pack providing assets
    #[default]
    Asset,
    /// Resource pack providing media
    Resource,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Asset => write!(f, "asset"),
            DependencyKind::Resource => write!(f, "resource"),
        }
    }
}

/// Version predicate
///
/// Text forms:
/// - `1.2.0` or `=1.2.0` (exact)
/// - `>=1.2.0` (minimum)
/// - `>=1.2.0, <2.0.0` (range, max exclusive, pre-releases of the max too)
/// - `^1.2.0` (same major), `~1.2.0` (same major.minor)
/// - `*` (any)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionPredicate {
    Exact(Version),
    Minimum(Version),
    Range { min: Version, max: Version },
    Any,
}

enum Upper<'a> {
    Inclusive(&'a Version),
    Exclusive(&'a Version),
    Unbounded,
}

impl Upper<'_> {
    fn admits(&self, version: &Version) -> bool {
        match self {
            Upper::Inclusive(max) => version <= *max,
            Upper::Exclusive(max) => version < *max && !is_prerelease_of(version, max),
            Upper::Unbounded => true,
        }
    }
}

/// `2.0.0-alpha` sorts below `2.0.0` but belongs to that release
fn is_prerelease_of(version: &Version, release: &Version) -> bool {
    !version.pre.is_empty()
        && release.pre.is_empty()
        && (version.major, version.minor, version.patch)
            == (release.major, release.minor, release.patch)
}

impl VersionPredicate {
    /// Bounded range, `min` inclusive and `max` exclusive
    pub fn range(min: Version, max: Version) -> Result<Self, PredicateError> {
        if min >= max {
            return Err(PredicateError::InvertedBounds { min, max });
        }
        Ok(VersionPredicate::Range { min, max })
    }

    /// Build from optional table bounds
    pub fn from_bounds(min: Version, max: Option<Version>) -> Result<Self, PredicateError> {
        match max {
            Some(max) => Self::range(min, max),
            None => Ok(VersionPredicate::Minimum(min)),
        }
    }

    pub fn parse(input: &str) -> Result<Self, PredicateError> {
        input.parse()
    }

    /// Check if version satisfies predicate
    pub fn matches(&self, version: &Version) -> bool {
        let above_min = self.lower().map_or(true, |min| version >= min);
        above_min && self.upper().admits(version)
    }

    /// Whether every admitted version is strictly below `version`
    pub fn lies_below(&self, version: &Version) -> bool {
        match self.upper() {
            Upper::Inclusive(max) => max < version,
            Upper::Exclusive(max) => max <= version,
            Upper::Unbounded => false,
        }
    }

    /// Whether some version satisfies both predicates
    pub fn intersects(&self, other: &VersionPredicate) -> bool {
        // The greater lower bound is the smallest version both could admit
        match std::cmp::max(self.lower(), other.lower()) {
            Some(floor) => self.upper().admits(floor) && other.upper().admits(floor),
            None => true,
        }
    }

    fn lower(&self) -> Option<&Version> {
        match self {
            VersionPredicate::Exact(v) | VersionPredicate::Minimum(v) => Some(v),
            VersionPredicate::Range { min, .. } => Some(min),
            VersionPredicate::Any => None,
        }
    }

    fn upper(&self) -> Upper<'_> {
        match self {
            VersionPredicate::Exact(v) => Upper::Inclusive(v),
            VersionPredicate::Range { max, .. } => Upper::Exclusive(max),
            VersionPredicate::Minimum(_) | VersionPredicate::Any => Upper::Unbounded,
        }
    }
}

fn parse_version(input: &str, text: &str) -> Result<Version, PredicateError> {
    Version::parse(text.trim()).map_err(|e| PredicateError::Version {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

impl FromStr for VersionPredicate {
    type Err = PredicateError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s == "*" {
            return Ok(VersionPredicate::Any);
        }

        if let Some(stripped) = s.strip_prefix('^') {
            let min = parse_version(input, stripped)?;
            let max = Version::new(min.major + 1, 0, 0);
            return Self::range(min, max);
        }

        if let Some(stripped) = s.strip_prefix('~') {
            let min = parse_version(input, stripped)?;
            let max = Version::new(min.major, min.minor + 1, 0);
            return Self::range(min, max);
        }

        if !s.contains(['<', '>', '=']) {
            return Ok(VersionPredicate::Exact(parse_version(input, s)?));
        }

        let mut min = None;
        let mut max = None;
        for part in s.split(',').map(str::trim) {
            if let Some(v) = part.strip_prefix(">=") {
                min = Some(parse_version(input, v)?);
            } else if let Some(v) = part.strip_prefix('<') {
                if v.starts_with('=') {
                    return Err(PredicateError::Comparator(input.to_string()));
                }
                max = Some(parse_version(input, v)?);
            } else if let Some(v) = part.strip_prefix('=') {
                if min.is_some() || max.is_some() || s.contains(',') {
                    return Err(PredicateError::Comparator(input.to_string()));
                }
                return Ok(VersionPredicate::Exact(parse_version(input, v)?));
            } else {
                return Err(PredicateError::Comparator(input.to_string()));
            }
        }

        match (min, max) {
            (Some(min), max) => Self::from_bounds(min, max),
            // An upper bound alone admits everything from 0.0.0
            (None, Some(max)) => Self::range(Version::new(0, 0, 0), max),
            (None, None) => Err(PredicateError::Comparator(input.to_string())),
        }
    }
}

impl fmt::Display for VersionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPredicate::Exact(v) => write!(f, "={v}"),
            VersionPredicate::Minimum(v) => write!(f, ">={v}"),
            VersionPredicate::Range { min, max } => write!(f, ">={min}, <{max}"),
            VersionPredicate::Any => write!(f, "*"),
        }
    }
}

impl TryFrom<String> for VersionPredicate {
    type Error = PredicateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionPredicate> for String {
    fn from(predicate: VersionPredicate) -> Self {
        predicate.to_string()
    }
}

/// A declared dependency on another pack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackDependency {
    target: Identifier,
    predicate: VersionPredicate,
    kind: DependencyKind,
}

impl PackDependency {
    /// The target's version, if any, is dropped; `predicate` governs versions.
    pub fn new(target: &Identifier, predicate: VersionPredicate, kind: DependencyKind) -> Self {
        Self {
            target: target.generic(),
            predicate,
            kind,
        }
    }

    pub fn asset(target: &Identifier, predicate: VersionPredicate) -> Self {
        Self::new(target, predicate, DependencyKind::Asset)
    }

    pub fn resource(target: &Identifier, predicate: VersionPredicate) -> Self {
        Self::new(target, predicate, DependencyKind::Resource)
    }

    pub fn target(&self) -> &Identifier {
        &self.target
    }

    pub fn predicate(&self) -> &VersionPredicate {
        &self.predicate
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Whether `candidate` names the target, at any version
    pub fn compatible(&self, candidate: &Identifier) -> bool {
        self.target.compatible(candidate)
    }

    /// Whether `candidate` names the target at an admitted version
    pub fn is_satisfied_by(&self, candidate: &Identifier) -> bool {
        self.compatible(candidate)
            && candidate
                .version()
                .is_some_and(|version| self.predicate.matches(version))
    }

    /// Subset of `pool` satisfying this declaration
    pub fn matches<'a, I>(&self, pool: I) -> BTreeSet<Identifier>
    where
        I: IntoIterator<Item = &'a Identifier>,
    {
        pool.into_iter()
            .filter(|candidate| self.is_satisfied_by(candidate))
            .cloned()
            .collect()
    }

    /// Whether every admitted version is strictly below `version`
    pub fn lies_below(&self, version: &Version) -> bool {
        self.predicate.lies_below(version)
    }

    /// Whether both declarations could select the same pack
    pub fn overlaps(&self, other: &PackDependency) -> bool {
        self.kind == other.kind
            && self.target.compatible(&other.target)
            && self.predicate.intersects(&other.predicate)
    }
}

impl fmt::Display for PackDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target, self.predicate)
    }
}
