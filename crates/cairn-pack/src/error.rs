//! Resolution failure records
//!
//! Failures never abort a sweep. They are collected into the resolution
//! report (pack level) or into the finalized pack (asset level) and left for
//! the caller to present.

use crate::asset::AssetType;
use crate::identifier::Identifier;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// What a failure is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Subject {
    Pack {
        pack: Identifier,
    },
    Asset {
        pack: Identifier,
        asset_type: AssetType,
        identifier: Identifier,
    },
}

impl Subject {
    pub fn pack(pack: &Identifier) -> Self {
        Subject::Pack { pack: pack.clone() }
    }

    pub fn asset(pack: &Identifier, asset_type: AssetType, identifier: &Identifier) -> Self {
        Subject::Asset {
            pack: pack.clone(),
            asset_type,
            identifier: identifier.clone(),
        }
    }

    /// Pack the subject belongs to
    pub fn owner(&self) -> &Identifier {
        match self {
            Subject::Pack { pack } | Subject::Asset { pack, .. } => pack,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Pack { pack } => write!(f, "pack {pack}"),
            Subject::Asset {
                pack,
                asset_type,
                identifier,
            } => write!(f, "{asset_type} {identifier} in {pack}"),
        }
    }
}

/// Where a duplicate identifier collided
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "registry", rename_all = "snake_case")]
pub enum Scope {
    ContentPacks,
    ResourcePacks,
    Assets { pack: Identifier, asset_type: AssetType },
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::ContentPacks => write!(f, "content packs"),
            Scope::ResourcePacks => write!(f, "resource packs"),
            Scope::Assets { pack, asset_type } => write!(f, "{asset_type} assets of {pack}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DuplicateIdentifier,
    UnresolvedDependency,
    VersionHierarchyViolation,
    MissingAttributeSet,
    DependencyCycle,
    InvalidDependency,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::DuplicateIdentifier => "duplicate identifier",
            FailureKind::UnresolvedDependency => "unresolved dependency",
            FailureKind::VersionHierarchyViolation => "version hierarchy violation",
            FailureKind::MissingAttributeSet => "missing attribute set",
            FailureKind::DependencyCycle => "dependency cycle",
            FailureKind::InvalidDependency => "invalid dependency",
        };
        f.write_str(name)
    }
}

/// A single resolution failure
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveError {
    #[error("Duplicate identifier {identifier} in {scope}")]
    DuplicateIdentifier { scope: Scope, identifier: Identifier },

    #[error("{subject}: unresolved dependency {dependency}")]
    UnresolvedDependency { subject: Subject, dependency: String },

    #[error(
        "{requester}: dependency {dependency} leads back to {offending}, which is not below the requester's version"
    )]
    VersionHierarchyViolation {
        requester: Identifier,
        dependency: String,
        /// The declaration that reaches back, as `pack -> declaration`
        offending: String,
    },

    #[error("{subject}: {target} has no attribute set named '{layer}'")]
    MissingAttributeSet {
        subject: Subject,
        target: Identifier,
        layer: String,
    },

    #[error("{subject}: dependency cycle {}", join_cycle(.path))]
    DependencyCycle { subject: Subject, path: Vec<Identifier> },

    #[error("{pack}: invalid dependency {dependency}: {reason}")]
    InvalidDependency {
        pack: Identifier,
        dependency: String,
        reason: String,
    },
}

fn join_cycle(path: &[Identifier]) -> String {
    path.iter()
        .map(Identifier::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::DuplicateIdentifier { .. } => FailureKind::DuplicateIdentifier,
            ResolveError::UnresolvedDependency { .. } => FailureKind::UnresolvedDependency,
            ResolveError::VersionHierarchyViolation { .. } => {
                FailureKind::VersionHierarchyViolation
            }
            ResolveError::MissingAttributeSet { .. } => FailureKind::MissingAttributeSet,
            ResolveError::DependencyCycle { .. } => FailureKind::DependencyCycle,
            ResolveError::InvalidDependency { .. } => FailureKind::InvalidDependency,
        }
    }

    /// Pack the failure is attributed to, when it has one
    pub fn pack(&self) -> Option<&Identifier> {
        match self {
            ResolveError::DuplicateIdentifier { scope, identifier } => match scope {
                Scope::Assets { pack, .. } => Some(pack),
                Scope::ContentPacks | Scope::ResourcePacks => Some(identifier),
            },
            ResolveError::UnresolvedDependency { subject, .. }
            | ResolveError::MissingAttributeSet { subject, .. }
            | ResolveError::DependencyCycle { subject, .. } => Some(subject.owner()),
            ResolveError::VersionHierarchyViolation { requester, .. } => Some(requester),
            ResolveError::InvalidDependency { pack, .. } => Some(pack),
        }
    }
}
