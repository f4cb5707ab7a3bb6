//! Cairn pack resolution
//!
//! Resolves, validates and compiles content packs. Packs declare versioned
//! dependencies on other packs and carry typed assets that may reference
//! each other across pack boundaries. The resolver accepts a pack only when
//! every dependency is satisfiable without a version-disguised cycle, then
//! compiles it into a [`FinalizedPack`] registered in the caller's
//! [`Registries`].
//!
//! File discovery and presentation are left to the caller; this crate works
//! on parsed [`PackSchema`] and [`ResourcePack`] values.

pub mod asset;
pub mod availability;
pub mod dependency;
pub mod error;
pub mod finalized;
pub mod identifier;
pub mod lockfile;
pub mod manifest;
pub mod pack;
pub mod registry;
pub mod resolver;
pub mod validation;

pub use asset::{AssetError, AssetMap, AssetReference, AssetSchema, AssetType, AttributeLayer};
pub use availability::{Availability, AvailabilityIndex};
pub use dependency::{DependencyKind, PackDependency, PredicateError, VersionPredicate};
pub use error::{FailureKind, ResolveError, Scope, Subject};
pub use finalized::FinalizedPack;
pub use identifier::{Identifier, IdentifierError};
pub use lockfile::{LockDrift, LockedPack, PackLock};
pub use manifest::{AssetDefinition, PackManifest, VersionSpec};
pub use pack::{PackMetadata, PackSchema, ResourcePack};
pub use registry::{PackRegistry, Registries};
pub use resolver::{PackResolver, ResolutionReport};
pub use validation::{validate_assets, AssetValidation, ValidationState};

/// Pack definition errors
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Semver error: {0}")]
    SemverError(#[from] semver::Error),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Predicate(#[from] PredicateError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value: {field} - {reason}")]
    InvalidField { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PackError>;
