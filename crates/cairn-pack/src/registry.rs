//! Registries of finalized packs, grouped by generic identifier

use crate::dependency::PackDependency;
use crate::finalized::FinalizedPack;
use crate::identifier::Identifier;
use crate::pack::ResourcePack;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};

/// Anything a registry can hold
pub trait RegisteredPack {
    fn identifier(&self) -> &Identifier;
}

impl RegisteredPack for FinalizedPack {
    fn identifier(&self) -> &Identifier {
        FinalizedPack::identifier(self)
    }
}

impl RegisteredPack for ResourcePack {
    fn identifier(&self) -> &Identifier {
        ResourcePack::identifier(self)
    }
}

/// Generic identifier -> (version -> pack)
#[derive(Debug, Clone)]
pub struct PackRegistry<P> {
    packs: BTreeMap<Identifier, BTreeMap<Version, P>>,
}

impl<P> Default for PackRegistry<P> {
    fn default() -> Self {
        Self {
            packs: BTreeMap::new(),
        }
    }
}

impl<P: RegisteredPack> PackRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pack unless its exact identifier is already present
    ///
    /// Returns false, leaving the registry unchanged, for duplicates and
    /// unversioned identifiers.
    pub fn register(&mut self, pack: P) -> bool {
        let identifier = pack.identifier();
        let Some(version) = identifier.version().cloned() else {
            return false;
        };

        let versions = self.packs.entry(identifier.generic()).or_default();
        if versions.contains_key(&version) {
            return false;
        }
        versions.insert(version, pack);
        true
    }

    pub fn get(&self, identifier: &Identifier) -> Option<&P> {
        let version = identifier.version()?;
        self.packs.get(&identifier.generic())?.get(version)
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.get(identifier).is_some()
    }

    /// Identifiers of every registered version of `generic`
    pub fn versions(&self, generic: &Identifier) -> BTreeSet<Identifier> {
        self.packs
            .get(&generic.generic())
            .map(|versions| versions.values().map(|p| p.identifier().clone()).collect())
            .unwrap_or_default()
    }

    /// Registered packs satisfying `dependency`
    pub fn matches(&self, dependency: &PackDependency) -> BTreeSet<Identifier> {
        dependency.matches(&self.versions(dependency.target()))
    }

    /// Highest registered version of `generic`
    pub fn latest(&self, generic: &Identifier) -> Option<&P> {
        self.packs
            .get(&generic.generic())?
            .values()
            .next_back()
    }

    /// Packs in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.packs.values().flat_map(BTreeMap::values)
    }

    pub fn len(&self) -> usize {
        self.packs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

/// Content and resource registries for one resolution run
///
/// Created before processing and read after compilation. The resolver only
/// ever registers into it.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub content: PackRegistry<FinalizedPack>,
    pub resources: PackRegistry<ResourcePack>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }
}
