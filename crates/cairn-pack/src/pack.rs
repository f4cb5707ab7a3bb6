//! Pack schemas as handed to the resolver

use crate::asset::{AssetMap, AssetSchema, AssetType};
use crate::dependency::{DependencyKind, PackDependency};
use crate::error::{ResolveError, Scope};
use crate::identifier::Identifier;
use crate::{PackError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Description shown for packs that do not provide one
pub const DESCRIPTION_UNLISTED: &str = "[DESCRIPTION UNLISTED]";

/// Manifest metadata shared by content and resource packs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackMetadata {
    identifier: Identifier,
    pub name: String,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub icon: Option<PathBuf>,
}

impl PackMetadata {
    /// `identifier` must carry a version and `name` must not be blank
    pub fn new(identifier: Identifier, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if identifier.is_generic() {
            return Err(PackError::InvalidField {
                field: "version".to_string(),
                reason: format!("pack {identifier} has no version"),
            });
        }
        if name.trim().is_empty() {
            return Err(PackError::InvalidField {
                field: "name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            identifier,
            name,
            description: None,
            authors: Vec::new(),
            icon: None,
        })
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn description_or_unlisted(&self) -> &str {
        self.description.as_deref().unwrap_or(DESCRIPTION_UNLISTED)
    }
}

/// An unresolved content pack: metadata, declarations, raw assets and the
/// resource paths it ships alongside them
#[derive(Debug, Clone, PartialEq)]
pub struct PackSchema {
    metadata: PackMetadata,
    dependencies: Vec<PackDependency>,
    assets: AssetMap<BTreeMap<Identifier, AssetSchema>>,
    resources: BTreeSet<String>,
}

impl PackSchema {
    pub fn new(metadata: PackMetadata) -> Self {
        Self {
            metadata,
            dependencies: Vec::new(),
            assets: AssetMap::new(),
            resources: BTreeSet::new(),
        }
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    /// Returns false if the path was already listed
    pub fn add_resource(&mut self, path: impl Into<String>) -> bool {
        self.resources.insert(path.into())
    }

    pub fn metadata(&self) -> &PackMetadata {
        &self.metadata
    }

    pub fn identifier(&self) -> &Identifier {
        self.metadata.identifier()
    }

    /// Declare a dependency
    ///
    /// Rejects declarations that target this pack or overlap an existing
    /// declaration of the same kind.
    pub fn add_dependency(
        &mut self,
        dependency: PackDependency,
    ) -> std::result::Result<(), ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidDependency {
            pack: self.identifier().clone(),
            dependency: dependency.to_string(),
            reason,
        };

        if dependency.compatible(self.identifier()) {
            return Err(invalid("a pack cannot depend on itself".to_string()));
        }

        if let Some(existing) = self.dependencies.iter().find(|d| d.overlaps(&dependency)) {
            return Err(invalid(format!("overlaps {existing}")));
        }

        self.dependencies.push(dependency);
        Ok(())
    }

    /// Add an asset; the first asset with a given (type, identifier) wins
    pub fn add_asset(&mut self, asset: AssetSchema) -> std::result::Result<(), ResolveError> {
        let assets = self.assets.entry(asset.asset_type).or_default();
        if assets.contains_key(&asset.identifier) {
            return Err(ResolveError::DuplicateIdentifier {
                scope: Scope::Assets {
                    pack: self.metadata.identifier.clone(),
                    asset_type: asset.asset_type,
                },
                identifier: asset.identifier,
            });
        }

        assets.insert(asset.identifier.clone(), asset);
        Ok(())
    }

    pub fn dependencies(&self) -> &[PackDependency] {
        &self.dependencies
    }

    pub fn asset_dependencies(&self) -> impl Iterator<Item = &PackDependency> {
        self.dependencies_of(DependencyKind::Asset)
    }

    pub fn resource_dependencies(&self) -> impl Iterator<Item = &PackDependency> {
        self.dependencies_of(DependencyKind::Resource)
    }

    fn dependencies_of(&self, kind: DependencyKind) -> impl Iterator<Item = &PackDependency> {
        self.dependencies.iter().filter(move |d| d.kind() == kind)
    }

    pub fn assets(&self) -> &AssetMap<BTreeMap<Identifier, AssetSchema>> {
        &self.assets
    }

    pub fn asset(&self, asset_type: AssetType, identifier: &Identifier) -> Option<&AssetSchema> {
        self.assets.get(&asset_type)?.get(identifier)
    }

    /// All assets in type order, then identifier order
    pub fn iter_assets(&self) -> impl Iterator<Item = &AssetSchema> {
        self.assets.values().flat_map(BTreeMap::values)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.values().map(BTreeMap::len).sum()
    }

    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }
}

/// A resource pack: metadata plus the resource paths it ships
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePack {
    metadata: PackMetadata,
    resources: BTreeSet<String>,
}

impl ResourcePack {
    pub fn new(metadata: PackMetadata) -> Self {
        Self {
            metadata,
            resources: BTreeSet::new(),
        }
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn metadata(&self) -> &PackMetadata {
        &self.metadata
    }

    pub fn identifier(&self) -> &Identifier {
        self.metadata.identifier()
    }

    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resources.contains(path)
    }
}
