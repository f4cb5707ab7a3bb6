//! Finalized packs: the compiled, queryable view of a content pack

use crate::asset::{AssetMap, AssetSchema, AssetType};
use crate::availability::AvailabilityIndex;
use crate::dependency::PackDependency;
use crate::error::ResolveError;
use crate::identifier::Identifier;
use crate::pack::{PackMetadata, PackSchema};
use crate::registry::Registries;
use crate::validation::validate_assets;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A compiled content pack
///
/// Holds only validated assets. Every reference this pack could not resolve
/// locally lands in `missing_assets`; those every candidate of some
/// dependency provides are also listed in `external_assets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedPack {
    metadata: PackMetadata,
    dependencies: Vec<PackDependency>,
    assets: AssetMap<BTreeMap<Identifier, AssetSchema>>,
    missing_assets: AssetMap<BTreeSet<Identifier>>,
    external_assets: AssetMap<BTreeSet<Identifier>>,
    resources: BTreeSet<String>,
    asset_dependencies: BTreeSet<Identifier>,
    resource_dependencies: BTreeSet<Identifier>,
    invalid_assets: Vec<(AssetType, Identifier)>,
    failures: Vec<ResolveError>,
}

impl FinalizedPack {
    /// Compile `schema` against the packs already in `registries`
    ///
    /// Dependencies must be compiled and registered first; their asset maps
    /// feed the availability index.
    pub fn compile(schema: &PackSchema, registries: &Registries) -> Self {
        let index = AvailabilityIndex::build(schema.asset_dependencies(), &registries.content);
        let validation = validate_assets(schema, &index);

        let asset_dependencies = schema
            .asset_dependencies()
            .flat_map(|dependency| registries.content.matches(dependency))
            .collect();
        let resource_dependencies = schema
            .resource_dependencies()
            .flat_map(|dependency| registries.resources.matches(dependency))
            .collect();

        debug!(
            "compiled {}: {} of {} assets valid, {} indexed from dependencies",
            schema.identifier(),
            schema.asset_count() - validation.invalid.len(),
            schema.asset_count(),
            index.len()
        );

        Self {
            metadata: schema.metadata().clone(),
            dependencies: schema.dependencies().to_vec(),
            assets: validation.assets,
            missing_assets: validation.missing,
            external_assets: validation.external,
            resources: schema.resources().clone(),
            asset_dependencies,
            resource_dependencies,
            invalid_assets: validation.invalid,
            failures: validation.failures,
        }
    }

    pub fn metadata(&self) -> &PackMetadata {
        &self.metadata
    }

    pub fn identifier(&self) -> &Identifier {
        self.metadata.identifier()
    }

    pub fn dependencies(&self) -> &[PackDependency] {
        &self.dependencies
    }

    pub fn assets(&self) -> &AssetMap<BTreeMap<Identifier, AssetSchema>> {
        &self.assets
    }

    pub fn get_asset(&self, asset_type: AssetType, identifier: &Identifier) -> Option<&AssetSchema> {
        self.assets.get(&asset_type)?.get(identifier)
    }

    pub fn contains_asset(&self, asset_type: AssetType, identifier: &Identifier) -> bool {
        self.get_asset(asset_type, identifier).is_some()
    }

    pub fn asset_ids(&self, asset_type: AssetType) -> impl Iterator<Item = &Identifier> {
        self.assets.get(&asset_type).into_iter().flat_map(BTreeMap::keys)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.values().map(BTreeMap::len).sum()
    }

    pub fn missing_assets(&self) -> &AssetMap<BTreeSet<Identifier>> {
        &self.missing_assets
    }

    pub fn missing_of(&self, asset_type: AssetType) -> impl Iterator<Item = &Identifier> {
        self.missing_assets
            .get(&asset_type)
            .into_iter()
            .flat_map(BTreeSet::iter)
    }

    pub fn missing_count(&self) -> usize {
        self.missing_assets.values().map(BTreeSet::len).sum()
    }

    pub fn external_assets(&self) -> &AssetMap<BTreeSet<Identifier>> {
        &self.external_assets
    }

    /// Resource paths shipped by this pack itself
    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }

    pub fn contains_resource(&self, path: &str) -> bool {
        self.resources.contains(path)
    }

    /// Packs bound to asset dependency declarations at compile time
    pub fn asset_dependencies(&self) -> &BTreeSet<Identifier> {
        &self.asset_dependencies
    }

    pub fn resource_dependencies(&self) -> &BTreeSet<Identifier> {
        &self.resource_dependencies
    }

    pub fn invalid_assets(&self) -> &[(AssetType, Identifier)] {
        &self.invalid_assets
    }

    /// Asset-level failures raised while compiling
    pub fn failures(&self) -> &[ResolveError] {
        &self.failures
    }

    /// Missing assets none of `packs` provides
    ///
    /// Types with nothing left are omitted, so an empty map means the chosen
    /// packs cover every deferred reference.
    pub fn remaining_missing<'a, I>(&self, packs: I) -> AssetMap<BTreeSet<Identifier>>
    where
        I: IntoIterator<Item = &'a FinalizedPack>,
    {
        let packs: Vec<&FinalizedPack> = packs.into_iter().collect();
        self.missing_assets
            .iter()
            .filter_map(|(asset_type, missing)| {
                let remaining: BTreeSet<Identifier> = missing
                    .iter()
                    .filter(|identifier| {
                        !packs
                            .iter()
                            .any(|pack| pack.contains_asset(*asset_type, identifier))
                    })
                    .cloned()
                    .collect();
                (!remaining.is_empty()).then_some((*asset_type, remaining))
            })
            .collect()
    }

    pub fn satisfies_missing<'a, I>(&self, packs: I) -> bool
    where
        I: IntoIterator<Item = &'a FinalizedPack>,
    {
        self.remaining_missing(packs).is_empty()
    }

    /// SHA-256 over the identifier, published assets, resources and deferred references
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.identifier().to_string().as_bytes());

        for (asset_type, assets) in &self.assets {
            for asset in assets.values() {
                hasher.update(b"\0asset\0");
                hasher.update(asset_type.as_str().as_bytes());
                hasher.update(asset.identifier.to_string().as_bytes());
                hasher.update(toml::Value::Table(asset.attributes.clone()).to_string().as_bytes());
                for (name, layer) in &asset.layers {
                    hasher.update(name.as_bytes());
                    hasher.update(toml::Value::Table(layer.clone()).to_string().as_bytes());
                }
                for reference in &asset.dependencies {
                    hasher.update(reference.to_string().as_bytes());
                }
            }
        }

        for resource in &self.resources {
            hasher.update(b"\0resource\0");
            hasher.update(resource.as_bytes());
        }

        for (label, map) in [("missing", &self.missing_assets), ("external", &self.external_assets)] {
            for (asset_type, identifiers) in map {
                hasher.update(label.as_bytes());
                hasher.update(asset_type.as_str().as_bytes());
                for identifier in identifiers {
                    hasher.update(identifier.to_string().as_bytes());
                }
            }
        }

        format!("{:x}", hasher.finalize())
    }
}
