//! Cross-pack availability index
//!
//! A dependency declaration may match several finalized packs at once. The
//! index never picks one of them. An asset is *guaranteed* when every
//! candidate of some declaration provides it, and *offered* when at least
//! one candidate does. Any offered asset may be referenced; every such
//! reference is recorded as missing and left for the caller to settle.

use crate::asset::{AssetMap, AssetType};
use crate::dependency::PackDependency;
use crate::finalized::FinalizedPack;
use crate::identifier::Identifier;
use crate::registry::PackRegistry;
use std::collections::{BTreeMap, BTreeSet};

/// How an external asset is provided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    /// Every candidate of at least one declaration provides the asset
    pub guaranteed: bool,
    /// Layer names common to every candidate providing the asset
    pub layers: BTreeSet<String>,
}

impl Availability {
    pub fn has_layer(&self, layer: &str) -> bool {
        self.layers.contains(layer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityIndex {
    entries: AssetMap<BTreeMap<Identifier, Availability>>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the finalized candidates of every declaration
    pub fn build<'a, I>(declarations: I, registry: &PackRegistry<FinalizedPack>) -> Self
    where
        I: IntoIterator<Item = &'a PackDependency>,
    {
        let candidate_sets = declarations.into_iter().map(|declaration| {
            registry
                .matches(declaration)
                .iter()
                .filter_map(|candidate| registry.get(candidate))
                .collect::<Vec<_>>()
        });
        Self::from_candidate_sets(candidate_sets)
    }

    /// Index explicit candidate sets, one set per declaration
    pub fn from_candidate_sets<'a, I>(candidate_sets: I) -> Self
    where
        I: IntoIterator<Item = Vec<&'a FinalizedPack>>,
    {
        let mut index = Self::new();
        for candidates in candidate_sets {
            index.add_candidates(&candidates);
        }
        index
    }

    fn add_candidates(&mut self, candidates: &[&FinalizedPack]) {
        // (providers, common layers) per asset across this candidate set
        let mut seen: AssetMap<BTreeMap<&Identifier, (usize, BTreeSet<String>)>> = AssetMap::new();
        for pack in candidates {
            for (asset_type, assets) in pack.assets() {
                let by_type = seen.entry(*asset_type).or_default();
                for (identifier, asset) in assets {
                    let layers: BTreeSet<String> = asset.layer_names().map(str::to_string).collect();
                    by_type
                        .entry(identifier)
                        .and_modify(|(count, common)| {
                            *count += 1;
                            common.retain(|layer| layers.contains(layer));
                        })
                        .or_insert_with(|| (1, layers.clone()));
                }
            }
        }

        for (asset_type, assets) in seen {
            let by_type = self.entries.entry(asset_type).or_default();
            for (identifier, (count, layers)) in assets {
                let guaranteed = count == candidates.len();
                by_type
                    .entry(identifier.clone())
                    .and_modify(|existing| {
                        existing.guaranteed |= guaranteed;
                        existing.layers.retain(|layer| layers.contains(layer));
                    })
                    .or_insert_with(|| Availability {
                        guaranteed,
                        layers: layers.clone(),
                    });
            }
        }
    }

    pub fn get(&self, asset_type: AssetType, identifier: &Identifier) -> Option<&Availability> {
        self.entries.get(&asset_type)?.get(identifier)
    }

    pub fn offers(&self, asset_type: AssetType, identifier: &Identifier) -> bool {
        self.get(asset_type, identifier).is_some()
    }

    pub fn guarantees(&self, asset_type: AssetType, identifier: &Identifier) -> bool {
        self.get(asset_type, identifier)
            .is_some_and(|availability| availability.guaranteed)
    }

    /// Guaranteed identifiers of one type
    pub fn guaranteed(&self, asset_type: AssetType) -> BTreeSet<&Identifier> {
        self.entries
            .get(&asset_type)
            .map(|assets| {
                assets
                    .iter()
                    .filter(|(_, availability)| availability.guaranteed)
                    .map(|(identifier, _)| identifier)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
