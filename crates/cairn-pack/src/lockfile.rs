//! Pack lockfile (cairn.lock) recording a compiled pack set

use crate::asset::{AssetMap, AssetType};
use crate::finalized::FinalizedPack;
use crate::identifier::Identifier;
use crate::registry::Registries;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Lockfile structure (cairn.lock)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackLock {
    /// Lockfile format version
    pub version: u32,
    /// Compiled packs, sorted by identifier
    #[serde(default)]
    pub packs: Vec<LockedPack>,
    #[serde(default)]
    pub metadata: LockMetadata,
}

impl PackLock {
    /// Current lockfile format version
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            packs: Vec::new(),
            metadata: LockMetadata::default(),
        }
    }

    /// Lock every compiled content pack in `registries`
    pub fn from_registries(registries: &Registries) -> Self {
        let mut lock = Self::new();
        lock.metadata.cairn_version = Some(env!("CARGO_PKG_VERSION").to_string());
        lock.metadata.generated_at =
            Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true));

        for pack in registries.content.iter() {
            lock.add_pack(LockedPack::from_finalized(pack));
        }
        lock
    }

    /// Parse lockfile from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Add or replace a locked pack
    pub fn add_pack(&mut self, pack: LockedPack) {
        self.packs.retain(|p| p.identifier != pack.identifier);
        self.packs.push(pack);
        self.packs.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    }

    pub fn get_pack(&self, identifier: &Identifier) -> Option<&LockedPack> {
        self.packs.iter().find(|p| &p.identifier == identifier)
    }

    pub fn remove_pack(&mut self, identifier: &Identifier) -> bool {
        let len = self.packs.len();
        self.packs.retain(|p| &p.identifier != identifier);
        len != self.packs.len()
    }

    /// Verify lockfile integrity
    pub fn verify(&self) -> Result<(), String> {
        if self.version > Self::VERSION {
            return Err(format!(
                "Lockfile version {} is newer than supported version {}",
                self.version,
                Self::VERSION
            ));
        }

        let mut seen = BTreeSet::new();
        for pack in &self.packs {
            if !seen.insert(&pack.identifier) {
                return Err(format!("Duplicate pack in lockfile: {}", pack.identifier));
            }
            if pack.identifier.is_generic() {
                return Err(format!("Locked pack {} has no version", pack.identifier));
            }
        }

        Ok(())
    }

    /// Differences between this lockfile and the packs in `registries`
    pub fn drift(&self, registries: &Registries) -> Vec<LockDrift> {
        let mut drift = Vec::new();

        for locked in &self.packs {
            match registries.content.get(&locked.identifier) {
                None => drift.push(LockDrift::Removed(locked.identifier.clone())),
                Some(pack) => {
                    let current = pack.fingerprint();
                    if current != locked.fingerprint {
                        drift.push(LockDrift::Changed {
                            identifier: locked.identifier.clone(),
                            locked: locked.fingerprint.clone(),
                            current,
                        });
                    }
                }
            }
        }

        for pack in registries.content.iter() {
            if self.get_pack(pack.identifier()).is_none() {
                drift.push(LockDrift::Added(pack.identifier().clone()));
            }
        }

        drift
    }
}

impl Default for PackLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Locked pack entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedPack {
    pub identifier: Identifier,
    /// SHA-256 of the compiled pack
    pub fingerprint: String,
    /// Packs bound to asset dependencies
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<Identifier>,
    /// Resource packs bound to resource dependencies
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub resources: BTreeSet<Identifier>,
    /// Deferred asset references per type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub missing: AssetMap<BTreeSet<Identifier>>,
}

impl LockedPack {
    pub fn from_finalized(pack: &FinalizedPack) -> Self {
        Self {
            identifier: pack.identifier().clone(),
            fingerprint: pack.fingerprint(),
            dependencies: pack.asset_dependencies().clone(),
            resources: pack.resource_dependencies().clone(),
            missing: pack.missing_assets().clone(),
        }
    }

    pub fn missing_count(&self) -> usize {
        self.missing.values().map(BTreeSet::len).sum()
    }

    pub fn missing_of(&self, asset_type: AssetType) -> usize {
        self.missing.get(&asset_type).map_or(0, BTreeSet::len)
    }
}

/// Lockfile metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LockMetadata {
    /// When lockfile was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    /// Cairn version used to generate lockfile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cairn_version: Option<String>,
}

/// One difference between a lockfile and a fresh resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDrift {
    /// Compiled now, absent from the lockfile
    Added(Identifier),
    /// Locked, but no longer compiles
    Removed(Identifier),
    Changed {
        identifier: Identifier,
        locked: String,
        current: String,
    },
}

impl fmt::Display for LockDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockDrift::Added(identifier) => write!(f, "added {identifier}"),
            LockDrift::Removed(identifier) => write!(f, "removed {identifier}"),
            LockDrift::Changed {
                identifier,
                locked,
                current,
            } => write!(
                f,
                "changed {identifier} ({} -> {})",
                short(locked),
                short(current)
            ),
        }
    }
}

fn short(fingerprint: &str) -> String {
    fingerprint.chars().take(12).collect()
}
