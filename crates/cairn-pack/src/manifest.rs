//! Pack manifest (pack.toml) and asset definition parsing

use crate::asset::{AssetReference, AssetSchema, AssetType, AttributeLayer};
use crate::dependency::{DependencyKind, PackDependency, VersionPredicate};
use crate::identifier::Identifier;
use crate::pack::{PackMetadata, PackSchema, ResourcePack};
use crate::{PackError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Pack manifest (pack.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackManifest {
    pub pack: ManifestMetadata,
    #[serde(default)]
    pub dependencies: Vec<ManifestDependency>,
}

/// The `[pack]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestMetadata {
    pub identifier: Identifier,
    pub version: semver::Version,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
}

/// One `[[dependencies]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestDependency {
    pub identifier: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionSpec>,
    #[serde(default, rename = "type")]
    pub kind: DependencyKind,
}

/// Version requirement as text or as explicit bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VersionSpec {
    /// `">=1.0.0"`, `"^1.2.0"`, `"*"`, ...
    Requirement(String),
    /// `{ min = "1.0.0", max = "2.0.0" }`, max exclusive and optional
    Bounds {
        min: semver::Version,
        max: Option<semver::Version>,
    },
}

impl VersionSpec {
    pub fn predicate(&self) -> Result<VersionPredicate> {
        let predicate = match self {
            VersionSpec::Requirement(text) => VersionPredicate::parse(text)?,
            VersionSpec::Bounds { min, max } => {
                VersionPredicate::from_bounds(min.clone(), max.clone())?
            }
        };
        Ok(predicate)
    }
}

impl ManifestDependency {
    pub fn to_dependency(&self) -> Result<PackDependency> {
        if !self.identifier.is_generic() {
            return Err(PackError::InvalidField {
                field: "dependencies.identifier".to_string(),
                reason: format!(
                    "'{}' carries a version; use the 'version' field",
                    self.identifier
                ),
            });
        }

        let predicate = match &self.version {
            Some(spec) => spec.predicate()?,
            None => VersionPredicate::Any,
        };
        Ok(PackDependency::new(&self.identifier, predicate, self.kind))
    }
}

impl PackManifest {
    /// Parse manifest from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Versioned pack identifier
    pub fn identifier(&self) -> Identifier {
        self.pack.identifier.with_version(self.pack.version.clone())
    }

    pub fn metadata(&self) -> Result<PackMetadata> {
        if !self.pack.identifier.is_generic() {
            return Err(PackError::InvalidField {
                field: "pack.identifier".to_string(),
                reason: format!(
                    "'{}' carries a version; use the 'version' field",
                    self.pack.identifier
                ),
            });
        }
        if let Some(author) = self.pack.authors.iter().find(|a| a.trim().is_empty()) {
            return Err(PackError::InvalidField {
                field: "pack.authors".to_string(),
                reason: format!("author entry '{author}' is blank"),
            });
        }

        let mut metadata = PackMetadata::new(self.identifier(), self.pack.name.clone())?;
        metadata.description = self.pack.description.clone();
        metadata.authors = self.pack.authors.clone();
        metadata.icon = self.pack.icon.clone();
        Ok(metadata)
    }

    /// Parse every dependency entry
    pub fn declarations(&self) -> Result<Vec<PackDependency>> {
        self.dependencies
            .iter()
            .map(ManifestDependency::to_dependency)
            .collect()
    }

    /// Build a content pack schema, without assets
    pub fn to_schema(&self) -> Result<PackSchema> {
        let mut schema = PackSchema::new(self.metadata()?);
        for dependency in self.declarations()? {
            schema.add_dependency(dependency)?;
        }
        Ok(schema)
    }

    /// Build a resource pack from this manifest and the files it ships
    pub fn to_resource_pack<I, S>(&self, resources: I) -> Result<ResourcePack>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.dependencies.is_empty() {
            return Err(PackError::InvalidField {
                field: "dependencies".to_string(),
                reason: "resource packs cannot declare dependencies".to_string(),
            });
        }
        Ok(ResourcePack::new(self.metadata()?).with_resources(resources))
    }
}

/// One asset definition file
///
/// ```toml
/// type = "entity"
/// identifier = "core:zombie"
///
/// [attributes]
/// model = "core:zombie_model"
///
/// [attribute-sets.baby]
/// scale = 0.5
///
/// [[dependencies]]
/// type = "animation"
/// identifier = "core:walk"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AssetDefinition {
    #[serde(default, rename = "type")]
    pub asset_type: Option<AssetType>,
    pub identifier: Identifier,
    #[serde(default)]
    pub attributes: AttributeLayer,
    #[serde(default, rename = "attribute-sets")]
    pub attribute_sets: BTreeMap<String, AttributeLayer>,
    #[serde(default)]
    pub dependencies: Vec<AssetReference>,
}

impl AssetDefinition {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Build the schema
    ///
    /// `implied_type` comes from the directory the definition was found in;
    /// an explicit `type` must agree with it.
    pub fn into_schema(self, implied_type: Option<AssetType>) -> Result<AssetSchema> {
        let asset_type = match (self.asset_type, implied_type) {
            (Some(explicit), Some(implied)) if explicit != implied => {
                return Err(PackError::InvalidField {
                    field: "type".to_string(),
                    reason: format!(
                        "{} is declared as {explicit} but lives in the {implied} directory",
                        self.identifier
                    ),
                })
            }
            (Some(asset_type), _) | (None, Some(asset_type)) => asset_type,
            (None, None) => return Err(PackError::MissingField("type".to_string())),
        };

        if !self.identifier.is_generic() {
            return Err(PackError::InvalidField {
                field: "identifier".to_string(),
                reason: format!("asset identifier '{}' cannot carry a version", self.identifier),
            });
        }

        let mut schema = AssetSchema::new(asset_type, self.identifier)
            .with_attributes(self.attributes);
        for (name, layer) in self.attribute_sets {
            schema = schema.with_layer(name, layer);
        }
        for reference in self.dependencies {
            schema.add_dependency(reference);
        }
        schema.collect_references()?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use semver::Version;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).unwrap()
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let toml = r#"
            [pack]
            identifier = "core:base"
            version = "1.0.0"
            name = "Core"
        "#;

        let manifest = PackManifest::from_str(toml).unwrap();
        assert_eq!(manifest.identifier(), id("core:base@1.0.0"));
        assert!(manifest.dependencies.is_empty());

        let metadata = manifest.metadata().unwrap();
        assert_eq!(metadata.description, None);
        assert!(metadata.authors.is_empty());
    }

    #[test]
    fn test_parse_dependency_forms() {
        let toml = r#"
            [pack]
            identifier = "mod:extra"
            version = "1.0.0"
            name = "Extra"

            [[dependencies]]
            identifier = "core:base"
            version = "^1.0.0"

            [[dependencies]]
            identifier = "core:textures"
            version = { min = "1.0.0", max = "3.0.0" }
            type = "resource"

            [[dependencies]]
            identifier = "core:sounds"
            type = "resource"
        "#;

        let manifest = PackManifest::from_str(toml).unwrap();
        let declarations = manifest.declarations().unwrap();
        assert_eq!(
            declarations,
            vec![
                PackDependency::asset(
                    &id("core:base"),
                    VersionPredicate::Range {
                        min: Version::new(1, 0, 0),
                        max: Version::new(2, 0, 0),
                    },
                ),
                PackDependency::resource(
                    &id("core:textures"),
                    VersionPredicate::Range {
                        min: Version::new(1, 0, 0),
                        max: Version::new(3, 0, 0),
                    },
                ),
                PackDependency::resource(&id("core:sounds"), VersionPredicate::Any),
            ]
        );
        assert_eq!(manifest.to_schema().unwrap().dependencies().len(), 3);
    }

    #[test]
    fn test_manifest_rejects_versioned_identifier() {
        let toml = r#"
            [pack]
            identifier = "core:base@1.0.0"
            version = "1.0.0"
            name = "Core"
        "#;

        let manifest = PackManifest::from_str(toml).unwrap();
        assert!(matches!(manifest.metadata(), Err(PackError::InvalidField { .. })));
    }

    #[test]
    fn test_manifest_self_dependency() {
        let toml = r#"
            [pack]
            identifier = "core:base"
            version = "2.0.0"
            name = "Core"

            [[dependencies]]
            identifier = "core:base"
            version = "1.0.0"
        "#;

        let manifest = PackManifest::from_str(toml).unwrap();
        assert!(matches!(manifest.to_schema(), Err(PackError::Resolve(_))));
    }

    #[test]
    fn test_manifest_serializes_back() {
        let toml = r#"
            [pack]
            identifier = "core:base"
            version = "1.0.0"
            name = "Core"
            authors = ["Cairn Team"]
        "#;

        let manifest = PackManifest::from_str(toml).unwrap();
        let text = manifest.to_string().unwrap();
        assert!(text.contains("identifier = \"core:base\""));
        assert_eq!(PackManifest::from_str(&text).unwrap(), manifest);
    }

    #[test]
    fn test_resource_pack_from_manifest() {
        let toml = r#"
            [pack]
            identifier = "core:textures"
            version = "1.0.0"
            name = "Textures"
        "#;

        let manifest = PackManifest::from_str(toml).unwrap();
        let pack = manifest
            .to_resource_pack(["blocks/stone.png", "blocks/dirt.png"])
            .unwrap();
        assert!(pack.contains("blocks/stone.png"));
        assert_eq!(pack.resources().len(), 2);
    }

    #[test]
    fn test_asset_definition() {
        let toml = r#"
            identifier = "core:zombie"

            [attributes]
            model = "core:zombie_model"
            health = 20

            [attribute-sets.baby]
            scale = 0.5

            [[dependencies]]
            type = "animation"
            identifier = "core:walk"
            layer = "fast"
        "#;

        let schema = AssetDefinition::from_str(toml)
            .unwrap()
            .into_schema(Some(AssetType::Entity))
            .unwrap();

        assert_eq!(schema.asset_type, AssetType::Entity);
        assert!(schema.has_layer("baby"));
        assert_eq!(
            schema.dependencies,
            vec![
                AssetReference::new(AssetType::Animation, id("core:walk")).with_layer("fast"),
                AssetReference::new(AssetType::Model, id("core:zombie_model")),
            ]
        );
    }

    #[test]
    fn test_asset_definition_type_mismatch() {
        let toml = r#"
            type = "item"
            identifier = "core:zombie"
        "#;

        let definition = AssetDefinition::from_str(toml).unwrap();
        assert!(matches!(
            definition.into_schema(Some(AssetType::Entity)),
            Err(PackError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_asset_definition_needs_type() {
        let definition = AssetDefinition::from_str(r#"identifier = "core:rock""#).unwrap();
        assert!(matches!(
            definition.into_schema(None),
            Err(PackError::MissingField(_))
        ));
    }
}
