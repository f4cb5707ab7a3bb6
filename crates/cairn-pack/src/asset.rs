//! Asset schemas and the per-type dispatch table
//!
//! Every asset is one uniform [`AssetSchema`]. What differs between kinds of
//! asset (which attribute fields point at other assets, which fields must be
//! present) lives in a static table indexed by [`AssetType`].

use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use toml::Value;

/// A set of attribute values, either the base layer or a named override
pub type AttributeLayer = toml::Table;

/// Per-type map, keyed in declaration order of [`AssetType`]
pub type AssetMap<T> = BTreeMap<AssetType, T>;

/// Asset definition errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("Unknown asset type '{0}'")]
    UnknownType(String),

    #[error("{asset_type} {identifier} is missing required field '{field}'")]
    MissingField {
        asset_type: AssetType,
        identifier: Identifier,
        field: String,
    },

    #[error("Invalid reference in field '{field}': {reason}")]
    InvalidReference { field: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    AnimationController,
    Animation,
    Element,
    Entity,
    Item,
    Model,
    RenderMaterial,
    Structure,
    Layout,
    Interface,
    LootTable,
    Recipe,
}

impl AssetType {
    pub const ALL: [AssetType; 12] = [
        AssetType::AnimationController,
        AssetType::Animation,
        AssetType::Element,
        AssetType::Entity,
        AssetType::Item,
        AssetType::Model,
        AssetType::RenderMaterial,
        AssetType::Structure,
        AssetType::Layout,
        AssetType::Interface,
        AssetType::LootTable,
        AssetType::Recipe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::AnimationController => "animation_controller",
            AssetType::Animation => "animation",
            AssetType::Element => "element",
            AssetType::Entity => "entity",
            AssetType::Item => "item",
            AssetType::Model => "model",
            AssetType::RenderMaterial => "render_material",
            AssetType::Structure => "structure",
            AssetType::Layout => "layout",
            AssetType::Interface => "interface",
            AssetType::LootTable => "loot_table",
            AssetType::Recipe => "recipe",
        }
    }

    /// Dispatch table entry for this type
    pub fn kind(self) -> &'static AssetKind {
        &KINDS[self as usize]
    }

    /// Directory holding this type's definitions inside a content pack
    pub fn directory(self) -> &'static str {
        self.kind().directory
    }

    pub fn from_directory(directory: &str) -> Option<Self> {
        KINDS
            .iter()
            .find(|kind| kind.directory == directory)
            .map(|kind| kind.asset_type)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AssetError::UnknownType(s.to_string()))
    }
}

/// An attribute field whose value names other assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceField {
    pub key: &'static str,
    pub target: AssetType,
    /// Field holds a list rather than a single reference
    pub many: bool,
}

const fn one(key: &'static str, target: AssetType) -> ReferenceField {
    ReferenceField {
        key,
        target,
        many: false,
    }
}

const fn many(key: &'static str, target: AssetType) -> ReferenceField {
    ReferenceField {
        key,
        target,
        many: true,
    }
}

/// Per-type capabilities
#[derive(Debug)]
pub struct AssetKind {
    pub asset_type: AssetType,
    pub directory: &'static str,
    pub references: &'static [ReferenceField],
    /// Fields the base layer must define
    pub required: &'static [&'static str],
}

// Indexed by `AssetType as usize`; order must follow the enum.
static KINDS: [AssetKind; 12] = [
    AssetKind {
        asset_type: AssetType::AnimationController,
        directory: "animation_controllers",
        references: &[many("animations", AssetType::Animation)],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::Animation,
        directory: "animations",
        references: &[],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::Element,
        directory: "elements",
        references: &[
            one("model", AssetType::Model),
            one("render_material", AssetType::RenderMaterial),
            one("animation_controller", AssetType::AnimationController),
        ],
        required: &["model"],
    },
    AssetKind {
        asset_type: AssetType::Entity,
        directory: "entities",
        references: &[
            one("model", AssetType::Model),
            one("render_material", AssetType::RenderMaterial),
            one("animation_controller", AssetType::AnimationController),
            one("loot_table", AssetType::LootTable),
        ],
        required: &["model"],
    },
    AssetKind {
        asset_type: AssetType::Item,
        directory: "items",
        references: &[
            one("model", AssetType::Model),
            one("render_material", AssetType::RenderMaterial),
            one("animation_controller", AssetType::AnimationController),
        ],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::Model,
        directory: "models",
        references: &[],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::RenderMaterial,
        directory: "render_materials",
        references: &[],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::Structure,
        directory: "structures",
        references: &[
            one("model", AssetType::Model),
            one("render_material", AssetType::RenderMaterial),
        ],
        required: &["model"],
    },
    AssetKind {
        asset_type: AssetType::Layout,
        directory: "layouts",
        references: &[
            many("structures", AssetType::Structure),
            many("entities", AssetType::Entity),
            many("items", AssetType::Item),
        ],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::Interface,
        directory: "interfaces",
        references: &[],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::LootTable,
        directory: "loot_tables",
        references: &[many("items", AssetType::Item)],
        required: &[],
    },
    AssetKind {
        asset_type: AssetType::Recipe,
        directory: "recipes",
        references: &[
            many("ingredients", AssetType::Item),
            one("result", AssetType::Item),
        ],
        required: &["result"],
    },
];

impl AssetKind {
    /// Check the base layer defines every required field
    pub fn check_required(&self, asset: &AssetSchema) -> Result<(), AssetError> {
        match self
            .required
            .iter()
            .find(|field| !asset.attributes.contains_key(**field))
        {
            Some(field) => Err(AssetError::MissingField {
                asset_type: self.asset_type,
                identifier: asset.identifier.clone(),
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Extract the references implied by reference fields in `layer`
    pub fn references_in(&self, layer: &AttributeLayer) -> Result<Vec<AssetReference>, AssetError> {
        let mut references = Vec::new();
        for field in self.references {
            let Some(value) = layer.get(field.key) else {
                continue;
            };

            match (value, field.many) {
                (Value::Array(items), true) => {
                    for item in items {
                        references.push(parse_reference(field, item)?);
                    }
                }
                (value, false) => references.push(parse_reference(field, value)?),
                (other, true) => {
                    return Err(AssetError::InvalidReference {
                        field: field.key.to_string(),
                        reason: format!("expected an array, found {}", other.type_str()),
                    })
                }
            }
        }
        Ok(references)
    }
}

fn parse_reference(field: &ReferenceField, value: &Value) -> Result<AssetReference, AssetError> {
    let invalid = |reason: String| AssetError::InvalidReference {
        field: field.key.to_string(),
        reason,
    };

    let (text, layer) = match value {
        Value::String(text) => (text.as_str(), None),
        Value::Table(table) => {
            let text = table
                .get("identifier")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("table reference needs an 'identifier' string".to_string()))?;
            let layer = match table.get("layer") {
                Some(Value::String(layer)) => Some(layer.clone()),
                Some(other) => {
                    return Err(invalid(format!(
                        "'layer' must be a string, found {}",
                        other.type_str()
                    )))
                }
                None => None,
            };
            (text, layer)
        }
        other => {
            return Err(invalid(format!(
                "expected a string or table, found {}",
                other.type_str()
            )))
        }
    };

    let identifier = Identifier::parse(text).map_err(|e| invalid(e.to_string()))?;
    if !identifier.is_generic() {
        return Err(invalid(format!("asset identifier '{text}' cannot carry a version")));
    }

    Ok(AssetReference {
        asset_type: field.target,
        identifier,
        layer,
    })
}

/// A reference from one asset to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetReference {
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub identifier: Identifier,
    /// Named attribute layer the target must provide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

impl AssetReference {
    pub fn new(asset_type: AssetType, identifier: Identifier) -> Self {
        Self {
            asset_type,
            identifier,
            layer: None,
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.asset_type, self.identifier)?;
        if let Some(layer) = &self.layer {
            write!(f, " [{layer}]")?;
        }
        Ok(())
    }
}

/// A typed asset definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetSchema {
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub identifier: Identifier,
    /// Base attribute layer
    pub attributes: AttributeLayer,
    /// Named attribute layers
    pub layers: BTreeMap<String, AttributeLayer>,
    pub dependencies: Vec<AssetReference>,
}

impl AssetSchema {
    pub fn new(asset_type: AssetType, identifier: Identifier) -> Self {
        Self {
            asset_type,
            identifier,
            attributes: AttributeLayer::new(),
            layers: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: AttributeLayer) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_layer(mut self, name: impl Into<String>, layer: AttributeLayer) -> Self {
        self.layers.insert(name.into(), layer);
        self
    }

    pub fn with_dependency(mut self, reference: AssetReference) -> Self {
        self.add_dependency(reference);
        self
    }

    /// Add a reference; returns false if already present
    pub fn add_dependency(&mut self, reference: AssetReference) -> bool {
        if self.dependencies.contains(&reference) {
            return false;
        }
        self.dependencies.push(reference);
        true
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn layer(&self, name: &str) -> Option<&AttributeLayer> {
        self.layers.get(name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Check required fields and add references implied by reference fields
    /// in the base layer and every named layer
    pub fn collect_references(&mut self) -> Result<(), AssetError> {
        let kind = self.asset_type.kind();
        kind.check_required(self)?;

        let mut implied = kind.references_in(&self.attributes)?;
        for layer in self.layers.values() {
            implied.extend(kind.references_in(layer)?);
        }

        for reference in implied {
            self.add_dependency(reference);
        }
        Ok(())
    }
}
