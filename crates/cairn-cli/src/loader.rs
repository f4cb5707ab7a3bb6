//! Pack discovery on disk
//!
//! ```text
//! <root>/resources/<dir>/pack.toml
//! <root>/content/<dir>/pack.toml
//! <root>/content/<dir>/<type directory>/**/*.toml
//! ```
//!
//! Every other file in a pack directory is listed as one of its resources,
//! by its '/'-separated path relative to the pack.
//!
//! Problems with individual files never stop discovery. They are collected
//! as [`LoadIssue`]s and the offending file or pack is skipped.

use anyhow::{bail, Result};
use cairn_pack::{
    AssetDefinition, AssetType, PackManifest, PackSchema, ResolveError, ResourcePack,
};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "pack.toml";

/// A file or asset that could not be loaded
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum LoadIssue {
    File { path: PathBuf, message: String },
    Duplicate { path: PathBuf, error: ResolveError },
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadIssue::File { path, message } => write!(f, "{}: {message}", path.display()),
            LoadIssue::Duplicate { path, error } => write!(f, "{}: {error}", path.display()),
        }
    }
}

/// Everything found under a set of roots
#[derive(Debug, Default)]
pub struct LoadedPacks {
    pub resources: Vec<ResourcePack>,
    pub content: Vec<PackSchema>,
    pub issues: Vec<LoadIssue>,
}

impl LoadedPacks {
    fn issue(&mut self, path: &Path, message: impl fmt::Display) {
        self.issues.push(LoadIssue::File {
            path: path.to_path_buf(),
            message: message.to_string(),
        });
    }
}

/// Load every pack below `roots`
///
/// Fails only when a root itself is missing.
pub fn load_roots(roots: &[PathBuf]) -> Result<LoadedPacks> {
    let mut loaded = LoadedPacks::default();

    for root in roots {
        if !root.is_dir() {
            bail!("Pack root not found: {}", root.display());
        }

        for dir in pack_dirs(&root.join("resources")) {
            load_resource_pack(&dir, &mut loaded);
        }
        for dir in pack_dirs(&root.join("content")) {
            load_content_pack(&dir, &mut loaded);
        }
    }

    debug!(
        "loaded {} resource packs, {} content packs, {} issues",
        loaded.resources.len(),
        loaded.content.len(),
        loaded.issues.len()
    );
    Ok(loaded)
}

/// Immediate subdirectories, sorted by name
fn pack_dirs(parent: &Path) -> Vec<PathBuf> {
    if !parent.is_dir() {
        return Vec::new();
    }

    WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

fn read_manifest(dir: &Path, loaded: &mut LoadedPacks) -> Option<PackManifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            loaded.issue(&path, format!("Failed to read manifest: {e}"));
            return None;
        }
    };

    match PackManifest::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            loaded.issue(&path, format!("Failed to parse manifest: {e}"));
            None
        }
    }
}

fn load_resource_pack(dir: &Path, loaded: &mut LoadedPacks) {
    let Some(manifest) = read_manifest(dir, loaded) else {
        return;
    };

    match manifest.to_resource_pack(pack_files(dir)) {
        Ok(pack) => {
            debug!("found resource pack {} in {}", pack.identifier(), dir.display());
            loaded.resources.push(pack);
        }
        Err(e) => loaded.issue(&dir.join(MANIFEST_FILE), e),
    }
}

/// Every file below `dir` except the manifest, as resource paths
fn pack_files(dir: &Path) -> Vec<String> {
    WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| resource_path(dir, entry.path()))
        .filter(|path| path != MANIFEST_FILE)
        .collect()
}

/// Whether a content pack file is an asset definition rather than a resource
fn is_asset_file(path: &str) -> bool {
    match path.split_once('/') {
        Some((type_dir, _)) => {
            AssetType::from_directory(type_dir).is_some() && path.ends_with(".toml")
        }
        None => false,
    }
}

/// Path of `file` relative to `dir`, '/'-separated
fn resource_path(dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(dir).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn load_content_pack(dir: &Path, loaded: &mut LoadedPacks) {
    let Some(manifest) = read_manifest(dir, loaded) else {
        return;
    };
    let mut schema = match manifest.to_schema() {
        Ok(schema) => schema,
        Err(e) => {
            loaded.issue(&dir.join(MANIFEST_FILE), e);
            return;
        }
    };

    for type_dir in pack_dirs(dir) {
        let name = type_dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let Some(asset_type) = AssetType::from_directory(name) else {
            debug!("skipping {}: not an asset directory", type_dir.display());
            continue;
        };
        load_assets(&type_dir, asset_type, &mut schema, loaded);
    }

    for path in pack_files(dir).into_iter().filter(|path| !is_asset_file(path)) {
        schema.add_resource(path);
    }

    debug!(
        "found content pack {} with {} assets, {} resources",
        schema.identifier(),
        schema.asset_count(),
        schema.resources().len()
    );
    loaded.content.push(schema);
}

fn load_assets(dir: &Path, asset_type: AssetType, schema: &mut PackSchema, loaded: &mut LoadedPacks) {
    let files = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "toml"));

    for entry in files {
        let path = entry.path();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                loaded.issue(path, format!("Failed to read asset: {e}"));
                continue;
            }
        };

        let asset = match AssetDefinition::from_str(&content) {
            Ok(definition) => definition.into_schema(Some(asset_type)),
            Err(e) => {
                loaded.issue(path, format!("Failed to parse asset: {e}"));
                continue;
            }
        };

        match asset {
            Ok(asset) => {
                if let Err(error) = schema.add_asset(asset) {
                    loaded.issues.push(LoadIssue::Duplicate {
                        path: path.to_path_buf(),
                        error,
                    });
                }
            }
            Err(e) => loaded.issue(path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_pack::{FailureKind, Identifier};
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn manifest(identifier: &str, version: &str) -> String {
        format!(
            "[pack]\nidentifier = \"{identifier}\"\nversion = \"{version}\"\nname = \"Test\"\n"
        )
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(load_roots(&[temp.path().join("nope")]).is_err());
    }

    #[test]
    fn test_resource_paths_are_relative() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "resources/tex/pack.toml", &manifest("core:textures", "1.0.0"));
        write(temp.path(), "resources/tex/textures/mobs/zombie.png", "png");

        let loaded = load_roots(&[temp.path().to_path_buf()]).unwrap();
        assert!(loaded.issues.is_empty());
        let pack = &loaded.resources[0];
        assert!(pack.contains("textures/mobs/zombie.png"));
        assert!(!pack.contains(MANIFEST_FILE));
    }

    #[test]
    fn test_assets_typed_by_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "content/base/pack.toml", &manifest("core:base", "1.0.0"));
        write(
            temp.path(),
            "content/base/models/mobs/zombie_model.toml",
            "identifier = \"core:zombie_model\"\n",
        );
        write(temp.path(), "content/base/notes/readme.toml", "anything");

        let loaded = load_roots(&[temp.path().to_path_buf()]).unwrap();
        assert!(loaded.issues.is_empty());
        let schema = &loaded.content[0];
        let model = Identifier::parse("core:zombie_model").unwrap();
        assert!(schema.asset(AssetType::Model, &model).is_some());
    }

    #[test]
    fn test_content_pack_resources() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "content/base/pack.toml", &manifest("core:base", "1.0.0"));
        write(temp.path(), "content/base/items/torch.toml", "identifier = \"core:torch\"\n");
        write(temp.path(), "content/base/items/torch.png", "png");
        write(temp.path(), "content/base/lang/en.json", "{}");
        write(temp.path(), "content/base/notes/readme.toml", "anything");

        let loaded = load_roots(&[temp.path().to_path_buf()]).unwrap();
        assert!(loaded.issues.is_empty());
        let resources: Vec<&str> = loaded.content[0].resources().iter().map(String::as_str).collect();
        assert_eq!(resources, vec!["items/torch.png", "lang/en.json", "notes/readme.toml"]);
    }

    #[test]
    fn test_bad_files_become_issues() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "content/broken/pack.toml", "[pack");
        write(temp.path(), "content/base/pack.toml", &manifest("core:base", "1.0.0"));
        write(temp.path(), "content/base/items/a.toml", "identifier = \"core:torch\"\n");
        write(temp.path(), "content/base/items/b.toml", "identifier = \"core:torch\"\n");
        write(temp.path(), "content/base/items/c.toml", "identifier = 12\n");

        let loaded = load_roots(&[temp.path().to_path_buf()]).unwrap();
        assert_eq!(loaded.content.len(), 1);
        assert_eq!(loaded.content[0].asset_count(), 1);
        assert_eq!(loaded.issues.len(), 3);

        let duplicate = loaded
            .issues
            .iter()
            .find_map(|issue| match issue {
                LoadIssue::Duplicate { error, .. } => Some(error),
                LoadIssue::File { .. } => None,
            })
            .unwrap();
        assert_eq!(duplicate.kind(), FailureKind::DuplicateIdentifier);
    }
}
