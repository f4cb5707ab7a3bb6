//! Inspect command - show one compiled pack

use super::{parse_pack_id, print_issues, print_json, resolve_roots};
use anyhow::Result;
use cairn_pack::FinalizedPack;
use colored::*;
use serde_json::json;
use std::path::PathBuf;

pub fn run(roots: &[PathBuf], pack: &str, json: bool) -> Result<()> {
    let identifier = parse_pack_id(pack)?;
    let resolution = resolve_roots(roots)?;
    let pack = resolution.compiled(&identifier)?;

    if json {
        return print_json(&json!({
            "pack": pack,
            "fingerprint": pack.fingerprint(),
        }));
    }

    print_issues(&resolution.issues);
    print_pack(pack);
    Ok(())
}

fn print_pack(pack: &FinalizedPack) {
    let metadata = pack.metadata();
    println!("{} {}", metadata.name.bold(), pack.identifier());
    println!("  {}", metadata.description_or_unlisted());
    if !metadata.authors.is_empty() {
        println!("  authors: {}", metadata.authors.join(", "));
    }
    println!("  fingerprint: {}", pack.fingerprint());

    if !pack.dependencies().is_empty() {
        println!("\n{}", "Dependencies".bold());
        for dependency in pack.dependencies() {
            println!("  {} {dependency}", dependency.kind());
        }
        for bound in pack.asset_dependencies().iter().chain(pack.resource_dependencies()) {
            println!("  -> {bound}");
        }
    }

    println!("\n{}", "Assets".bold());
    if pack.assets().is_empty() {
        println!("  (none)");
    }
    for (asset_type, assets) in pack.assets() {
        println!("  {asset_type} ({})", assets.len());
        for identifier in assets.keys() {
            println!("    {identifier}");
        }
    }

    if !pack.resources().is_empty() {
        println!("\n{}", "Resources".bold());
        for resource in pack.resources() {
            println!("  {resource}");
        }
    }

    if pack.missing_count() > 0 {
        println!("\n{}", "Missing".yellow().bold());
        for (asset_type, identifiers) in pack.missing_assets() {
            for identifier in identifiers {
                println!("  {asset_type} {identifier}");
            }
        }
    }

    if !pack.invalid_assets().is_empty() {
        println!("\n{}", "Invalid".red().bold());
        for (asset_type, identifier) in pack.invalid_assets() {
            println!("  {asset_type} {identifier}");
        }
        for failure in pack.failures() {
            println!("  {} {failure}", "error:".red());
        }
    }
}
