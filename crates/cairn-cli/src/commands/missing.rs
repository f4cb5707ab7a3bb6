//! Missing command - check which deferred assets a chosen pack set leaves open

use super::{parse_pack_id, print_issues, print_json, resolve_roots};
use anyhow::{bail, Result};
use cairn_pack::FinalizedPack;
use colored::*;
use serde_json::json;
use std::path::PathBuf;

pub fn run(roots: &[PathBuf], pack: &str, with: &[String], json: bool) -> Result<()> {
    let identifier = parse_pack_id(pack)?;
    let chosen = with
        .iter()
        .map(String::as_str)
        .map(parse_pack_id)
        .collect::<Result<Vec<_>>>()?;

    let resolution = resolve_roots(roots)?;
    let pack = resolution.compiled(&identifier)?;
    let providers = chosen
        .iter()
        .map(|identifier| resolution.compiled(identifier))
        .collect::<Result<Vec<&FinalizedPack>>>()?;

    let remaining = pack.remaining_missing(providers.iter().copied());
    let count: usize = remaining.values().map(|ids| ids.len()).sum();

    if json {
        print_json(&json!({
            "pack": identifier,
            "with": chosen,
            "missing": pack.missing_assets(),
            "remaining": remaining,
        }))?;
    } else {
        print_issues(&resolution.issues);
        if count == 0 {
            println!(
                "{} every missing asset of {identifier} is provided ({} checked)",
                "ok:".green().bold(),
                pack.missing_count()
            );
        } else {
            for (asset_type, identifiers) in &remaining {
                for missing in identifiers {
                    println!("{:>10} {asset_type} {missing}", "Missing".yellow().bold());
                }
            }
        }
    }

    if count > 0 {
        bail!("{count} missing asset(s) of {identifier} not provided");
    }
    Ok(())
}
