//! Resolve command - discover, validate and compile every pack

use super::{print_issues, print_json, resolve_roots, Resolution};
use anyhow::{bail, Context, Result};
use cairn_pack::{FinalizedPack, PackLock};
use colored::*;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Arguments for the resolve command
#[derive(Debug, Clone, Default)]
pub struct ResolveArgs {
    pub roots: Vec<PathBuf>,
    pub json: bool,
    /// Write a lockfile for the compiled packs
    pub lock: Option<PathBuf>,
    /// Fail on any failure or load issue
    pub strict: bool,
}

pub fn run(args: ResolveArgs) -> Result<()> {
    let resolution = resolve_roots(&args.roots)?;

    if let Some(path) = &args.lock {
        let lock = PackLock::from_registries(&resolution.registries);
        let content = lock.to_string().context("Failed to serialize lockfile")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write lockfile: {}", path.display()))?;
    }

    if args.json {
        print_json(&summary_json(&resolution))?;
    } else {
        print_summary(&resolution);
        if let Some(path) = &args.lock {
            println!("Wrote {}", path.display());
        }
    }

    let problems = resolution.report.failures.len() + resolution.issues.len();
    if args.strict && problems > 0 {
        bail!("Resolution finished with {problems} problem(s)");
    }
    Ok(())
}

fn pack_json(pack: &FinalizedPack) -> serde_json::Value {
    json!({
        "identifier": pack.identifier(),
        "assets": pack.asset_count(),
        "missing": pack.missing_assets(),
        "invalid": pack.invalid_assets().len(),
        "fingerprint": pack.fingerprint(),
    })
}

fn summary_json(resolution: &Resolution) -> serde_json::Value {
    let compiled: Vec<_> = resolution
        .report
        .compiled
        .iter()
        .filter_map(|identifier| resolution.registries.content.get(identifier))
        .map(pack_json)
        .collect();

    json!({
        "compiled": compiled,
        "rejected": resolution.report.rejected,
        "failures": resolution.report.failures,
        "issues": resolution.issues,
    })
}

fn print_summary(resolution: &Resolution) {
    print_issues(&resolution.issues);

    for pack in resolution.registries.content.iter() {
        let mut line = format!(
            "{:>10} {} ({} assets",
            "Compiled".green().bold(),
            pack.identifier(),
            pack.asset_count()
        );
        if pack.missing_count() > 0 {
            line.push_str(&format!(", {} missing", pack.missing_count()));
        }
        if !pack.invalid_assets().is_empty() {
            line.push_str(&format!(", {} invalid", pack.invalid_assets().len()));
        }
        line.push(')');
        println!("{line}");
    }

    for identifier in &resolution.report.rejected {
        println!("{:>10} {identifier}", "Rejected".red().bold());
    }

    for failure in &resolution.report.failures {
        eprintln!("{} {failure}", "error:".red().bold());
    }

    println!(
        "\n{} compiled, {} rejected, {} failure(s)",
        resolution.registries.content.len(),
        resolution.report.rejected.len(),
        resolution.report.failures.len()
    );
}
