//! Verify command - compare a lockfile with a fresh resolution

use super::{print_issues, print_json, resolve_roots};
use anyhow::{anyhow, bail, Context, Result};
use cairn_pack::{LockDrift, PackLock};
use colored::*;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

pub fn run(roots: &[PathBuf], lockfile: &Path, json: bool) -> Result<()> {
    let content = fs::read_to_string(lockfile)
        .with_context(|| format!("Failed to read lockfile: {}", lockfile.display()))?;
    let lock = PackLock::from_str(&content)
        .with_context(|| format!("Failed to parse lockfile: {}", lockfile.display()))?;
    lock.verify().map_err(|e| anyhow!("{}: {e}", lockfile.display()))?;

    let resolution = resolve_roots(roots)?;
    let drift = lock.drift(&resolution.registries);

    if json {
        let entries: Vec<String> = drift.iter().map(ToString::to_string).collect();
        print_json(&json!({
            "lockfile": lockfile,
            "up_to_date": drift.is_empty(),
            "drift": entries,
        }))?;
    } else {
        print_issues(&resolution.issues);
        for entry in &drift {
            let label = match entry {
                LockDrift::Added(_) => "added".green(),
                LockDrift::Removed(_) => "removed".red(),
                LockDrift::Changed { .. } => "changed".yellow(),
            };
            println!("{label:>10} {}", describe(entry));
        }
        if drift.is_empty() {
            println!("{} {} is up to date", "ok:".green().bold(), lockfile.display());
        }
    }

    if !drift.is_empty() {
        bail!("Lockfile {} is out of date ({} change(s))", lockfile.display(), drift.len());
    }
    Ok(())
}

/// Drift line without the leading verb
fn describe(entry: &LockDrift) -> String {
    let text = entry.to_string();
    match text.split_once(' ') {
        Some((_, rest)) => rest.to_string(),
        None => text,
    }
}
