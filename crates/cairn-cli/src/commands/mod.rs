pub mod inspect;
pub mod missing;
pub mod resolve;
pub mod verify;

use crate::loader::{self, LoadIssue};
use anyhow::{bail, Context, Result};
use cairn_pack::{FinalizedPack, Identifier, PackResolver, Registries, ResolutionReport};
use colored::*;
use std::path::PathBuf;

/// A full resolution run over a set of roots
pub struct Resolution {
    pub registries: Registries,
    pub report: ResolutionReport,
    pub issues: Vec<LoadIssue>,
}

impl Resolution {
    /// A compiled pack, or an error explaining why there is none
    pub fn compiled(&self, identifier: &Identifier) -> Result<&FinalizedPack> {
        if let Some(pack) = self.registries.content.get(identifier) {
            return Ok(pack);
        }

        if self.report.rejected.contains(identifier) {
            let reasons: Vec<String> = self
                .report
                .failures_for(identifier)
                .map(ToString::to_string)
                .collect();
            bail!("Pack {identifier} was rejected: {}", reasons.join("; "));
        }
        bail!("Pack {identifier} not found")
    }
}

/// Discover, validate and compile every pack below `roots`
pub fn resolve_roots(roots: &[PathBuf]) -> Result<Resolution> {
    let loaded = loader::load_roots(roots)?;

    let mut registries = Registries::new();
    let mut resolver = PackResolver::new();
    resolver.process(&mut registries, loaded.resources, loaded.content);

    Ok(Resolution {
        registries,
        report: resolver.into_report(),
        issues: loaded.issues,
    })
}

/// Parse a versioned pack identifier given on the command line
pub fn parse_pack_id(text: &str) -> Result<Identifier> {
    let identifier =
        Identifier::parse(text).with_context(|| format!("Invalid pack identifier: {text}"))?;
    if identifier.is_generic() {
        bail!("Pack identifier '{text}' needs a version, e.g. {text}@1.0.0");
    }
    Ok(identifier)
}

pub(crate) fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

pub(crate) fn print_issues(issues: &[LoadIssue]) {
    for issue in issues {
        eprintln!("{} {issue}", "warning:".yellow().bold());
    }
}
