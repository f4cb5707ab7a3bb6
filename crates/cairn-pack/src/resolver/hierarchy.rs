//! Version hierarchy check
//!
//! A pack's transitive asset dependencies must never lead back to a version
//! of the pack itself that is not strictly older. This is what keeps a
//! dependency cycle from hiding behind version numbers.

use crate::dependency::PackDependency;
use crate::error::ResolveError;
use crate::finalized::FinalizedPack;
use crate::identifier::Identifier;
use crate::pack::PackSchema;
use crate::registry::PackRegistry;
use std::collections::{BTreeMap, BTreeSet};

/// Where to look up a pack's declarations during the walk
pub(crate) struct PackGraph<'a> {
    pub processed: &'a BTreeMap<Identifier, PackSchema>,
    pub finalized: &'a PackRegistry<FinalizedPack>,
}

impl PackGraph<'_> {
    fn candidates(&self, dependency: &PackDependency) -> BTreeSet<Identifier> {
        let mut candidates = dependency.matches(self.processed.keys());
        candidates.extend(self.finalized.matches(dependency));
        candidates
    }

    fn asset_declarations(&self, pack: &Identifier) -> Vec<&PackDependency> {
        if let Some(schema) = self.processed.get(pack) {
            schema.asset_dependencies().collect()
        } else if let Some(finalized) = self.finalized.get(pack) {
            finalized
                .dependencies()
                .iter()
                .filter(|d| d.kind() == crate::dependency::DependencyKind::Asset)
                .collect()
        } else {
            Vec::new()
        }
    }
}

/// Walk everything reachable through `dependency` and reject declarations
/// that could select `requester` at its own version or later
pub(crate) fn check_version_hierarchy(
    requester: &Identifier,
    dependency: &PackDependency,
    graph: &PackGraph<'_>,
) -> Result<(), ResolveError> {
    let Some(version) = requester.version() else {
        return Ok(());
    };

    let mut visited: BTreeSet<Identifier> = BTreeSet::new();
    let mut worklist: Vec<Identifier> = graph.candidates(dependency).into_iter().collect();

    while let Some(pack) = worklist.pop() {
        if !visited.insert(pack.clone()) {
            continue;
        }

        for declaration in graph.asset_declarations(&pack) {
            if declaration.compatible(requester) && !declaration.lies_below(version) {
                return Err(ResolveError::VersionHierarchyViolation {
                    requester: requester.clone(),
                    dependency: dependency.to_string(),
                    offending: format!("{pack} -> {declaration}"),
                });
            }

            worklist.extend(
                graph
                    .candidates(declaration)
                    .into_iter()
                    .filter(|candidate| !visited.contains(candidate)),
            );
        }
    }

    Ok(())
}
