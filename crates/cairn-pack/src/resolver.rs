use crate::error::{ResolveError, Scope, Subject};
use crate::finalized::FinalizedPack;
use crate::identifier::Identifier;
use crate::pack::{PackSchema, ResourcePack};
use crate::registry::Registries;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

mod hierarchy;

use hierarchy::{check_version_hierarchy, PackGraph};

/// Outcome of a resolution sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionReport {
    /// Packs compiled and registered, in compile order
    pub compiled: Vec<Identifier>,
    /// Packs that failed validation
    pub rejected: Vec<Identifier>,
    /// Every failure, pack level and asset level
    pub failures: Vec<ResolveError>,
}

impl ResolutionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures attributed to `pack`
    pub fn failures_for<'a>(&'a self, pack: &'a Identifier) -> impl Iterator<Item = &'a ResolveError> {
        self.failures
            .iter()
            .filter(move |failure| failure.pack() == Some(pack))
    }
}

/// Pack-level resolver and compiler
///
/// Tracks three disjoint pools: every submitted pack (`processed`), packs
/// not yet looked at (`unvalidated`) and packs whose dependencies all
/// resolved (`validated`). A pack leaves `unvalidated` before its
/// dependencies are examined and is never returned to it, so each pack is
/// attempted at most once per sweep.
#[derive(Debug, Default)]
pub struct PackResolver {
    processed: BTreeMap<Identifier, PackSchema>,
    unvalidated: BTreeSet<Identifier>,
    validated: BTreeSet<Identifier>,
    report: ResolutionReport,
}

impl PackResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register resources, submit content, then validate and compile
    pub fn process<R, C>(
        &mut self,
        registries: &mut Registries,
        resources: R,
        content: C,
    ) -> &ResolutionReport
    where
        R: IntoIterator<Item = ResourcePack>,
        C: IntoIterator<Item = PackSchema>,
    {
        for pack in resources {
            // Already recorded in the report
            let _ = self.add_resource(registries, pack);
        }

        let mut submitted = false;
        for pack in content {
            submitted |= self.add_content(registries, pack).is_ok();
        }

        if submitted {
            self.compile(registries);
        }
        &self.report
    }

    /// Register a resource pack; resources resolve eagerly
    pub fn add_resource(
        &mut self,
        registries: &mut Registries,
        pack: ResourcePack,
    ) -> Result<(), ResolveError> {
        let identifier = pack.identifier().clone();
        if !registries.resources.register(pack) {
            let error = ResolveError::DuplicateIdentifier {
                scope: Scope::ResourcePacks,
                identifier,
            };
            self.record(error.clone());
            return Err(error);
        }

        debug!("registered resource pack {identifier}");
        Ok(())
    }

    /// Submit a content pack for validation
    pub fn add_content(
        &mut self,
        registries: &Registries,
        pack: PackSchema,
    ) -> Result<(), ResolveError> {
        let identifier = pack.identifier().clone();
        if self.processed.contains_key(&identifier) || registries.content.contains(&identifier) {
            let error = ResolveError::DuplicateIdentifier {
                scope: Scope::ContentPacks,
                identifier,
            };
            self.record(error.clone());
            return Err(error);
        }

        debug!("submitted content pack {identifier}");
        self.unvalidated.insert(identifier.clone());
        self.processed.insert(identifier, pack);
        Ok(())
    }

    /// Validate every unvalidated pack
    ///
    /// Failed packs are dropped for the rest of the sweep; the sweep itself
    /// always runs to completion.
    pub fn validate(&mut self, registries: &Registries) {
        while let Some(identifier) = self.unvalidated.first().cloned() {
            if let Err(error) = self.validate_content(&identifier, registries) {
                self.reject(&identifier, error);
            }
        }
    }

    fn validate_content(
        &mut self,
        identifier: &Identifier,
        registries: &Registries,
    ) -> Result<(), ResolveError> {
        self.unvalidated.remove(identifier);

        let Some(schema) = self.processed.get(identifier) else {
            return Ok(());
        };
        let asset_dependencies: Vec<_> = schema.asset_dependencies().cloned().collect();
        let resource_dependencies: Vec<_> = schema.resource_dependencies().cloned().collect();

        for dependency in &asset_dependencies {
            let mut satisfied = !registries.content.matches(dependency).is_empty()
                || !dependency.matches(&self.validated).is_empty();

            for candidate in dependency.matches(&self.unvalidated) {
                // A sibling recursion may have settled it already
                if !self.unvalidated.contains(&candidate) {
                    satisfied |= self.validated.contains(&candidate);
                    continue;
                }

                match self.validate_content(&candidate, registries) {
                    Ok(()) => satisfied = true,
                    Err(error) => self.reject(&candidate, error),
                }
            }

            if !satisfied {
                return Err(ResolveError::UnresolvedDependency {
                    subject: Subject::pack(identifier),
                    dependency: dependency.to_string(),
                });
            }

            let graph = PackGraph {
                processed: &self.processed,
                finalized: &registries.content,
            };
            check_version_hierarchy(identifier, dependency, &graph)?;
        }

        for dependency in &resource_dependencies {
            if registries.resources.matches(dependency).is_empty() {
                return Err(ResolveError::UnresolvedDependency {
                    subject: Subject::pack(identifier),
                    dependency: format!("resource {dependency}"),
                });
            }
        }

        debug!("validated {identifier}");
        self.validated.insert(identifier.clone());
        Ok(())
    }

    /// Compile every validated pack, dependencies first
    ///
    /// Runs validation first if anything is still pending.
    pub fn compile(&mut self, registries: &mut Registries) {
        if !self.unvalidated.is_empty() {
            self.validate(registries);
        }

        while let Some(identifier) = self.validated.first().cloned() {
            self.compile_pack(&identifier, registries);
        }
    }

    fn compile_pack(&mut self, identifier: &Identifier, registries: &mut Registries) {
        if !self.validated.remove(identifier) {
            return;
        }
        let Some(schema) = self.processed.get(identifier) else {
            return;
        };

        let pending: BTreeSet<Identifier> = schema
            .asset_dependencies()
            .flat_map(|dependency| dependency.matches(&self.validated))
            .collect();
        for dependency in &pending {
            self.compile_pack(dependency, registries);
        }

        let Some(schema) = self.processed.get(identifier) else {
            return;
        };
        let pack = FinalizedPack::compile(schema, registries);

        if pack.invalid_assets().is_empty() {
            info!(
                "compiled {identifier} ({} assets, {} missing)",
                pack.asset_count(),
                pack.missing_count()
            );
        } else {
            warn!(
                "compiled {identifier} ({} assets, {} missing, {} invalid)",
                pack.asset_count(),
                pack.missing_count(),
                pack.invalid_assets().len()
            );
        }

        self.report.failures.extend(pack.failures().iter().cloned());
        self.report.compiled.push(identifier.clone());
        registries.content.register(pack);
    }

    fn reject(&mut self, identifier: &Identifier, error: ResolveError) {
        warn!("rejected {identifier}: {error}");
        self.report.rejected.push(identifier.clone());
        self.report.failures.push(error);
    }

    fn record(&mut self, error: ResolveError) {
        warn!("{error}");
        self.report.failures.push(error);
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }

    pub fn into_report(self) -> ResolutionReport {
        self.report
    }

    /// Every submitted pack, whatever became of it
    pub fn processed(&self) -> impl Iterator<Item = &Identifier> {
        self.processed.keys()
    }

    pub fn is_validated(&self, identifier: &Identifier) -> bool {
        self.validated.contains(identifier)
    }

    pub fn is_unvalidated(&self, identifier: &Identifier) -> bool {
        self.unvalidated.contains(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{PackDependency, VersionPredicate};
    use crate::error::FailureKind;
    use crate::pack::PackMetadata;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).unwrap()
    }

    fn schema(identifier: &str, dependencies: &[(&str, &str)]) -> PackSchema {
        let mut schema = PackSchema::new(PackMetadata::new(id(identifier), "Test").unwrap());
        for (target, predicate) in dependencies {
            schema
                .add_dependency(PackDependency::asset(
                    &id(target),
                    VersionPredicate::parse(predicate).unwrap(),
                ))
                .unwrap();
        }
        schema
    }

    #[test]
    fn test_validate_moves_pack_between_pools() {
        let registries = Registries::new();
        let mut resolver = PackResolver::new();
        resolver.add_content(&registries, schema("core:base@1.0.0", &[])).unwrap();
        assert!(resolver.is_unvalidated(&id("core:base@1.0.0")));

        resolver.validate(&registries);
        assert!(!resolver.is_unvalidated(&id("core:base@1.0.0")));
        assert!(resolver.is_validated(&id("core:base@1.0.0")));
    }

    #[test]
    fn test_dependency_validated_depth_first() {
        let mut registries = Registries::new();
        let mut resolver = PackResolver::new();
        // "app:game" is popped first and must pull "core:base" in ahead of itself
        resolver.add_content(&registries, schema("app:game@1.0.0", &[("core:base", "*")])).unwrap();
        resolver.add_content(&registries, schema("core:base@1.0.0", &[])).unwrap();

        resolver.compile(&mut registries);
        assert_eq!(
            resolver.report().compiled,
            vec![id("core:base@1.0.0"), id("app:game@1.0.0")]
        );
        assert!(resolver.report().is_clean());
    }

    #[test]
    fn test_duplicate_content_rejected() {
        let registries = Registries::new();
        let mut resolver = PackResolver::new();
        resolver.add_content(&registries, schema("core:base@1.0.0", &[])).unwrap();
        let err = resolver
            .add_content(&registries, schema("core:base@1.0.0", &[]))
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::DuplicateIdentifier);
        assert_eq!(resolver.processed().count(), 1);
    }

    #[test]
    fn test_failed_candidate_recorded_once() {
        let mut registries = Registries::new();
        let mut resolver = PackResolver::new();
        resolver.add_content(&registries, schema("core:base@1.0.0", &[("core:absent", "*")])).unwrap();
        resolver.add_content(&registries, schema("mod:extra@1.0.0", &[("core:base", "*")])).unwrap();

        resolver.compile(&mut registries);
        let report = resolver.report();
        assert!(report.compiled.is_empty());
        assert_eq!(
            report.rejected,
            vec![id("core:base@1.0.0"), id("mod:extra@1.0.0")]
        );
        assert_eq!(report.failures_for(&id("core:base@1.0.0")).count(), 1);
    }
}
