//! End-to-end resolver scenarios over small pack graphs

use cairn_pack::{
    AssetReference, AssetSchema, AssetType, FailureKind, FinalizedPack, Identifier, PackDependency,
    PackMetadata, PackResolver, PackSchema, Registries, ResolveError, ResourcePack,
    VersionPredicate,
};
use pretty_assertions::assert_eq;

fn id(s: &str) -> Identifier {
    Identifier::parse(s).unwrap()
}

// Test helper: content pack with asset dependencies
fn pack(identifier: &str, dependencies: &[(&str, &str)]) -> PackSchema {
    let mut schema = PackSchema::new(PackMetadata::new(id(identifier), "Test Pack").unwrap());
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

fn with_assets(mut schema: PackSchema, assets: Vec<AssetSchema>) -> PackSchema {
    for asset in assets {
        schema.add_asset(asset).unwrap();
    }
    schema
}

fn asset(asset_type: AssetType, identifier: &str) -> AssetSchema {
    AssetSchema::new(asset_type, id(identifier))
}

fn reference(asset_type: AssetType, identifier: &str) -> AssetReference {
    AssetReference::new(asset_type, id(identifier))
}

fn resolve(packs: Vec<PackSchema>) -> (Registries, cairn_pack::ResolutionReport) {
    let mut registries = Registries::new();
    let mut resolver = PackResolver::new();
    resolver.process(&mut registries, Vec::new(), packs);
    (registries, resolver.into_report())
}

fn core_base() -> PackSchema {
    with_assets(
        pack("core:base@1.0.0", &[]),
        vec![
            asset(AssetType::Model, "core:zombie_model"),
            asset(AssetType::Entity, "core:zombie")
                .with_dependency(reference(AssetType::Model, "core:zombie_model")),
        ],
    )
}

#[test]
fn test_local_dependency_compiles() {
    let (registries, report) = resolve(vec![core_base()]);
    assert!(report.is_clean());

    let base = registries.content.get(&id("core:base@1.0.0")).unwrap();
    assert!(base.contains_asset(AssetType::Entity, &id("core:zombie")));
    assert!(base.contains_asset(AssetType::Model, &id("core:zombie_model")));
    assert_eq!(base.missing_of(AssetType::Model).count(), 0);
    assert_eq!(base.missing_count(), 0);
}

#[test]
fn test_duplicate_asset_keeps_first() {
    let mut schema = pack("core:base@1.0.0", &[]);
    let first = asset(AssetType::Item, "core:torch").with_attributes(toml::toml! { light = 14 });
    let second = asset(AssetType::Item, "core:torch").with_attributes(toml::toml! { light = 0 });

    schema.add_asset(first.clone()).unwrap();
    let err = schema.add_asset(second).unwrap_err();
    assert_eq!(err.kind(), FailureKind::DuplicateIdentifier);

    let (registries, _) = resolve(vec![schema]);
    let base = registries.content.get(&id("core:base@1.0.0")).unwrap();
    assert_eq!(base.get_asset(AssetType::Item, &id("core:torch")), Some(&first));
}

#[test]
fn test_same_identifier_different_types() {
    let schema = with_assets(
        pack("core:base@1.0.0", &[]),
        vec![
            asset(AssetType::Item, "core:torch"),
            asset(AssetType::Model, "core:torch"),
        ],
    );
    assert_eq!(schema.asset_count(), 2);
}

#[test]
fn test_missing_candidate_leaves_pack_unresolved() {
    let (registries, report) = resolve(vec![pack("mod:extra@1.0.0", &[("core:base", "=1.0.0")])]);

    assert!(registries.content.is_empty());
    assert_eq!(report.rejected, vec![id("mod:extra@1.0.0")]);
    assert!(matches!(
        report.failures.as_slice(),
        [ResolveError::UnresolvedDependency { .. }]
    ));
}

#[test]
fn test_removing_only_candidate() {
    let graph = || {
        vec![
            pack("core:base@1.0.0", &[]),
            pack("mod:extra@1.0.0", &[("core:base", ">=1.0.0, <2.0.0")]),
        ]
    };

    let (registries, _) = resolve(graph());
    assert!(registries.content.contains(&id("mod:extra@1.0.0")));

    let reduced: Vec<_> = graph()
        .into_iter()
        .filter(|p| p.identifier() != &id("core:base@1.0.0"))
        .collect();
    let (registries, report) = resolve(reduced);
    assert!(!registries.content.contains(&id("mod:extra@1.0.0")));
    assert_eq!(report.rejected, vec![id("mod:extra@1.0.0")]);
}

#[test]
fn test_version_hierarchy_violation() {
    // a@2 -> b@1 -> a@3: b sits between two versions of a
    let (registries, report) = resolve(vec![
        pack("core:a@2.0.0", &[("core:b", "=1.0.0")]),
        pack("core:b@1.0.0", &[("core:a", "^3.0.0")]),
        pack("core:a@3.0.0", &[]),
    ]);

    assert_eq!(report.rejected, vec![id("core:a@2.0.0")]);
    let failing_id = id("core:a@2.0.0");
    let failure = report.failures_for(&failing_id).next().unwrap();
    assert_eq!(failure.kind(), FailureKind::VersionHierarchyViolation);

    assert!(registries.content.contains(&id("core:a@3.0.0")));
    assert!(registries.content.contains(&id("core:b@1.0.0")));
    assert!(!registries.content.contains(&id("core:a@2.0.0")));
}

#[test]
fn test_older_version_in_hierarchy_allowed() {
    let (registries, report) = resolve(vec![
        pack("core:a@2.0.0", &[("core:b", "=1.0.0")]),
        pack("core:b@1.0.0", &[("core:a", "^1.0.0")]),
        pack("core:a@1.0.0", &[]),
    ]);

    assert!(report.is_clean());
    assert_eq!(registries.content.len(), 3);
}

#[test]
fn test_failure_cascades_to_dependents() {
    let (registries, report) = resolve(vec![
        pack("core:base@1.0.0", &[("core:absent", "*")]),
        pack("mod:extra@1.0.0", &[("core:base", "*")]),
        pack("mod:addon@1.0.0", &[("mod:extra", "*")]),
    ]);

    assert!(registries.content.is_empty());
    assert_eq!(report.rejected.len(), 3);
    assert!(report
        .failures
        .iter()
        .all(|f| f.kind() == FailureKind::UnresolvedDependency));
}

#[test]
fn test_any_candidate_satisfies_dependency() {
    // core:base@2 fails on its own, core:base@1 still satisfies the range
    let (registries, report) = resolve(vec![
        pack("core:base@1.0.0", &[]),
        pack("core:base@2.0.0", &[("core:absent", "*")]),
        pack("mod:extra@1.0.0", &[("core:base", ">=1.0.0")]),
    ]);

    assert_eq!(report.rejected, vec![id("core:base@2.0.0")]);
    let extra = registries.content.get(&id("mod:extra@1.0.0")).unwrap();
    assert_eq!(
        extra.asset_dependencies().iter().cloned().collect::<Vec<_>>(),
        vec![id("core:base@1.0.0")]
    );
}

#[test]
fn test_partial_candidate_coverage_is_missing() {
    let base_v1 = with_assets(
        pack("core:base@1.0.0", &[]),
        vec![asset(AssetType::Item, "core:torch")],
    );
    let base_v2 = with_assets(
        pack("core:base@2.0.0", &[]),
        vec![asset(AssetType::Item, "core:lantern")],
    );
    let extra = with_assets(
        pack("mod:extra@1.0.0", &[("core:base", ">=1.0.0")]),
        vec![asset(AssetType::Recipe, "mod:torch_bundle")
            .with_dependency(reference(AssetType::Item, "core:torch"))],
    );

    let (registries, report) = resolve(vec![extra, base_v1, base_v2]);
    assert!(report.is_clean());

    let extra = registries.content.get(&id("mod:extra@1.0.0")).unwrap();
    assert!(extra.contains_asset(AssetType::Recipe, &id("mod:torch_bundle")));
    assert_eq!(
        extra.missing_of(AssetType::Item).cloned().collect::<Vec<_>>(),
        vec![id("core:torch")]
    );
    assert!(extra.external_assets().is_empty());

    let v1 = registries.content.get(&id("core:base@1.0.0")).unwrap();
    let v2 = registries.content.get(&id("core:base@2.0.0")).unwrap();
    assert!(extra.remaining_missing([v1]).is_empty());
    assert!(extra.satisfies_missing([v1]));

    let remaining = extra.remaining_missing([v2]);
    assert!(remaining[&AssetType::Item].contains(&id("core:torch")));
}

#[test]
fn test_full_candidate_coverage_is_external_and_missing() {
    let extra = with_assets(
        pack("mod:extra@1.0.0", &[("core:base", "^1.0.0")]),
        vec![asset(AssetType::Entity, "mod:husk")
            .with_dependency(reference(AssetType::Model, "core:zombie_model"))],
    );

    let (registries, report) = resolve(vec![core_base(), extra]);
    assert!(report.is_clean());

    let extra = registries.content.get(&id("mod:extra@1.0.0")).unwrap();
    assert_eq!(
        extra.missing_of(AssetType::Model).cloned().collect::<Vec<_>>(),
        vec![id("core:zombie_model")]
    );
    assert!(extra.external_assets()[&AssetType::Model].contains(&id("core:zombie_model")));

    let base = registries.content.get(&id("core:base@1.0.0")).unwrap();
    assert!(extra.satisfies_missing([base]));
}

#[test]
fn test_guaranteed_reference_stays_outstanding_without_providers() {
    let base = with_assets(
        pack("core:base@1.0.0", &[]),
        vec![asset(AssetType::Item, "core:stone")],
    );
    let extra = with_assets(
        pack("mod:extra@1.0.0", &[("core:base", ">=1.0.0")]),
        vec![asset(AssetType::LootTable, "mod:quarry")
            .with_dependency(reference(AssetType::Item, "core:stone"))],
    );

    let (registries, report) = resolve(vec![base, extra]);
    assert!(report.is_clean());

    let extra = registries.content.get(&id("mod:extra@1.0.0")).unwrap();
    let remaining = extra.remaining_missing(std::iter::empty::<&FinalizedPack>());
    assert!(remaining[&AssetType::Item].contains(&id("core:stone")));
    assert!(!extra.satisfies_missing(std::iter::empty::<&FinalizedPack>()));
}

#[test]
fn test_missing_external_layer_invalidates_asset() {
    let base = with_assets(
        pack("core:base@1.0.0", &[]),
        vec![asset(AssetType::Model, "core:zombie_model").with_layer("baby", toml::Table::new())],
    );
    let extra = with_assets(
        pack("mod:extra@1.0.0", &[("core:base", "*")]),
        vec![
            asset(AssetType::Entity, "mod:small_zombie").with_dependency(
                reference(AssetType::Model, "core:zombie_model").with_layer("baby"),
            ),
            asset(AssetType::Entity, "mod:giant_zombie").with_dependency(
                reference(AssetType::Model, "core:zombie_model").with_layer("giant"),
            ),
        ],
    );

    let (registries, report) = resolve(vec![base, extra]);
    let extra = registries.content.get(&id("mod:extra@1.0.0")).unwrap();

    assert!(extra.contains_asset(AssetType::Entity, &id("mod:small_zombie")));
    assert!(!extra.contains_asset(AssetType::Entity, &id("mod:giant_zombie")));
    assert_eq!(
        extra.invalid_assets(),
        &[(AssetType::Entity, id("mod:giant_zombie"))]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind(), FailureKind::MissingAttributeSet);
}

#[test]
fn test_resource_dependency() {
    let mut schema = pack("core:base@1.0.0", &[]);
    schema
        .add_dependency(PackDependency::resource(
            &id("core:textures"),
            VersionPredicate::parse(">=1.0.0").unwrap(),
        ))
        .unwrap();

    let textures = ResourcePack::new(PackMetadata::new(id("core:textures@1.2.0"), "Textures").unwrap())
        .with_resources(["textures/zombie.png"]);

    let mut registries = Registries::new();
    let mut resolver = PackResolver::new();
    let report = resolver.process(&mut registries, vec![textures], vec![schema.clone()]);
    assert!(report.is_clean());

    let base = registries.content.get(&id("core:base@1.0.0")).unwrap();
    assert!(base.resource_dependencies().contains(&id("core:textures@1.2.0")));

    // Same pack without the resource pack present
    let (registries, report) = resolve(vec![schema]);
    assert!(registries.content.is_empty());
    assert!(report.failures[0].to_string().contains("resource"));
}

#[test]
fn test_duplicate_resource_pack_rejected() {
    let textures = || {
        ResourcePack::new(PackMetadata::new(id("core:textures@1.0.0"), "Textures").unwrap())
    };

    let mut registries = Registries::new();
    let mut resolver = PackResolver::new();
    let report = resolver.process(&mut registries, vec![textures(), textures()], Vec::new());

    assert_eq!(registries.resources.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind(), FailureKind::DuplicateIdentifier);
}

#[test]
fn test_resubmitting_compiled_pack_rejected() {
    let mut registries = Registries::new();
    let mut resolver = PackResolver::new();
    resolver.process(&mut registries, Vec::new(), vec![core_base()]);

    let mut second = PackResolver::new();
    let err = second.add_content(&registries, core_base()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::DuplicateIdentifier);
}

#[test]
fn test_later_sweep_sees_earlier_registry() {
    let mut registries = Registries::new();
    PackResolver::new().process(&mut registries, Vec::new(), vec![core_base()]);

    let extra = with_assets(
        pack("mod:extra@1.0.0", &[("core:base", "*")]),
        vec![asset(AssetType::Entity, "mod:husk")
            .with_dependency(reference(AssetType::Model, "core:zombie_model"))],
    );
    let mut resolver = PackResolver::new();
    let report = resolver.process(&mut registries, Vec::new(), vec![extra]);

    assert!(report.is_clean());
    assert_eq!(report.compiled, vec![id("mod:extra@1.0.0")]);
}

#[test]
fn test_fingerprint_independent_of_submission_order() {
    let graph = || {
        vec![
            core_base(),
            with_assets(
                pack("mod:extra@1.0.0", &[("core:base", "*")]),
                vec![
                    asset(AssetType::Item, "mod:bone")
                        .with_attributes(toml::toml! { stack = 64 }),
                    asset(AssetType::LootTable, "mod:husk_drops")
                        .with_dependency(reference(AssetType::Item, "mod:bone")),
                ],
            ),
        ]
    };

    let (first, _) = resolve(graph());
    let (second, _) = resolve(graph().into_iter().rev().collect());

    for pack in first.content.iter() {
        let other = second.content.get(pack.identifier()).unwrap();
        assert_eq!(pack.fingerprint(), other.fingerprint());
        assert_eq!(pack.assets(), other.assets());
    }
    assert_eq!(first.content.len(), second.content.len());
}
