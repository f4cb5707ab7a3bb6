//! Asset-level validation within one pack
//!
//! Assets are visited depth-first with an explicit stack. Each asset keeps a
//! `parent_to` list of the assets that descended into it, so a failure can be
//! pushed forward to every dependent without revisiting anything. Assets on
//! the current stack are tracked to report same-pack cycles.

use crate::asset::{AssetMap, AssetReference, AssetSchema, AssetType};
use crate::availability::AvailabilityIndex;
use crate::error::{ResolveError, Subject};
use crate::identifier::Identifier;
use crate::pack::PackSchema;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Per-asset validation state; never leaves Validated or Invalidated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Unprocessed,
    Validated,
    Invalidated,
}

/// Result of validating every asset of a pack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetValidation {
    /// Validated assets only
    pub assets: AssetMap<BTreeMap<Identifier, AssetSchema>>,
    /// Every external reference of a validated asset, keyed by target type
    pub missing: AssetMap<BTreeSet<Identifier>>,
    /// The subset of `missing` every candidate of some declaration provides
    pub external: AssetMap<BTreeSet<Identifier>>,
    /// Invalidated assets in invalidation order
    pub invalid: Vec<(AssetType, Identifier)>,
    pub failures: Vec<ResolveError>,
}

impl AssetValidation {
    pub fn state(&self, asset_type: AssetType, identifier: &Identifier) -> ValidationState {
        if self
            .assets
            .get(&asset_type)
            .is_some_and(|assets| assets.contains_key(identifier))
        {
            ValidationState::Validated
        } else if self
            .invalid
            .iter()
            .any(|(t, id)| *t == asset_type && id == identifier)
        {
            ValidationState::Invalidated
        } else {
            ValidationState::Unprocessed
        }
    }
}

/// Validate every asset of `pack` against its own assets and `index`
pub fn validate_assets(pack: &PackSchema, index: &AvailabilityIndex) -> AssetValidation {
    let mut validator = AssetValidator::new(pack, index);
    for node in 0..validator.nodes.len() {
        validator.validate(node);
    }
    validator.finish()
}

struct Node<'a> {
    schema: &'a AssetSchema,
    state: ValidationState,
    parent_to: Vec<usize>,
    external: Vec<&'a AssetReference>,
}

struct Frame {
    node: usize,
    next: usize,
}

enum Step {
    Satisfied,
    External,
    Descend(usize),
    Cycle(usize),
    Failed(ResolveError),
}

struct AssetValidator<'a> {
    pack: &'a Identifier,
    index: &'a AvailabilityIndex,
    nodes: Vec<Node<'a>>,
    lookup: HashMap<(AssetType, &'a Identifier), usize>,
    invalid: Vec<usize>,
    failures: Vec<ResolveError>,
}

impl<'a> AssetValidator<'a> {
    fn new(pack: &'a PackSchema, index: &'a AvailabilityIndex) -> Self {
        let nodes = pack
            .iter_assets()
            .map(|schema| Node {
                schema,
                state: ValidationState::Unprocessed,
                parent_to: Vec::new(),
                external: Vec::new(),
            })
            .collect();
        let lookup = pack
            .iter_assets()
            .enumerate()
            .map(|(i, schema)| ((schema.asset_type, &schema.identifier), i))
            .collect();

        Self {
            pack: pack.identifier(),
            index,
            nodes,
            lookup,
            invalid: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn validate(&mut self, root: usize) {
        if self.nodes[root].state != ValidationState::Unprocessed {
            return;
        }

        let mut stack = vec![Frame { node: root, next: 0 }];
        let mut on_stack = HashSet::from([root]);

        while let Some(frame) = stack.last() {
            let (current, next) = (frame.node, frame.next);

            // Invalidated from below while waiting on a dependency
            if self.nodes[current].state == ValidationState::Invalidated {
                stack.pop();
                on_stack.remove(&current);
                continue;
            }

            let schema: &'a AssetSchema = self.nodes[current].schema;
            let Some(reference) = schema.dependencies.get(next) else {
                self.nodes[current].state = ValidationState::Validated;
                stack.pop();
                on_stack.remove(&current);
                continue;
            };

            match self.check(current, reference, &on_stack) {
                Step::Satisfied => advance(&mut stack),
                Step::External => {
                    self.nodes[current].external.push(reference);
                    advance(&mut stack);
                }
                Step::Descend(target) => {
                    self.nodes[target].parent_to.push(current);
                    on_stack.insert(target);
                    stack.push(Frame {
                        node: target,
                        next: 0,
                    });
                }
                Step::Cycle(target) => {
                    let start = stack.iter().position(|f| f.node == target).unwrap_or(0);
                    let mut path: Vec<Identifier> = stack[start..]
                        .iter()
                        .map(|f| self.nodes[f.node].schema.identifier.clone())
                        .collect();
                    path.push(self.nodes[target].schema.identifier.clone());

                    self.fail(
                        current,
                        ResolveError::DependencyCycle {
                            subject: self.subject(current),
                            path,
                        },
                    );
                    stack.pop();
                    on_stack.remove(&current);
                }
                Step::Failed(error) => {
                    self.fail(current, error);
                    stack.pop();
                    on_stack.remove(&current);
                }
            }
        }
    }

    fn check(&self, current: usize, reference: &AssetReference, on_stack: &HashSet<usize>) -> Step {
        let missing_layer = |layer: &str| ResolveError::MissingAttributeSet {
            subject: self.subject(current),
            target: reference.identifier.clone(),
            layer: layer.to_string(),
        };
        let unresolved = || ResolveError::UnresolvedDependency {
            subject: self.subject(current),
            dependency: reference.to_string(),
        };

        let key = (reference.asset_type, &reference.identifier);
        if let Some(&target) = self.lookup.get(&key) {
            let node = &self.nodes[target];
            if let Some(layer) = &reference.layer {
                if !node.schema.has_layer(layer) {
                    return Step::Failed(missing_layer(layer));
                }
            }
            if on_stack.contains(&target) {
                return Step::Cycle(target);
            }
            return match node.state {
                ValidationState::Unprocessed => Step::Descend(target),
                ValidationState::Validated => Step::Satisfied,
                ValidationState::Invalidated => Step::Failed(unresolved()),
            };
        }

        match self.index.get(reference.asset_type, &reference.identifier) {
            Some(availability) => match &reference.layer {
                Some(layer) if !availability.has_layer(layer) => Step::Failed(missing_layer(layer)),
                _ => Step::External,
            },
            None => Step::Failed(unresolved()),
        }
    }

    fn fail(&mut self, node: usize, error: ResolveError) {
        debug!("{error}");
        self.failures.push(error);
        self.invalidate(node);
    }

    /// Invalidate `start` and, transitively, every asset depending on it
    fn invalidate(&mut self, start: usize) {
        let mut worklist = vec![start];
        while let Some(node) = worklist.pop() {
            if self.nodes[node].state == ValidationState::Invalidated {
                continue;
            }
            self.nodes[node].state = ValidationState::Invalidated;
            self.invalid.push(node);

            let schema = self.nodes[node].schema;
            debug!(
                "invalidated {} {} in {}",
                schema.asset_type, schema.identifier, self.pack
            );

            worklist.extend(
                self.nodes[node]
                    .parent_to
                    .iter()
                    .copied()
                    .filter(|parent| self.nodes[*parent].state != ValidationState::Invalidated),
            );
        }
    }

    fn subject(&self, node: usize) -> Subject {
        let schema = self.nodes[node].schema;
        Subject::asset(self.pack, schema.asset_type, &schema.identifier)
    }

    fn finish(self) -> AssetValidation {
        let mut result = AssetValidation::default();

        for node in &self.nodes {
            if node.state != ValidationState::Validated {
                continue;
            }
            let schema = node.schema;
            result
                .assets
                .entry(schema.asset_type)
                .or_default()
                .insert(schema.identifier.clone(), schema.clone());

            for reference in &node.external {
                result
                    .missing
                    .entry(reference.asset_type)
                    .or_default()
                    .insert(reference.identifier.clone());
                if self
                    .index
                    .guarantees(reference.asset_type, &reference.identifier)
                {
                    result
                        .external
                        .entry(reference.asset_type)
                        .or_default()
                        .insert(reference.identifier.clone());
                }
            }
        }

        result.invalid = self
            .invalid
            .iter()
            .map(|&node| {
                let schema = self.nodes[node].schema;
                (schema.asset_type, schema.identifier.clone())
            })
            .collect();
        result.failures = self.failures;
        result
    }
}

fn advance(stack: &mut [Frame]) {
    if let Some(frame) = stack.last_mut() {
        frame.next += 1;
    }
}
