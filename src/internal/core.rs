// SPDX-License-Identifier: MPL-2.0

//! Core state of the solving algorithm: the pool of incompatibilities, the
//! partial solution, unit propagation and conflict resolution.

use std::sync::Arc;

use log::{debug, info};

use crate::internal::incompatibility::{IncompId, Incompatibility, Kind, Relation};
use crate::internal::partial_solution::{PartialSolution, SatisfierSearch};
use crate::package::Package;
use crate::provider::DependencyConstraints;
use crate::report::DerivationTree;
use crate::type_aliases::{Map, Set};
use crate::version::{Version, VersionSet};

/// Current state of the algorithm.
pub(crate) struct State {
    pub(crate) root_package: Package,
    root_version: Version,

    /// All incompatibilities ever created, in insertion order. The pool is
    /// append-only: `IncompId`s are indices into it and derived
    /// incompatibilities reference their parents by id.
    store: Vec<Incompatibility>,

    /// Ids of the incompatibilities mentioning each package.
    by_package: Map<Package, Vec<IncompId>>,

    /// Packages whose incompatibilities must be re-examined, the work queue
    /// of unit propagation.
    propagation_queue: Vec<Package>,

    /// The partial solution.
    pub(crate) partial_solution: PartialSolution,
}

impl State {
    /// Initialization of the algorithm, seeded with the root incompatibility
    /// `{root: not(root == version)}`.
    pub(crate) fn init(root_package: Package, root_version: Version) -> Self {
        let mut state = Self {
            root_package: root_package.clone(),
            root_version,
            store: Vec::new(),
            by_package: Map::default(),
            propagation_queue: Vec::new(),
            partial_solution: PartialSolution::empty(),
        };
        state.add_incompatibility(Incompatibility::not_root(root_package, root_version));
        state
    }

    /// Add an incompatibility to the pool and index it per package.
    pub(crate) fn add_incompatibility(&mut self, incompat: Incompatibility) -> IncompId {
        let id = IncompId(self.store.len());
        debug!("add incompatibility {}: {}", id.0, incompat);
        for (package, _) in incompat.iter() {
            self.by_package.entry(package.clone()).or_default().push(id);
        }
        self.store.push(incompat);
        id
    }

    /// Add one incompatibility per dependency of the given package version.
    pub(crate) fn add_dependency_incompatibilities(
        &mut self,
        package: &Package,
        version: Version,
        dependencies: &DependencyConstraints,
    ) {
        for (dep_package, dep_set) in dependencies {
            // A self-dependency is either trivially satisfied by the version
            // itself or forbids it outright.
            if dep_package == package && dep_set.contains(&version) {
                continue;
            }
            self.add_incompatibility(Incompatibility::from_dependency(
                package.clone(),
                VersionSet::singleton(version),
                (dep_package.clone(), dep_set.clone()),
            ));
        }
    }

    /// Unit propagation is the core mechanism of the solving algorithm.
    ///
    /// For each package in the work queue, revisit all incompatibilities
    /// mentioning it. A fully satisfied incompatibility is a conflict,
    /// recovered through conflict resolution. An almost-satisfied one forces
    /// the negation of its unit term as a new derivation. Iterate to
    /// fixpoint.
    pub(crate) fn unit_propagation(&mut self, package: Package) -> Result<(), Box<DerivationTree>> {
        self.propagation_queue.clear();
        self.propagation_queue.push(package);
        while let Some(current_package) = self.propagation_queue.pop() {
            let mut conflict_id = None;
            if let Some(incompat_ids) = self.by_package.get(&current_package) {
                // Most recently created incompatibilities first, conflicts
                // tend to show up there.
                for &incompat_id in incompat_ids.iter().rev() {
                    let current_incompat = &self.store[incompat_id.0];
                    match self.partial_solution.relation(current_incompat) {
                        Relation::Satisfied => {
                            conflict_id = Some(incompat_id);
                            break;
                        }
                        Relation::AlmostSatisfied(unit_package) => {
                            debug!(
                                "derive {} from incompatibility {}",
                                unit_package, incompat_id.0
                            );
                            self.partial_solution.add_derivation(
                                unit_package.clone(),
                                incompat_id,
                                &self.store,
                            );
                            self.propagation_queue.push(unit_package);
                        }
                        Relation::Contradicted(_) | Relation::Inconclusive => {}
                    }
                }
            }
            if let Some(incompat_id) = conflict_id {
                let (unit_package, root_cause) = self.conflict_resolution(incompat_id)?;
                // The partial solution changed, so the whole queue is stale.
                self.propagation_queue.clear();
                self.propagation_queue.push(unit_package.clone());
                self.partial_solution
                    .add_derivation(unit_package, root_cause, &self.store);
            }
        }
        Ok(())
    }

    /// Conflict-driven clause learning: from a violated incompatibility,
    /// derive the incompatibility to learn and the decision level to
    /// backtrack to. Returns the unit package of the learned clause so
    /// propagation can resume from it.
    fn conflict_resolution(
        &mut self,
        incompatibility: IncompId,
    ) -> Result<(Package, IncompId), Box<DerivationTree>> {
        let mut current_id = incompatibility;
        loop {
            if self.store[current_id.0].is_terminal(&self.root_package, &self.root_version) {
                return Err(Box::new(self.build_derivation_tree(current_id)));
            }
            let (package, search) = self
                .partial_solution
                .satisfier_search(&self.store[current_id.0]);
            match search {
                SatisfierSearch::DifferentDecisionLevels {
                    previous_satisfier_level,
                } => {
                    info!(
                        "learn {} and backtrack to level {}",
                        self.store[current_id.0], previous_satisfier_level.0
                    );
                    self.partial_solution.backtrack(previous_satisfier_level);
                    return Ok((package, current_id));
                }
                SatisfierSearch::SameDecisionLevels { satisfier_cause } => {
                    let prior_cause = Incompatibility::prior_cause(
                        &self.store[current_id.0],
                        &self.store[satisfier_cause.0],
                        &package,
                        (current_id, satisfier_cause),
                    );
                    current_id = self.add_incompatibility(prior_cause);
                }
            }
        }
    }

    /// Build the derivation tree of an incompatibility, the proof carried by
    /// a failed resolution.
    pub(crate) fn build_derivation_tree(&self, incompat: IncompId) -> DerivationTree {
        // Mark incompatibilities referenced from more than one place so the
        // reporter can cite their explanation instead of repeating it.
        let mut ref_count: Map<IncompId, u32> = Map::default();
        let mut stack = vec![incompat];
        while let Some(id) = stack.pop() {
            let count = ref_count.entry(id).or_insert(0);
            *count += 1;
            if *count == 1 {
                if let Kind::DerivedFrom(id1, id2) = &self.store[id.0].kind {
                    stack.push(*id1);
                    stack.push(*id2);
                }
            }
        }
        let shared_ids: Set<usize> = ref_count
            .iter()
            .filter(|(_, &count)| count > 1)
            .map(|(id, _)| id.0)
            .collect();

        // Parents always have smaller ids than the incompatibilities derived
        // from them, so an ascending sweep builds the tree bottom-up.
        let mut ids: Vec<IncompId> = ref_count.into_keys().collect();
        ids.sort();
        let mut precomputed: Map<IncompId, Arc<DerivationTree>> = Map::default();
        for id in ids {
            let tree = self.store[id.0].derivation_tree(id, &shared_ids, &precomputed);
            precomputed.insert(id, Arc::new(tree));
        }
        let root = precomputed
            .remove(&incompat)
            .expect("the requested incompatibility was just built");
        Arc::try_unwrap(root).unwrap_or_else(|arc| (*arc).clone())
    }
}
