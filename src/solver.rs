// SPDX-License-Identifier: MPL-2.0

//! PubGrub version solving algorithm.
//!
//! It consists in efficiently finding a set of packages and versions
//! that satisfy all the constraints of a given project dependencies.
//! In addition, when that is not possible,
//! PubGrub tries to provide a very human-readable and clear
//! explanation as to why that failed.
//!
//! The algorithm alternates unit propagation and decision making, learning
//! new incompatibilities from each conflict so the same dead end is never
//! explored twice, and uses a one-step lookahead when picking versions to
//! avoid most gratuitous backtracking in the first place.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::error::ResolveError;
use crate::internal::core::State;
use crate::internal::incompatibility::Incompatibility;
use crate::package::Package;
use crate::provider::{Dependencies, DependencyProvider};
use crate::term::Term;
use crate::type_aliases::{Map, SelectedDependencies};
use crate::version::{Version, VersionSet};

/// Main function of the library. Finds a set of packages satisfying
/// dependency bounds for a given package and version pair.
pub fn resolve(
    provider: &dyn DependencyProvider,
    package: Package,
    version: impl Into<Version>,
) -> Result<SelectedDependencies, ResolveError> {
    Resolver::new(provider).solve(package, version)
}

/// Configurable entry point of the algorithm.
///
/// One resolver may run any number of independent solves; it holds no state
/// besides its configuration.
pub struct Resolver<'a> {
    provider: &'a dyn DependencyProvider,
    iteration_limit: Option<u64>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver consulting the given dependency provider.
    pub fn new(provider: &'a dyn DependencyProvider) -> Self {
        Self {
            provider,
            iteration_limit: None,
        }
    }

    /// Bound the number of iterations of the main loop, as a guard against
    /// pathological providers. Unbounded by default; exceeding the limit
    /// fails the solve with [ResolveError::IterationLimitExceeded].
    pub fn with_iteration_limit(mut self, limit: u64) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    /// Finds a set of packages satisfying dependency bounds for a given
    /// package and version pair: the named package at exactly that version,
    /// plus one compatible version of every package it transitively depends
    /// on. When no such assignment exists,
    /// [ResolveError::NoSolution] carries the proof.
    pub fn solve(
        &self,
        package: Package,
        version: impl Into<Version>,
    ) -> Result<SelectedDependencies, ResolveError> {
        let root_version = version.into();
        let mut state = State::init(package.clone(), root_version);
        let mut added_dependencies: Map<Package, BTreeSet<Version>> = Map::default();
        let mut next = package;
        let mut iterations: u64 = 0;
        loop {
            if let Some(limit) = self.iteration_limit {
                iterations += 1;
                if iterations > limit {
                    return Err(ResolveError::IterationLimitExceeded { limit });
                }
            }

            info!("unit propagation: {}", next);
            state
                .unit_propagation(next.clone())
                .map_err(ResolveError::NoSolution)?;
            debug!(
                "partial solution after propagation: {}",
                state.partial_solution
            );

            // Complete when no positively constrained package lacks a
            // decision.
            let Some((undecided, set)) = state.partial_solution.pick_next_package() else {
                return Ok(state.partial_solution.extract_solution().collect());
            };
            next = undecided.clone();
            let set = set.clone();

            let Some(decision) = self.choose_candidate(&state, &next, &set)? else {
                info!("no versions of {} satisfy {}", next, set);
                state.add_incompatibility(Incompatibility::no_versions(next.clone(), set));
                continue;
            };

            let is_new = added_dependencies
                .entry(next.clone())
                .or_default()
                .insert(decision);
            if is_new {
                let dependencies = match self.provider.get_dependencies(&next, &decision)? {
                    Dependencies::Unknown => {
                        info!("dependencies of {} {} are unavailable", next, decision);
                        state.add_incompatibility(Incompatibility::unavailable_dependencies(
                            next.clone(),
                            decision,
                        ));
                        continue;
                    }
                    Dependencies::Known(dependencies) => dependencies,
                };
                state.add_dependency_incompatibilities(&next, decision, &dependencies);
            }
            // Dependencies of a revisited version are already in the pool.
            info!("decision: {} {}", next, decision);
            state.partial_solution.add_decision(next.clone(), decision);
        }
    }

    /// Pick a version of `package` within `set`, preferring candidates whose
    /// dependencies do not immediately contradict the partial solution.
    ///
    /// The provider's preference order is honored: its
    /// [choose_version](DependencyProvider::choose_version) hint comes first
    /// (discarded when it lies outside the set), then the remaining matching
    /// versions of [list_versions](DependencyProvider::list_versions). When
    /// the lookahead rejects every candidate, the preferred one is committed
    /// anyway: the lookahead is a heuristic, conflict resolution keeps the
    /// search complete.
    fn choose_candidate(
        &self,
        state: &State,
        package: &Package,
        set: &VersionSet,
    ) -> Result<Option<Version>, ResolveError> {
        let hinted = self
            .provider
            .choose_version(package, set)?
            .filter(|v| set.contains(v));
        let mut candidates: Vec<Version> = Vec::new();
        candidates.extend(hinted);
        for v in self.provider.list_versions(package)? {
            if set.contains(&v) && Some(v) != hinted {
                candidates.push(v);
            }
        }
        for &candidate in &candidates {
            if !self.creates_conflict(state, package, candidate)? {
                return Ok(Some(candidate));
            }
            info!("lookahead rejected {} {}", package, candidate);
        }
        Ok(candidates.first().copied())
    }

    /// One-step lookahead: would deciding `package` at `version` leave one of
    /// its dependencies without any acceptable version?
    fn creates_conflict(
        &self,
        state: &State,
        package: &Package,
        version: Version,
    ) -> Result<bool, ResolveError> {
        let dependencies = match self.provider.get_dependencies(package, &version)? {
            // Unavailability is handled by its own incompatibility once the
            // version is actually picked.
            Dependencies::Unknown => return Ok(false),
            Dependencies::Known(dependencies) => dependencies,
        };
        for (dep_package, dep_set) in &dependencies {
            if dep_package == package {
                if !dep_set.contains(&version) {
                    return Ok(true);
                }
                continue;
            }
            let constraint = Term::Positive(dep_set.clone());
            let combined = match state.partial_solution.term_intersection_for_package(dep_package)
            {
                Some(term) => term.intersection(&constraint),
                None => constraint,
            };
            // The combination of positive requirements stays positive.
            if combined.is_empty() {
                return Ok(true);
            }
            if self
                .provider
                .choose_version(dep_package, combined.unwrap_positive())?
                .is_none()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
