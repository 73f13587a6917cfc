// SPDX-License-Identifier: MPL-2.0

//! The partial solution is the ordered log of assignments made so far,
//! decisions and derivations alike, dated by decision level.

use std::fmt::{self, Display};
use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHasher;

use crate::internal::incompatibility::{IncompId, Incompatibility, Relation};
use crate::package::Package;
use crate::term::Term;
use crate::type_aliases::Map;
use crate::version::{Version, VersionSet};

type FnvIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Decision levels scope backtracking: each decision opens a new level and
/// `backtrack` drops everything above a target level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct DecisionLevel(pub(crate) u32);

impl DecisionLevel {
    pub(crate) fn increment(self) -> Self {
        Self(self.0 + 1)
    }
}

/// An assignment in the log, either a free choice or a forced constraint.
#[derive(Debug, Clone)]
pub(crate) enum Assignment {
    /// A freely chosen version for a package.
    Decision { package: Package, version: Version },
    /// A constraint forced by unit propagation from an incompatibility whose
    /// other terms were already satisfied.
    Derivation {
        package: Package,
        term: Term,
        cause: IncompId,
    },
}

impl Assignment {
    pub(crate) fn package(&self) -> &Package {
        match self {
            Self::Decision { package, .. } => package,
            Self::Derivation { package, .. } => package,
        }
    }

    /// The term contributed to the package accumulator.
    fn term(&self) -> Term {
        match self {
            Self::Decision { version, .. } => Term::exact(*version),
            Self::Derivation { term, .. } => term.clone(),
        }
    }
}

/// An assignment along the decision level it was made at.
#[derive(Debug, Clone)]
pub(crate) struct DatedAssignment {
    pub(crate) decision_level: DecisionLevel,
    pub(crate) assignment: Assignment,
}

/// Accumulated state of one package: the intersection of all terms
/// contributed by log entries, and the decided version if any.
#[derive(Debug, Clone)]
struct PackageAssignment {
    term: Term,
    decision: Option<Version>,
}

/// Result of the satisfier search during conflict resolution.
#[derive(Debug, Clone)]
pub(crate) enum SatisfierSearch {
    /// The conflict can be undone by backjumping, the current conflicting
    /// incompatibility is the one to learn.
    DifferentDecisionLevels {
        previous_satisfier_level: DecisionLevel,
    },
    /// The satisfier is a derivation made at the same level, resolution must
    /// continue with its cause.
    SameDecisionLevels { satisfier_cause: IncompId },
}

/// The partial solution contains all package assignments, historically
/// ordered in an append-truncate log plus a per-package accumulator. The log
/// is the source of truth, the accumulator is rebuilt from it after
/// backtracking.
pub(crate) struct PartialSolution {
    history: Vec<DatedAssignment>,
    current_decision_level: DecisionLevel,
    /// Keyed in discovery order, which makes the choice of the next package
    /// to decide deterministic.
    package_assignments: FnvIndexMap<Package, PackageAssignment>,
}

impl PartialSolution {
    /// Initialize an empty partial solution.
    pub(crate) fn empty() -> Self {
        Self {
            history: Vec::new(),
            current_decision_level: DecisionLevel(0),
            package_assignments: FnvIndexMap::default(),
        }
    }

    pub(crate) fn current_decision_level(&self) -> DecisionLevel {
        self.current_decision_level
    }

    /// Add a decision, opening a new decision level.
    pub(crate) fn add_decision(&mut self, package: Package, version: Version) {
        if cfg!(debug_assertions) {
            match self.package_assignments.get(&package) {
                None => panic!("decisions always follow a positive derivation"),
                Some(pa) => {
                    assert!(pa.decision.is_none(), "already existing decision");
                    debug_assert!(
                        pa.term.contains(&version),
                        "{package}: {version} was expected to be contained in {}",
                        pa.term,
                    );
                }
            }
        }
        self.current_decision_level = self.current_decision_level.increment();
        self.history.push(DatedAssignment {
            decision_level: self.current_decision_level,
            assignment: Assignment::Decision {
                package: package.clone(),
                version,
            },
        });
        let pa = self
            .package_assignments
            .get_mut(&package)
            .expect("decisions always follow a positive derivation");
        pa.term = pa.term.intersection(&Term::exact(version));
        pa.decision = Some(version);
    }

    /// Add a derivation forced by the given incompatibility.
    pub(crate) fn add_derivation(
        &mut self,
        package: Package,
        cause: IncompId,
        store: &[Incompatibility],
    ) {
        let term = store[cause.0]
            .get(&package)
            .expect("the cause mentions the derived package")
            .negate();
        self.history.push(DatedAssignment {
            decision_level: self.current_decision_level,
            assignment: Assignment::Derivation {
                package: package.clone(),
                term: term.clone(),
                cause,
            },
        });
        match self.package_assignments.entry(package) {
            indexmap::map::Entry::Occupied(mut occupied) => {
                let pa = occupied.get_mut();
                debug_assert!(pa.decision.is_none(), "derivation after a decision");
                pa.term = pa.term.intersection(&term);
            }
            indexmap::map::Entry::Vacant(vacant) => {
                vacant.insert(PackageAssignment {
                    term,
                    decision: None,
                });
            }
        }
    }

    /// Retrieve the intersection of all terms related to a package.
    pub(crate) fn term_intersection_for_package(&self, package: &Package) -> Option<&Term> {
        self.package_assignments.get(package).map(|pa| &pa.term)
    }

    /// Check how the partial solution relates to an incompatibility.
    pub(crate) fn relation(&self, incompat: &Incompatibility) -> Relation {
        incompat.relation(|package| self.term_intersection_for_package(package))
    }

    /// The next package that must receive a decision: the first, in discovery
    /// order, that is positively constrained and not decided yet. `None`
    /// means the partial solution is a complete solution.
    pub(crate) fn pick_next_package(&self) -> Option<(&Package, &VersionSet)> {
        self.package_assignments.iter().find_map(|(package, pa)| {
            if pa.decision.is_none() && pa.term.is_positive() {
                Some((package, pa.term.unwrap_positive()))
            } else {
                None
            }
        })
    }

    /// All decided packages with their versions, in decision order.
    pub(crate) fn extract_solution(&self) -> impl Iterator<Item = (Package, Version)> + '_ {
        self.history.iter().filter_map(|dated| match &dated.assignment {
            Assignment::Decision { package, version } => Some((package.clone(), *version)),
            Assignment::Derivation { .. } => None,
        })
    }

    /// Backtrack the partial solution to a given decision level, dropping
    /// every log entry above it.
    pub(crate) fn backtrack(&mut self, decision_level: DecisionLevel) {
        debug!("backtrack to decision level {}", decision_level.0);
        // Levels in the log are non-decreasing.
        let keep = self
            .history
            .partition_point(|dated| dated.decision_level <= decision_level);
        self.history.truncate(keep);
        self.current_decision_level = decision_level;

        // Rebuild the accumulator from the surviving log; the control flow is
        // strictly stack-like around backtracks so this stays cheap enough.
        let Self {
            history,
            package_assignments,
            ..
        } = self;
        package_assignments.clear();
        for dated in history.iter() {
            let package = dated.assignment.package().clone();
            let version = match &dated.assignment {
                Assignment::Decision { version, .. } => Some(*version),
                Assignment::Derivation { .. } => None,
            };
            match package_assignments.entry(package) {
                indexmap::map::Entry::Occupied(mut occupied) => {
                    let pa = occupied.get_mut();
                    pa.term = pa.term.intersection(&dated.assignment.term());
                    pa.decision = pa.decision.or(version);
                }
                indexmap::map::Entry::Vacant(vacant) => {
                    vacant.insert(PackageAssignment {
                        term: dated.assignment.term(),
                        decision: version,
                    });
                }
            }
        }
    }

    /// Figure out if the satisfier and previous satisfier of an
    /// incompatibility are of different decision levels.
    ///
    /// The satisfier is the earliest assignment such that the incompatibility
    /// is satisfied by the partial solution up to and including it.
    pub(crate) fn satisfier_search(
        &self,
        incompat: &Incompatibility,
    ) -> (Package, SatisfierSearch) {
        let satisfier_idx = self.find_satisfier(incompat);
        let satisfier = &self.history[satisfier_idx];
        let satisfier_package = satisfier.assignment.package().clone();
        let previous_level = self.find_previous_satisfier(incompat, satisfier_idx);
        if previous_level < satisfier.decision_level {
            let search = SatisfierSearch::DifferentDecisionLevels {
                previous_satisfier_level: previous_level,
            };
            (satisfier_package, search)
        } else {
            match &satisfier.assignment {
                Assignment::Derivation { cause, .. } => {
                    let search = SatisfierSearch::SameDecisionLevels {
                        satisfier_cause: *cause,
                    };
                    (satisfier_package, search)
                }
                // A decision is always the first assignment of its level, so
                // every other satisfier lives at a strictly lower level.
                Assignment::Decision { .. } => {
                    unreachable!("the previous satisfier cannot reach a decision's level")
                }
            }
        }
    }

    /// Index of the log entry whose addition made the incompatibility fully
    /// satisfied.
    fn find_satisfier(&self, incompat: &Incompatibility) -> usize {
        let mut accumulated: Map<&Package, Term> = Map::default();
        let mut satisfied = 0;
        for (idx, dated) in self.history.iter().enumerate() {
            let package = dated.assignment.package();
            let Some(incompat_term) = incompat.get(package) else {
                continue;
            };
            let entry = accumulated.entry(package).or_insert_with(Term::any);
            let was_satisfied = entry.subset_of(incompat_term);
            *entry = entry.intersection(&dated.assignment.term());
            // Satisfaction is monotone under intersection, count each
            // package once.
            if !was_satisfied && entry.subset_of(incompat_term) {
                satisfied += 1;
                if satisfied == incompat.len() {
                    return idx;
                }
            }
        }
        unreachable!("satisfier search on an incompatibility the solution does not satisfy")
    }

    /// Decision level of the earliest assignment such that the partial
    /// solution up to it, plus the satisfier, satisfies the incompatibility.
    fn find_previous_satisfier(
        &self,
        incompat: &Incompatibility,
        satisfier_idx: usize,
    ) -> DecisionLevel {
        let satisfier = &self.history[satisfier_idx].assignment;
        let mut accumulated: Map<&Package, Term> = Map::default();
        accumulated.insert(satisfier.package(), satisfier.term());
        let mut satisfied = 0;
        for (package, incompat_term) in incompat.iter() {
            if let Some(entry) = accumulated.get(package) {
                if entry.subset_of(incompat_term) {
                    satisfied += 1;
                }
            }
        }
        if satisfied == incompat.len() {
            return DecisionLevel(1);
        }
        for dated in self.history[..satisfier_idx].iter() {
            let package = dated.assignment.package();
            let Some(incompat_term) = incompat.get(package) else {
                continue;
            };
            let entry = accumulated.entry(package).or_insert_with(Term::any);
            let was_satisfied = entry.subset_of(incompat_term);
            *entry = entry.intersection(&dated.assignment.term());
            if !was_satisfied && entry.subset_of(incompat_term) {
                satisfied += 1;
                if satisfied == incompat.len() {
                    // Level 1 holds the root decision, backjumping past it
                    // would discard the problem statement itself.
                    return dated.decision_level.max(DecisionLevel(1));
                }
            }
        }
        DecisionLevel(1)
    }
}

impl Display for PartialSolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut assignments: Vec<_> = self
            .package_assignments
            .iter()
            .map(|(package, pa)| match pa.decision {
                Some(version) => format!("{package}: decided {version}"),
                None => format!("{package}: {}", pa.term),
            })
            .collect();
        assignments.sort();
        write!(
            f,
            "decision level {}, assignments:\n  {}",
            self.current_decision_level.0,
            assignments.join("\n  ")
        )
    }
}

// TESTS #######################################################################
