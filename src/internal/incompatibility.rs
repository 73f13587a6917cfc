// SPDX-License-Identifier: MPL-2.0

//! An incompatibility is a set of terms for different packages
//! that should never be satisfied all together.

use std::fmt::{self, Display};
use std::sync::Arc;

use crate::package::Package;
use crate::report::{DerivationTree, Derived, External};
use crate::term::{self, Term};
use crate::type_aliases::{Map, Set};
use crate::version::{Version, VersionSet};

/// Identifier of an incompatibility in the append-only pool owned by the
/// solver state. Storing indices instead of references sidesteps cyclic
/// ownership in the cause graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct IncompId(pub(crate) usize);

/// An incompatibility is a set of terms for different packages
/// that should never be satisfied all together.
/// An incompatibility usually originates from a package dependency.
/// For example, if package A at version 1 depends on package B
/// at version 2, you can never have both terms `A = 1`
/// and `not B = 2` satisfied at the same time in a partial solution.
/// This would mean that we found a solution with package A at version 1
/// but not with package B at version 2.
/// Yet A at version 1 depends on B at version 2 so this is not possible.
/// Therefore, the set `{ A = 1, not B = 2 }` is an incompatibility,
/// defined from dependencies of A at version 1.
///
/// Incompatibilities can also be derived from two other incompatibilities
/// during conflict resolution, by the rule of resolution on a shared package.
#[derive(Debug, Clone)]
pub(crate) struct Incompatibility {
    /// One term per package; packages with an always-false term are omitted
    /// at construction.
    package_terms: Map<Package, Term>,
    /// The reason for the incompatibility.
    pub(crate) kind: Kind,
}

/// The reason for the incompatibility.
#[derive(Debug, Clone)]
pub(crate) enum Kind {
    /// Initial incompatibility aiming at picking the root package for the
    /// first decision.
    NotRoot(Package, Version),
    /// There are no versions in the given set for this package.
    NoVersions(Package, VersionSet),
    /// Dependencies of the package are unavailable for this version.
    UnavailableDependencies(Package, Version),
    /// Incompatibility coming from the dependencies of a given package.
    FromDependencyOf(Package, VersionSet, Package, VersionSet),
    /// Derived from two causes. Stores the ids of the parents.
    DerivedFrom(IncompId, IncompId),
}

/// A Relation describes how a set of terms can be compared to an
/// incompatibility. Typically, the set of terms comes from the partial
/// solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Relation {
    /// We say that a set of terms S satisfies an incompatibility I
    /// if S satisfies every term in I.
    Satisfied,
    /// We say that S contradicts I
    /// if S contradicts at least one term in I.
    Contradicted(Package),
    /// If S satisfies all but one of I's terms and is inconclusive for the
    /// remaining term, we say S "almost satisfies" I and we call the
    /// remaining term the "unsatisfied term".
    AlmostSatisfied(Package),
    /// Otherwise, we say that their relation is inconclusive.
    Inconclusive,
}

impl Incompatibility {
    /// Create the initial "not root" incompatibility.
    pub(crate) fn not_root(package: Package, version: Version) -> Self {
        let mut package_terms = Map::default();
        package_terms.insert(
            package.clone(),
            Term::Negative(VersionSet::singleton(version)),
        );
        Self {
            package_terms,
            kind: Kind::NotRoot(package, version),
        }
    }

    /// Create an incompatibility to remember that a given set does not
    /// contain any version.
    pub(crate) fn no_versions(package: Package, set: VersionSet) -> Self {
        let mut package_terms = Map::default();
        package_terms.insert(package.clone(), Term::Positive(set.clone()));
        Self {
            package_terms,
            kind: Kind::NoVersions(package, set),
        }
    }

    /// Create an incompatibility to remember that the provider could not
    /// describe the dependencies of this version.
    pub(crate) fn unavailable_dependencies(package: Package, version: Version) -> Self {
        let mut package_terms = Map::default();
        package_terms.insert(package.clone(), Term::exact(version));
        Self {
            package_terms,
            kind: Kind::UnavailableDependencies(package, version),
        }
    }

    /// Build an incompatibility from a given dependency.
    ///
    /// A dependency on an empty set degenerates to forbidding the depending
    /// versions altogether, and a self-dependency contributes no second term
    /// (the caller skips satisfiable self-dependencies entirely).
    pub(crate) fn from_dependency(
        package: Package,
        versions: VersionSet,
        dep: (Package, VersionSet),
    ) -> Self {
        let (dep_package, dep_set) = dep;
        let mut package_terms = Map::default();
        package_terms.insert(package.clone(), Term::Positive(versions.clone()));
        if !dep_set.is_empty() && dep_package != package {
            package_terms.insert(dep_package.clone(), Term::Negative(dep_set.clone()));
        }
        Self {
            package_terms,
            kind: Kind::FromDependencyOf(package, versions, dep_package, dep_set),
        }
    }

    /// Prior cause of two incompatibilities using the rule of resolution.
    ///
    /// The terms of the shared package cancel out when their union is the
    /// always-true term; otherwise the union is kept. Terms appearing in both
    /// parents for another package are intersected, and dropped when the
    /// intersection can no longer be satisfied by any assignment.
    pub(crate) fn prior_cause(
        incompat: &Self,
        satisfier_cause: &Self,
        package: &Package,
        ids: (IncompId, IncompId),
    ) -> Self {
        let mut package_terms: Map<Package, Term> = Map::default();
        for (p, term) in incompat.iter().filter(|(p, _)| p != &package) {
            package_terms.insert(p.clone(), term.clone());
        }
        for (p, term) in satisfier_cause.iter().filter(|(p, _)| p != &package) {
            match package_terms.get(p) {
                None => {
                    package_terms.insert(p.clone(), term.clone());
                }
                Some(existing) => {
                    let both = existing.intersection(term);
                    if both.is_empty() {
                        package_terms.remove(p);
                    } else {
                        package_terms.insert(p.clone(), both);
                    }
                }
            }
        }
        let t1 = incompat.get(package).expect("shared package in incompat");
        let t2 = satisfier_cause
            .get(package)
            .expect("shared package in satisfier cause");
        let union = t1.union(t2);
        if union != Term::any() {
            package_terms.insert(package.clone(), union);
        }
        Self {
            package_terms,
            kind: Kind::DerivedFrom(ids.0, ids.1),
        }
    }

    /// Check if an incompatibility should mark the end of the algorithm
    /// because it satisfies the root package.
    pub(crate) fn is_terminal(&self, root_package: &Package, root_version: &Version) -> bool {
        if self.package_terms.is_empty() {
            true
        } else if self.package_terms.len() > 1 {
            false
        } else {
            let (package, term) = self
                .package_terms
                .iter()
                .next()
                .expect("just checked the length");
            package == root_package && term.contains(root_version)
        }
    }

    /// Get the term related to a given package, if it exists.
    pub(crate) fn get(&self, package: &Package) -> Option<&Term> {
        self.package_terms.get(package)
    }

    /// Iterate over packages and their terms.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Package, &Term)> {
        self.package_terms.iter()
    }

    /// Number of packages mentioned.
    pub(crate) fn len(&self) -> usize {
        self.package_terms.len()
    }

    /// CF definition of Relation enum.
    pub(crate) fn relation<'a>(
        &self,
        terms: impl Fn(&Package) -> Option<&'a Term>,
    ) -> Relation {
        let mut relation = Relation::Satisfied;
        for (package, incompat_term) in self.package_terms.iter() {
            match terms(package).map(|accumulated| accumulated.relation(incompat_term)) {
                Some(term::Relation::Satisfied) => {}
                Some(term::Relation::Contradicted) => {
                    return Relation::Contradicted(package.clone());
                }
                // A package not in the partial solution acts as the
                // always-true term, which is inconclusive towards anything
                // we ever put in an incompatibility.
                None | Some(term::Relation::Inconclusive) => {
                    if relation == Relation::Satisfied {
                        relation = Relation::AlmostSatisfied(package.clone());
                    } else {
                        return Relation::Inconclusive;
                    }
                }
            }
        }
        relation
    }

    // Reporting ###############################################################

    /// Build the derivation tree node of this incompatibility, with its
    /// parents looked up in `precomputed` (callers fill it bottom-up, parent
    /// ids are always smaller than the derived id).
    pub(crate) fn derivation_tree(
        &self,
        id: IncompId,
        shared_ids: &Set<usize>,
        precomputed: &Map<IncompId, Arc<DerivationTree>>,
    ) -> DerivationTree {
        match &self.kind {
            Kind::DerivedFrom(id1, id2) => DerivationTree::Derived(Derived {
                terms: self.package_terms.clone(),
                shared_id: shared_ids.contains(&id.0).then_some(id.0),
                cause1: precomputed
                    .get(id1)
                    .expect("non-topological calls building the tree")
                    .clone(),
                cause2: precomputed
                    .get(id2)
                    .expect("non-topological calls building the tree")
                    .clone(),
            }),
            Kind::NotRoot(package, version) => {
                DerivationTree::External(External::NotRoot(package.clone(), *version))
            }
            Kind::NoVersions(package, set) => {
                DerivationTree::External(External::NoVersions(package.clone(), set.clone()))
            }
            Kind::UnavailableDependencies(package, version) => DerivationTree::External(
                External::UnavailableDependencies(package.clone(), *version),
            ),
            Kind::FromDependencyOf(package, versions, dep_package, dep_set) => {
                DerivationTree::External(External::FromDependencyOf(
                    package.clone(),
                    versions.clone(),
                    dep_package.clone(),
                    dep_set.clone(),
                ))
            }
        }
    }
}

/// Equality is structural on the term map, the cause is not considered.
impl PartialEq for Incompatibility {
    fn eq(&self, other: &Self) -> bool {
        self.package_terms == other.package_terms
    }
}

impl Eq for Incompatibility {}

impl Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut terms: Vec<_> = self.package_terms.iter().collect();
        terms.sort_unstable_by(|(p1, _), (p2, _)| p1.cmp(p2));
        match terms.as_slice() {
            [] => write!(f, "version solving failed"),
            [(package, Term::Positive(set))] => write!(f, "{package} {set} is forbidden"),
            [(package, Term::Negative(set))] => write!(f, "{package} {set} is mandatory"),
            slice => {
                let str_terms: Vec<_> = slice.iter().map(|(p, t)| format!("{p} {t}")).collect();
                write!(f, "{} are incompatible", str_terms.join(", "))
            }
        }
    }
}

// TESTS #######################################################################

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::term::tests::strategy as term_strategy;

    proptest! {
        /// For any three different packages p1, p2 and p3,
        /// for any three terms t1, t2 and t3,
        /// if we have the two following incompatibilities:
        ///    { p1: t1, p2: not t2 }
        ///    { p2: t2, p3: t3 }
        /// the rule of resolution says that we can deduce the following
        /// incompatibility:
        ///    { p1: t1, p3: t3 }
        #[test]
        fn rule_of_resolution(t1 in term_strategy(), t2 in term_strategy(), t3 in term_strategy()) {
            let p1 = Package::new("p1");
            let p2 = Package::new("p2");
            let p3 = Package::new("p3");

            let mut terms1 = Map::default();
            terms1.insert(p1.clone(), t1.clone());
            terms1.insert(p2.clone(), t2.negate());
            let i1 = Incompatibility {
                package_terms: terms1,
                kind: Kind::FromDependencyOf(
                    p1.clone(),
                    VersionSet::full(),
                    p2.clone(),
                    VersionSet::full(),
                ),
            };

            let mut terms2 = Map::default();
            terms2.insert(p2.clone(), t2);
            terms2.insert(p3.clone(), t3.clone());
            let i2 = Incompatibility {
                package_terms: terms2,
                kind: Kind::FromDependencyOf(
                    p2.clone(),
                    VersionSet::full(),
                    p3.clone(),
                    VersionSet::full(),
                ),
            };

            let mut expected = Map::default();
            expected.insert(p1, t1);
            expected.insert(p3, t3);

            let resolution = Incompatibility::prior_cause(&i1, &i2, &p2, (IncompId(0), IncompId(1)));
            prop_assert_eq!(resolution.package_terms, expected);
        }
    }

    #[test]
    fn empty_incompatibility_is_terminal() {
        let incompat = Incompatibility {
            package_terms: Map::default(),
            kind: Kind::DerivedFrom(IncompId(0), IncompId(1)),
        };
        assert!(incompat.is_terminal(&Package::root("root"), &Version::new(1, 0, 0)));
    }

    #[test]
    fn root_incompatibility_is_terminal() {
        let root = Package::root("root");
        let version = Version::new(1, 0, 0);
        let incompat = Incompatibility::no_versions(root.clone(), VersionSet::singleton(version));
        assert!(incompat.is_terminal(&root, &version));
        assert!(!incompat.is_terminal(&root, &Version::new(2, 0, 0)));
    }
}
