// SPDX-License-Identifier: MPL-2.0

//! Build a report as clear as possible as to why dependency solving failed.

use std::fmt::{self, Display};
use std::sync::Arc;

use crate::package::Package;
use crate::term::Term;
use crate::type_aliases::Map;
use crate::version::{Version, VersionSet};

/// Reporter trait.
pub trait Reporter {
    /// Output type of the report.
    type Output;

    /// Generate a report from the derivation tree describing the resolution
    /// failure.
    fn report(derivation_tree: &DerivationTree) -> Self::Output;
}

/// Derivation tree resulting in the impossibility to solve the dependencies
/// of our root package.
#[derive(Debug, Clone)]
pub enum DerivationTree {
    /// External incompatibility.
    External(External),
    /// Incompatibility derived from two others.
    Derived(Derived),
}

/// Incompatibilities that are not derived from others, they have their own
/// reason.
#[derive(Debug, Clone)]
pub enum External {
    /// Initial incompatibility aiming at picking the root package for the
    /// first decision.
    NotRoot(Package, Version),
    /// There are no versions in the given set for this package.
    NoVersions(Package, VersionSet),
    /// Dependencies of the package at this version are unavailable.
    UnavailableDependencies(Package, Version),
    /// Incompatibility coming from the dependencies of a given package.
    FromDependencyOf(Package, VersionSet, Package, VersionSet),
}

/// Incompatibility derived from two others.
#[derive(Debug, Clone)]
pub struct Derived {
    /// Terms of the incompatibility, one per package.
    pub terms: Map<Package, Term>,
    /// Indicate if the incompatibility is present multiple times in the
    /// derivation tree. If that is the case, it holds a unique id, then
    /// reports can refer to the explanation of that incompatibility by line
    /// number instead of repeating it.
    pub shared_id: Option<usize>,
    /// First cause.
    pub cause1: Arc<DerivationTree>,
    /// Second cause.
    pub cause2: Arc<DerivationTree>,
}

impl DerivationTree {
    /// Merge the [NoVersions](External::NoVersions) external
    /// incompatibilities with the other one they are matched with in a
    /// derived incompatibility. This cleans up the derivation tree for
    /// potentially easier and more readable reporting.
    pub fn collapse_no_versions(&mut self) {
        let replacement = match self {
            Self::External(_) => None,
            Self::Derived(derived) => {
                match (
                    Arc::make_mut(&mut derived.cause1),
                    Arc::make_mut(&mut derived.cause2),
                ) {
                    (Self::External(External::NoVersions(package, set)), other)
                    | (other, Self::External(External::NoVersions(package, set))) => {
                        other.collapse_no_versions();
                        other.clone().merge_no_versions(package, set)
                    }
                    (cause1, cause2) => {
                        cause1.collapse_no_versions();
                        cause2.collapse_no_versions();
                        None
                    }
                }
            }
        };
        if let Some(tree) = replacement {
            *self = tree;
        }
    }

    fn merge_no_versions(self, package: &Package, set: &VersionSet) -> Option<Self> {
        match self {
            // Cannot merge into a derived incompatibility without inventing
            // new derivation steps.
            Self::Derived(_) => None,
            Self::External(External::NotRoot(..)) => None,
            Self::External(External::UnavailableDependencies(..)) => None,
            Self::External(External::NoVersions(other_package, other_set)) => {
                if &other_package == package {
                    Some(Self::External(External::NoVersions(
                        other_package,
                        other_set.union(set),
                    )))
                } else {
                    None
                }
            }
            Self::External(External::FromDependencyOf(p1, s1, p2, s2)) => {
                if &p1 == package {
                    Some(Self::External(External::FromDependencyOf(
                        p1,
                        s1.union(set),
                        p2,
                        s2,
                    )))
                } else if &p2 == package {
                    Some(Self::External(External::FromDependencyOf(
                        p1,
                        s1,
                        p2,
                        s2.union(set),
                    )))
                } else {
                    None
                }
            }
        }
    }

    /// Iterate over the external leaves of the tree.
    pub fn externals(&self) -> Vec<&External> {
        let mut externals = Vec::new();
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            match tree {
                Self::External(external) => externals.push(external),
                Self::Derived(derived) => {
                    stack.push(&derived.cause1);
                    stack.push(&derived.cause2);
                }
            }
        }
        externals
    }
}

impl Display for External {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotRoot(package, version) => {
                write!(f, "we are solving dependencies of {package} {version}")
            }
            Self::NoVersions(package, set) => {
                if set == &VersionSet::full() {
                    write!(f, "there is no available version for {package}")
                } else {
                    write!(f, "there is no version of {package} in {set}")
                }
            }
            Self::UnavailableDependencies(package, version) => {
                write!(f, "dependencies of {package} {version} are unavailable")
            }
            Self::FromDependencyOf(package, package_set, dependency, dependency_set) => {
                if package.is_root() {
                    // The root is pinned anyway, its version set is noise.
                    write!(f, "{package} depends on {dependency} {dependency_set}")
                } else if package_set == &VersionSet::full() {
                    write!(
                        f,
                        "every version of {package} depends on {dependency} {dependency_set}"
                    )
                } else {
                    write!(
                        f,
                        "{package} {package_set} depends on {dependency} {dependency_set}"
                    )
                }
            }
        }
    }
}

/// Default reporter able to generate an explanation as a [String].
pub struct DefaultStringReporter {
    /// Explanation lines, numbered from one once assembled.
    lines: Vec<String>,
    /// Number of explanations that have been given a line reference so far.
    ref_count: usize,
    /// Line reference of each shared derived incompatibility already
    /// explained, keyed by its shared id.
    shared_with_ref: Map<usize, usize>,
}

impl DefaultStringReporter {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            ref_count: 0,
            shared_with_ref: Map::default(),
        }
    }

    fn build_recursive(&mut self, derived: &Derived) {
        self.build_recursive_helper(derived);
        if let Some(id) = derived.shared_id {
            if !self.shared_with_ref.contains_key(&id) {
                let line_ref = self.add_line_ref();
                self.shared_with_ref.insert(id, line_ref);
            }
        }
    }

    fn build_recursive_helper(&mut self, current: &Derived) {
        match (current.cause1.as_ref(), current.cause2.as_ref()) {
            (DerivationTree::External(external1), DerivationTree::External(external2)) => {
                // Simplest case, we just combine two external incompatibilities.
                self.lines.push(format!(
                    "Because {} and {}, {}.",
                    external1,
                    external2,
                    Self::string_terms(&current.terms)
                ));
            }
            (DerivationTree::Derived(derived), DerivationTree::External(external))
            | (DerivationTree::External(external), DerivationTree::Derived(derived)) => {
                // One cause is derived, so we explain it first and then
                // conclude with the external one.
                self.report_one_each(derived, external, &current.terms);
            }
            (DerivationTree::Derived(derived1), DerivationTree::Derived(derived2)) => {
                match (
                    self.line_ref_of(derived1.shared_id),
                    self.line_ref_of(derived2.shared_id),
                ) {
                    // Both causes already have been explained, reuse them.
                    (Some(ref1), Some(ref2)) => self.lines.push(format!(
                        "Because {} ({}) and {} ({}), {}.",
                        Self::string_terms(&derived1.terms),
                        ref1,
                        Self::string_terms(&derived2.terms),
                        ref2,
                        Self::string_terms(&current.terms)
                    )),
                    (Some(ref1), None) => {
                        self.build_recursive(derived2);
                        self.lines.push(format!(
                            "And because {} ({}), {}.",
                            Self::string_terms(&derived1.terms),
                            ref1,
                            Self::string_terms(&current.terms)
                        ));
                    }
                    (None, Some(ref2)) => {
                        self.build_recursive(derived1);
                        self.lines.push(format!(
                            "And because {} ({}), {}.",
                            Self::string_terms(&derived2.terms),
                            ref2,
                            Self::string_terms(&current.terms)
                        ));
                    }
                    // Both causes need their own paragraph; give each
                    // conclusion a line reference and cite them.
                    (None, None) => {
                        self.build_recursive(derived1);
                        let ref1 = self.ref_of(derived1);
                        self.lines.push(String::new());
                        self.build_recursive(derived2);
                        let ref2 = self.ref_of(derived2);
                        self.lines.push(String::new());
                        self.lines.push(format!(
                            "Because {} ({}) and {} ({}), {}.",
                            Self::string_terms(&derived1.terms),
                            ref1,
                            Self::string_terms(&derived2.terms),
                            ref2,
                            Self::string_terms(&current.terms)
                        ));
                    }
                }
            }
        }
    }

    /// Report a derived and an external cause.
    fn report_one_each(
        &mut self,
        derived: &Derived,
        external: &External,
        current_terms: &Map<Package, Term>,
    ) {
        match self.line_ref_of(derived.shared_id) {
            Some(line_ref) => self.lines.push(format!(
                "Because {} ({}) and {}, {}.",
                Self::string_terms(&derived.terms),
                line_ref,
                external,
                Self::string_terms(current_terms)
            )),
            None => self.report_recurse_one_each(derived, external, current_terms),
        }
    }

    /// Report one derived and one external cause, without a line reference
    /// for the derived one.
    fn report_recurse_one_each(
        &mut self,
        derived: &Derived,
        external: &External,
        current_terms: &Map<Package, Term>,
    ) {
        match (derived.cause1.as_ref(), derived.cause2.as_ref()) {
            // If the derived cause has itself one external prior cause, we
            // can chain the two sentences instead of repeating conclusions.
            (DerivationTree::Derived(prior_derived), DerivationTree::External(prior_external))
            | (DerivationTree::External(prior_external), DerivationTree::Derived(prior_derived)) => {
                self.build_recursive(prior_derived);
                self.lines.push(format!(
                    "And because {} and {}, {}.",
                    prior_external,
                    external,
                    Self::string_terms(current_terms)
                ));
            }
            _ => {
                self.build_recursive(derived);
                self.lines.push(format!(
                    "And because {}, {}.",
                    external,
                    Self::string_terms(current_terms)
                ));
            }
        }
    }

    /// Add a line reference to the last line and return it.
    fn add_line_ref(&mut self) -> usize {
        self.ref_count += 1;
        if let Some(line) = self.lines.last_mut() {
            line.push_str(&format!(" ({})", self.ref_count));
        }
        self.ref_count
    }

    /// Line reference of a shared derived incompatibility, once explained.
    fn line_ref_of(&self, shared_id: Option<usize>) -> Option<usize> {
        shared_id.and_then(|id| self.shared_with_ref.get(&id).copied())
    }

    /// Line reference of an explanation that was just built, adding one if
    /// the build did not register it as shared.
    fn ref_of(&mut self, derived: &Derived) -> usize {
        match self.line_ref_of(derived.shared_id) {
            Some(line_ref) => line_ref,
            None => self.add_line_ref(),
        }
    }

    /// Try to print terms of an incompatibility in a human-readable way.
    fn string_terms(terms: &Map<Package, Term>) -> String {
        let mut terms_vec: Vec<_> = terms.iter().collect();
        terms_vec.sort_unstable_by(|(p1, _), (p2, _)| p1.cmp(p2));
        match terms_vec.as_slice() {
            [] => "version solving failed".into(),
            [(package, Term::Positive(set))] => format!("{package} {set} is forbidden"),
            [(package, Term::Negative(set))] => format!("{package} {set} is mandatory"),
            [(p1, Term::Positive(s1)), (p2, Term::Negative(s2))] => {
                External::FromDependencyOf((*p1).clone(), s1.clone(), (*p2).clone(), s2.clone())
                    .to_string()
            }
            [(p1, Term::Negative(s1)), (p2, Term::Positive(s2))] => {
                External::FromDependencyOf((*p2).clone(), s2.clone(), (*p1).clone(), s1.clone())
                    .to_string()
            }
            slice => {
                let str_terms: Vec<_> = slice.iter().map(|(p, t)| format!("{p} {t}")).collect();
                str_terms.join(", ") + " are incompatible"
            }
        }
    }
}

impl Reporter for DefaultStringReporter {
    type Output = String;

    fn report(derivation_tree: &DerivationTree) -> Self::Output {
        match derivation_tree {
            DerivationTree::External(external) => external.to_string(),
            DerivationTree::Derived(derived) => {
                let mut reporter = Self::new();
                reporter.build_recursive(derived);
                reporter.lines.join("\n")
            }
        }
    }
}

// TESTS #######################################################################

#[cfg(test)]
mod tests {
    use super::*;

    fn set(s: &str) -> VersionSet {
        s.parse().unwrap()
    }

    fn version(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn external_display() {
        let root = Package::root("root");
        let foo = Package::new("foo");
        let bar = Package::new("bar");
        assert_eq!(
            External::NotRoot(root.clone(), version("1.0.0")).to_string(),
            "we are solving dependencies of root 1.0.0"
        );
        assert_eq!(
            External::NoVersions(foo.clone(), set(">=2.0.0")).to_string(),
            "there is no version of foo in >=2.0.0"
        );
        assert_eq!(
            External::NoVersions(foo.clone(), VersionSet::full()).to_string(),
            "there is no available version for foo"
        );
        assert_eq!(
            External::FromDependencyOf(root, set("==1.0.0"), foo.clone(), set(">=1.0.0")).to_string(),
            "root depends on foo >=1.0.0"
        );
        assert_eq!(
            External::FromDependencyOf(foo.clone(), VersionSet::full(), bar.clone(), set("<2.0.0"))
                .to_string(),
            "every version of foo depends on bar <2.0.0"
        );
        assert_eq!(
            External::FromDependencyOf(foo, set(">=1.1.0"), bar, set(">=2.0.0")).to_string(),
            "foo >=1.1.0 depends on bar >=2.0.0"
        );
    }

    #[test]
    fn report_two_externals() {
        let root = Package::root("root");
        let z = Package::new("z");
        let mut terms = Map::default();
        terms.insert(root.clone(), Term::Positive(set("==1.0.0")));
        let tree = DerivationTree::Derived(Derived {
            terms,
            shared_id: None,
            cause1: Arc::new(DerivationTree::External(External::NoVersions(
                z.clone(),
                set("==1.0.0"),
            ))),
            cause2: Arc::new(DerivationTree::External(External::FromDependencyOf(
                root,
                set("==1.0.0"),
                z,
                set("==1.0.0"),
            ))),
        });
        assert_eq!(
            DefaultStringReporter::report(&tree),
            "Because there is no version of z in ==1.0.0 \
             and root depends on z ==1.0.0, root ==1.0.0 is forbidden."
        );
    }

    #[test]
    fn collapse_no_versions_merges_into_dependency() {
        let foo = Package::new("foo");
        let bar = Package::new("bar");
        let mut terms = Map::default();
        terms.insert(foo.clone(), Term::Positive(set(">=1.0.0, <2.0.0")));
        let mut tree = DerivationTree::Derived(Derived {
            terms,
            shared_id: None,
            cause1: Arc::new(DerivationTree::External(External::NoVersions(
                foo.clone(),
                set(">1.0.0, <2.0.0"),
            ))),
            cause2: Arc::new(DerivationTree::External(External::FromDependencyOf(
                foo.clone(),
                set("==1.0.0"),
                bar.clone(),
                set(">=2.0.0"),
            ))),
        });
        tree.collapse_no_versions();
        match tree {
            DerivationTree::External(External::FromDependencyOf(p1, s1, p2, s2)) => {
                assert_eq!(p1, foo);
                assert_eq!(s1, set(">=1.0.0, <2.0.0"));
                assert_eq!(p2, bar);
                assert_eq!(s2, set(">=2.0.0"));
            }
            other => panic!("expected a collapsed dependency, got {other:?}"),
        }
    }
}
