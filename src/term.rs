// SPDX-License-Identifier: MPL-2.0

//! A term is a positive or negative expression regarding a set of versions.

use std::fmt::{self, Display};

use crate::version::{Version, VersionSet};

/// A positive or negative expression regarding a set of versions.
///
/// `Positive(S)` is satisfied when the package is selected at a version in
/// `S`. `Negative(S)` is satisfied when the package is selected at a version
/// outside `S`, or not selected at all. The distinction matters: a negative
/// term never requires the package to appear in the solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// The package version must be in the set.
    Positive(VersionSet),
    /// The package version must not be in the set.
    Negative(VersionSet),
}

/// Base relation between two terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    /// Every assignment satisfying `self` also satisfies `other`.
    Satisfied,
    /// No assignment can satisfy both terms.
    Contradicted,
    /// Cannot say anything with certainty.
    Inconclusive,
}

impl Term {
    /// The term that every assignment satisfies.
    pub(crate) fn any() -> Self {
        Self::Negative(VersionSet::empty())
    }

    /// The term that no assignment satisfies.
    pub(crate) fn empty() -> Self {
        Self::Positive(VersionSet::empty())
    }

    /// The term made of exactly one version, the form decisions take.
    pub(crate) fn exact(version: Version) -> Self {
        Self::Positive(VersionSet::singleton(version))
    }

    /// Negation of the term.
    pub fn negate(&self) -> Self {
        match self {
            Self::Positive(set) => Self::Negative(set.clone()),
            Self::Negative(set) => Self::Positive(set.clone()),
        }
    }

    /// Whether the term is positive.
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive(_))
    }

    /// Whether no assignment at all can satisfy the term.
    ///
    /// A negative term is never empty, absence of the package satisfies it.
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Positive(set) => set.is_empty(),
            Self::Negative(_) => false,
        }
    }

    /// Whether the term allows selecting the given version.
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            Self::Positive(set) => set.contains(version),
            Self::Negative(set) => !set.contains(version),
        }
    }

    /// Unwrap the set of a positive term.
    ///
    /// Panics on a negative term, callers must check the sign first.
    pub fn unwrap_positive(&self) -> &VersionSet {
        match self {
            Self::Positive(set) => set,
            Self::Negative(_) => panic!("expected a positive term"),
        }
    }

    /// Set operation: the term satisfied exactly when both terms are.
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Positive(s1), Self::Positive(s2)) => Self::Positive(s1.intersection(s2)),
            (Self::Positive(s1), Self::Negative(s2)) => {
                Self::Positive(s1.intersection(&s2.complement()))
            }
            (Self::Negative(s1), Self::Positive(s2)) => {
                Self::Positive(s1.complement().intersection(s2))
            }
            (Self::Negative(s1), Self::Negative(s2)) => Self::Negative(s1.union(s2)),
        }
    }

    /// Set operation: the term satisfied when either term is.
    pub fn union(&self, other: &Self) -> Self {
        self.negate().intersection(&other.negate()).negate()
    }

    /// Whether every assignment satisfying `self` also satisfies `other`.
    pub(crate) fn subset_of(&self, other: &Self) -> bool {
        self == &self.intersection(other)
    }

    /// Relation of `self` (typically an accumulated assignment term) towards
    /// `other` (typically a term of an incompatibility).
    pub(crate) fn relation(&self, other: &Self) -> Relation {
        let intersection = self.intersection(other);
        if &intersection == self {
            Relation::Satisfied
        } else if intersection == Self::empty() {
            Relation::Contradicted
        } else {
            Relation::Inconclusive
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Positive(set) => write!(f, "{set}"),
            Self::Negative(set) => write!(f, "not ( {set} )"),
        }
    }
}

// TESTS #######################################################################
