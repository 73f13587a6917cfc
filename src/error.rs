// SPDX-License-Identifier: MPL-2.0

//! Handling pubgrub errors.

use thiserror::Error;

use crate::package::Package;
use crate::report::{DefaultStringReporter, DerivationTree, Reporter};

/// A version string that does not follow the `MAJOR.MINOR.PATCH` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version {input:?}, expected MAJOR.MINOR.PATCH with numeric components")]
pub struct InvalidVersionError {
    input: String,
}

impl InvalidVersionError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A constraint string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConstraintError {
    /// An atom of the constraint starts with an unsupported operator.
    #[error("unrecognized atom {atom:?} in constraint {constraint:?}")]
    UnknownOperator {
        /// The whole constraint string.
        constraint: String,
        /// The offending atom.
        atom: String,
    },
    /// An atom of the constraint carries a malformed version.
    #[error("invalid version in constraint {constraint:?}")]
    Version {
        /// The whole constraint string.
        constraint: String,
        /// The underlying version parse error.
        #[source]
        source: InvalidVersionError,
    },
}

/// Errors reported at the dependency provider boundary.
///
/// These abort the resolution, they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Versions were requested for a package the provider has never heard of.
    #[error("package {0} is unknown to the dependency provider")]
    UnknownPackage(Package),
    /// Any other provider-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Errors that may occur while solving dependencies.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// There is no solution for this set of dependencies.
    ///
    /// This is a regular terminal outcome of a solve, the derivation tree is
    /// the proof and can be rendered with a
    /// [Reporter](crate::report::Reporter).
    #[error("{}", DefaultStringReporter::report(.0))]
    NoSolution(Box<DerivationTree>),

    /// Something went wrong at the dependency provider boundary.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The configured bound on solver iterations was reached.
    ///
    /// This guards against provider-induced pathologies, see
    /// [Resolver::with_iteration_limit](crate::Resolver::with_iteration_limit).
    #[error("dependency solving aborted after reaching the limit of {limit} iterations")]
    IterationLimitExceeded {
        /// The configured limit.
        limit: u64,
    },

    /// A version string could not be parsed.
    #[error(transparent)]
    InvalidVersion(#[from] InvalidVersionError),

    /// A constraint string could not be parsed.
    #[error(transparent)]
    InvalidConstraint(#[from] InvalidConstraintError),
}

impl ResolveError {
    /// The derivation tree proving there is no solution, if that is what
    /// happened.
    pub fn derivation_tree(&self) -> Option<&DerivationTree> {
        match self {
            Self::NoSolution(tree) => Some(tree),
            _ => None,
        }
    }
}
