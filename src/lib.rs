// SPDX-License-Identifier: MPL-2.0

//! PubGrub version solving algorithm.
//!
//! Version solving consists in efficiently finding a set of packages and
//! versions that satisfy all the constraints of a given project
//! dependencies. In addition, when that is not possible, we should try to
//! provide a very human-readable and clear explanation as to why that
//! failed.
//!
//! # Basic example
//!
//! Let's imagine that we are building a user interface with a menu
//! containing dropdowns with some icons, icons that we are also directly
//! using in other parts of the interface. For this scenario our direct
//! dependencies are `menu` and `icons`, but the complete set of dependencies
//! looks like follows:
//!
//! - `root` depends on `menu` and `icons`
//! - `menu` depends on `dropdown`
//! - `dropdown` depends on `icons`
//! - `icons` has no dependency
//!
//! We can model that scenario with this library as follows
//! ```
//! use pubgrub_resolver::{resolve, OfflineDependencyProvider, Package, Version, VersionSet};
//!
//! let root = Package::root("root");
//! let menu = Package::new("menu");
//! let dropdown = Package::new("dropdown");
//! let icons = Package::new("icons");
//!
//! let mut dependency_provider = OfflineDependencyProvider::new();
//! dependency_provider.add_dependencies(
//!     root.clone(),
//!     (1, 0, 0),
//!     [
//!         (menu.clone(), VersionSet::full()),
//!         (icons.clone(), ">=1.0.0".parse().unwrap()),
//!     ],
//! );
//! dependency_provider.add_dependencies(
//!     menu.clone(),
//!     (1, 0, 0),
//!     [(dropdown.clone(), VersionSet::full())],
//! );
//! dependency_provider.add_dependencies(
//!     dropdown.clone(),
//!     (1, 0, 0),
//!     [(icons.clone(), VersionSet::full())],
//! );
//! dependency_provider.add_dependencies(icons.clone(), (1, 0, 0), []);
//!
//! // Run the algorithm.
//! let solution = resolve(&dependency_provider, root, (1, 0, 0)).unwrap();
//! assert_eq!(solution[&icons], Version::new(1, 0, 0));
//! ```
//!
//! # DependencyProvider trait
//!
//! In the previous example we used the [OfflineDependencyProvider], which
//! is a basic implementation of the [DependencyProvider] trait holding
//! everything in memory. Implementing the trait for your own type is how
//! package metadata from a file system or a registry enters the solver; the
//! solver consumes it behind `&dyn DependencyProvider` and needs only three
//! operations: list the versions of a package (most preferred first),
//! list the dependencies of a package version, and optionally pick the
//! preferred version inside a set as a fast path.
//!
//! # Solution and error reporting
//!
//! When everything goes well, the algorithm finds and returns a complete
//! set of direct and indirect dependencies satisfying all the constraints,
//! as a [SelectedDependencies] map. But sometimes there is no solution
//! because dependencies are incompatible. In such cases,
//! [resolve] returns a
//! [ResolveError::NoSolution(derivation_tree)](ResolveError::NoSolution),
//! where the provided derivation tree is a custom binary tree containing
//! the full chain of reasons why there is no solution.
//!
//! All the items in the tree are called incompatibilities and may be of two
//! types, either "external" or "derived". Leaves of the tree are external
//! incompatibilities, and nodes are derived. External incompatibilities
//! have reasons that are independent of the way this algorithm is
//! implemented such as
//!  - dependencies: package "a" at version 1 depends on package "b" at version 4
//!  - missing dependencies: dependencies of package "a" are unavailable
//!  - absence of version: there is no version of package "a" higher than version 5
//!
//! Derived incompatibilities are obtained during the algorithm execution by
//! deduction, such as if "a" depends on "b" and "b" depends on "c", "a"
//! depends on "c".
//!
//! This crate defines a [Reporter] trait, with an associated
//! output type and a single method. Implementing a [Reporter] may involve a
//! lot of heuristics to make the output human-readable and natural. For
//! convenience, we provide a default implementation
//! [DefaultStringReporter] that outputs the report as a [String]. You may
//! use it as follows:
//! ```
//! use pubgrub_resolver::{
//!     resolve, DefaultStringReporter, OfflineDependencyProvider, Package, Reporter, ResolveError,
//! };
//!
//! let mut dependency_provider = OfflineDependencyProvider::new();
//! let root = Package::root("root");
//! let z = Package::new("z");
//! dependency_provider.add_dependencies(
//!     root.clone(),
//!     (1, 0, 0),
//!     [(z.clone(), "==1.0.0".parse().unwrap())],
//! );
//! dependency_provider.add_dependencies(z, (2, 0, 0), []);
//!
//! match resolve(&dependency_provider, root, (1, 0, 0)) {
//!     Ok(solution) => println!("{:?}", solution),
//!     Err(ResolveError::NoSolution(mut derivation_tree)) => {
//!         derivation_tree.collapse_no_versions();
//!         eprintln!("{}", DefaultStringReporter::report(&derivation_tree));
//!     }
//!     Err(err) => panic!("{:?}", err),
//! };
//! ```
//! Notice that we also used
//! [collapse_no_versions()](DerivationTree::collapse_no_versions) above.
//! This method simplifies the derivation tree to get rid of the
//! [NoVersions](External::NoVersions) external incompatibilities in the
//! derivation tree. Beware though that if you are using some kind of
//! offline mode with a cache, you may want to know that some versions do
//! not exist in your cache.

#![warn(missing_docs)]

mod error;
mod internal;
mod package;
mod provider;
mod range;
mod report;
#[cfg(feature = "serde")]
mod scenario;
mod solver;
mod term;
mod type_aliases;
mod version;

pub use error::{InvalidConstraintError, InvalidVersionError, ProviderError, ResolveError};
pub use package::Package;
pub use provider::{
    Dependencies, DependencyConstraints, DependencyProvider, OfflineDependencyProvider,
};
pub use range::Range;
pub use report::{DefaultStringReporter, DerivationTree, Derived, External, Reporter};
#[cfg(feature = "serde")]
pub use scenario::{Scenario, ScenarioDependency, ScenarioPackage};
pub use solver::{resolve, Resolver};
pub use term::Term;
pub use type_aliases::{Map, SelectedDependencies, Set};
pub use version::{Version, VersionSet};
