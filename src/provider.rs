// SPDX-License-Identifier: MPL-2.0

//! Trait for the external source of package metadata, and a simple
//! implementation holding everything in memory.

use std::collections::BTreeMap;

use crate::error::ProviderError;
use crate::package::Package;
use crate::type_aliases::Map;
use crate::version::{Version, VersionSet};

/// Subset of versions allowed for each dependency of a package version.
pub type DependencyConstraints = Map<Package, VersionSet>;

/// An enum used by [DependencyProvider] that holds information about package
/// dependencies.
#[derive(Debug, Clone)]
pub enum Dependencies {
    /// The version does not exist, or its dependencies cannot be determined.
    Unknown,
    /// Container for all available package versions. An existing version with
    /// no dependencies reports an empty map, which is not the same thing as
    /// [Dependencies::Unknown].
    Known(DependencyConstraints),
}

/// Trait that allows the algorithm to retrieve available packages and their
/// dependencies. An implementor needs to be supplied to the
/// [resolve](crate::resolve) function.
///
/// The solver assumes referential stability: within one solve, repeated calls
/// with equal arguments must return equal results.
pub trait DependencyProvider {
    /// All known versions of a package, from most preferred to least
    /// preferred. The solver treats the first version satisfying a constraint
    /// as the chosen one, so preference order is an input of the solution.
    ///
    /// Asking for a package the provider has never heard of is an error, an
    /// empty list of versions is not.
    fn list_versions(&self, package: &Package) -> Result<Vec<Version>, ProviderError>;

    /// Retrieves the package dependencies. Return [Dependencies::Unknown] if
    /// the version does not exist or its dependencies are unavailable.
    fn get_dependencies(
        &self,
        package: &Package,
        version: &Version,
    ) -> Result<Dependencies, ProviderError>;

    /// The most preferred version of the package inside the given set, if
    /// any. The default implementation filters
    /// [list_versions](DependencyProvider::list_versions); providers with a
    /// cheaper lookup can override it. The solver validates the answer and
    /// falls back to filtering itself if a version outside the set is
    /// returned.
    fn choose_version(
        &self,
        package: &Package,
        set: &VersionSet,
    ) -> Result<Option<Version>, ProviderError> {
        Ok(self
            .list_versions(package)?
            .into_iter()
            .find(|v| set.contains(v)))
    }
}

/// A basic implementation of [DependencyProvider] that
/// contains all dependency information available in memory.
/// Versions are preferred from the newest to the oldest.
#[derive(Debug, Clone, Default)]
pub struct OfflineDependencyProvider {
    dependencies: Map<Package, BTreeMap<Version, DependencyConstraints>>,
}

impl OfflineDependencyProvider {
    /// Creates an empty OfflineDependencyProvider with no dependencies.
    pub fn new() -> Self {
        Self {
            dependencies: Map::default(),
        }
    }

    /// Registers the dependencies of a package and version pair.
    /// Dependencies must be added with a single call to
    /// [add_dependencies](OfflineDependencyProvider::add_dependencies).
    /// All subsequent calls to
    /// [add_dependencies](OfflineDependencyProvider::add_dependencies) for a
    /// given package version pair will replace the dependencies by the new
    /// ones.
    pub fn add_dependencies<I: IntoIterator<Item = (Package, VersionSet)>>(
        &mut self,
        package: Package,
        version: impl Into<Version>,
        dependencies: I,
    ) {
        let package_deps = dependencies.into_iter().collect();
        let v = version.into();
        *self
            .dependencies
            .entry(package)
            .or_default()
            .entry(v)
            .or_default() = package_deps;
    }

    /// Lists packages that have been saved.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.dependencies.keys()
    }

    /// Lists versions of saved packages in sorted order. Returns [None] if
    /// no information is available regarding that package.
    pub fn versions(&self, package: &Package) -> Option<impl Iterator<Item = &Version>> {
        self.dependencies.get(package).map(|versions| versions.keys())
    }

    fn versions_of(
        &self,
        package: &Package,
    ) -> Result<&BTreeMap<Version, DependencyConstraints>, ProviderError> {
        self.dependencies
            .get(package)
            .ok_or_else(|| ProviderError::UnknownPackage(package.clone()))
    }
}

impl DependencyProvider for OfflineDependencyProvider {
    fn list_versions(&self, package: &Package) -> Result<Vec<Version>, ProviderError> {
        Ok(self.versions_of(package)?.keys().rev().copied().collect())
    }

    fn get_dependencies(
        &self,
        package: &Package,
        version: &Version,
    ) -> Result<Dependencies, ProviderError> {
        Ok(match self.versions_of(package)?.get(version) {
            None => Dependencies::Unknown,
            Some(dependencies) => Dependencies::Known(dependencies.clone()),
        })
    }

    fn choose_version(
        &self,
        package: &Package,
        set: &VersionSet,
    ) -> Result<Option<Version>, ProviderError> {
        Ok(self
            .versions_of(package)?
            .keys()
            .rev()
            .find(|v| set.contains(v))
            .copied())
    }
}

// TESTS #######################################################################

#[cfg(test)]
mod tests {
    use super::*;

    fn version(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn versions_are_preferred_newest_first() {
        let mut provider = OfflineDependencyProvider::new();
        let foo = Package::new("foo");
        provider.add_dependencies(foo.clone(), version("1.0.0"), []);
        provider.add_dependencies(foo.clone(), version("1.2.0"), []);
        provider.add_dependencies(foo.clone(), version("1.1.0"), []);

        assert_eq!(provider.packages().collect::<Vec<_>>(), vec![&foo]);
        assert_eq!(provider.versions(&foo).unwrap().count(), 3);
        assert_eq!(
            provider.list_versions(&foo).unwrap(),
            vec![version("1.2.0"), version("1.1.0"), version("1.0.0")]
        );
        assert_eq!(
            provider
                .choose_version(&foo, &"<1.2.0".parse().unwrap())
                .unwrap(),
            Some(version("1.1.0"))
        );
    }

    #[test]
    fn unknown_package_is_an_error() {
        let provider = OfflineDependencyProvider::new();
        let ghost = Package::new("ghost");
        assert_eq!(
            provider.list_versions(&ghost),
            Err(ProviderError::UnknownPackage(ghost.clone()))
        );
    }

    #[test]
    fn unknown_version_is_not_an_error() {
        let mut provider = OfflineDependencyProvider::new();
        let foo = Package::new("foo");
        provider.add_dependencies(foo.clone(), version("1.0.0"), []);
        assert!(matches!(
            provider.get_dependencies(&foo, &version("9.9.9")),
            Ok(Dependencies::Unknown)
        ));
        assert!(matches!(
            provider.get_dependencies(&foo, &version("1.0.0")),
            Ok(Dependencies::Known(deps)) if deps.is_empty()
        ));
    }
}
