// SPDX-License-Identifier: MPL-2.0

//! JSON scenario documents describing whole dependency universes.
//!
//! Scenarios are how external tooling stores reproducible resolution
//! problems: a list of packages with their versions, and a list of
//! dependency declarations with textual constraints. The solver core never
//! reads these, materializing them into an
//! [OfflineDependencyProvider] is provider-side tooling.

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ResolveError};
use crate::package::Package;
use crate::provider::{DependencyConstraints, OfflineDependencyProvider};
use crate::type_aliases::Map;
use crate::version::{Version, VersionSet};

/// A whole dependency universe, as stored in scenario files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Every package of the universe with its available versions.
    pub packages: Vec<ScenarioPackage>,
    /// Dependency declarations between package versions.
    pub dependencies: Vec<ScenarioDependency>,
}

/// A package entry of a [Scenario].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPackage {
    /// Package name; `"root"` marks the root package.
    pub name: String,
    /// Available versions, in `MAJOR.MINOR.PATCH` form.
    pub versions: Vec<String>,
}

/// A dependency entry of a [Scenario]: `package` at `version` depends on
/// `dependency` within `constraint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDependency {
    /// The depending package.
    pub package: String,
    /// The depending version.
    pub version: String,
    /// The target package.
    pub dependency: String,
    /// The allowed versions of the target, e.g. `">=1.0.0, <2.0.0"`.
    pub constraint: String,
}

impl Scenario {
    /// Materialize the scenario as an in-memory provider, parsing every
    /// version and constraint and checking that dependency declarations only
    /// reference declared packages and versions.
    pub fn to_provider(&self) -> Result<OfflineDependencyProvider, ResolveError> {
        let mut declared: Map<(Package, Version), DependencyConstraints> = Map::default();
        for package_entry in &self.packages {
            let package = if package_entry.name == "root" {
                Package::root(&package_entry.name)
            } else {
                Package::new(&package_entry.name)
            };
            for version in &package_entry.versions {
                let version: Version = version.trim().parse()?;
                declared.entry((package.clone(), version)).or_default();
            }
        }
        for dependency in &self.dependencies {
            let package = Package::new(&dependency.package);
            let version: Version = dependency.version.trim().parse()?;
            let target = Package::new(&dependency.dependency);
            if !declared.keys().any(|(p, _)| p == &target) {
                return Err(ProviderError::UnknownPackage(target).into());
            }
            let set: VersionSet = dependency.constraint.parse()?;
            match declared.get_mut(&(package, version)) {
                Some(constraints) => {
                    constraints.insert(target, set);
                }
                None => {
                    return Err(ProviderError::Other(format!(
                        "dependency declared on unlisted version {}@{}",
                        dependency.package, dependency.version
                    ))
                    .into());
                }
            }
        }
        let mut provider = OfflineDependencyProvider::new();
        for ((package, version), constraints) in declared {
            provider.add_dependencies(package, version, constraints);
        }
        Ok(provider)
    }
}

// TESTS #######################################################################

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::resolve;

    #[test]
    fn scenario_roundtrip_and_solve() {
        let json = r#"{
            "name": "basic",
            "description": "root needs a and b",
            "packages": [
                {"name": "root", "versions": ["1.0.0"]},
                {"name": "a", "versions": ["1.0.0", "1.1.0"]},
                {"name": "b", "versions": ["1.0.0"]}
            ],
            "dependencies": [
                {"package": "root", "version": "1.0.0", "dependency": "a", "constraint": ">=1.0.0"},
                {"package": "root", "version": "1.0.0", "dependency": "b", "constraint": "*"}
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.name, "basic");
        let provider = scenario.to_provider().unwrap();
        let solution = resolve(&provider, Package::root("root"), (1, 0, 0)).unwrap();
        assert_eq!(solution[&Package::new("a")], Version::new(1, 1, 0));
        assert_eq!(solution[&Package::new("b")], Version::new(1, 0, 0));

        // Serialization of the document itself roundtrips.
        let reparsed: Scenario =
            serde_json::from_str(&serde_json::to_string(&scenario).unwrap()).unwrap();
        assert_eq!(reparsed.dependencies.len(), 2);
    }

    #[test]
    fn scenario_rejects_unknown_targets() {
        let scenario = Scenario {
            name: "broken".into(),
            description: None,
            packages: vec![ScenarioPackage {
                name: "root".into(),
                versions: vec!["1.0.0".into()],
            }],
            dependencies: vec![ScenarioDependency {
                package: "root".into(),
                version: "1.0.0".into(),
                dependency: "ghost".into(),
                constraint: "*".into(),
            }],
        };
        assert!(matches!(
            scenario.to_provider(),
            Err(ResolveError::Provider(ProviderError::UnknownPackage(p))) if p.name() == "ghost"
        ));
    }

    #[test]
    fn scenario_rejects_bad_versions() {
        let scenario = Scenario {
            name: "broken".into(),
            description: None,
            packages: vec![ScenarioPackage {
                name: "root".into(),
                versions: vec!["one.two.three".into()],
            }],
            dependencies: vec![],
        };
        assert!(matches!(
            scenario.to_provider(),
            Err(ResolveError::InvalidVersion(_))
        ));
    }
}
