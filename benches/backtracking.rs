// SPDX-License-Identifier: MPL-2.0

//! This bench monitors the performance of backtracking and term intersection.
//!
//! Dependencies are constructed in a way that all versions need to be tested
//! before finding a solution.

use criterion::*;
use pubgrub_resolver::{resolve, OfflineDependencyProvider, Package, Version, VersionSet};

/// Each version `x.0.0` of a package in the chain depends on the exact same
/// version of the next one, and the last package only exists at `1.0.0`, so
/// the whole chain has to be walked down once per candidate version.
fn backtracking_singletons(c: &mut Criterion, package_count: u32, version_count: u32) {
    let mut dependency_provider = OfflineDependencyProvider::new();
    let root = Package::root("root");
    let chain: Vec<Package> = (0..=package_count)
        .map(|n| Package::new(format!("pkg-{n}")))
        .collect();

    dependency_provider.add_dependencies(
        root.clone(),
        (1, 0, 0),
        [(chain[0].clone(), VersionSet::full())],
    );
    dependency_provider.add_dependencies(chain[package_count as usize].clone(), (1, 0, 0), []);

    for n in 0..package_count as usize {
        for v in 1..=version_count {
            dependency_provider.add_dependencies(
                chain[n].clone(),
                (v, 0, 0),
                [(
                    chain[n + 1].clone(),
                    VersionSet::singleton(Version::new(v, 0, 0)),
                )],
            );
        }
    }

    c.bench_function("backtracking_singletons", |b| {
        b.iter(|| {
            let _ = resolve(&dependency_provider, root.clone(), (1, 0, 0));
        })
    });
}

/// Ranged requirements that tighten along the chain force repeated term
/// intersections and a burst of backtracking near the end.
fn backtracking_ranges(c: &mut Criterion, package_count: u32, version_count: u32) {
    let mut dependency_provider = OfflineDependencyProvider::new();
    let root = Package::root("root");
    let chain: Vec<Package> = (0..=package_count)
        .map(|n| Package::new(format!("pkg-{n}")))
        .collect();

    dependency_provider.add_dependencies(
        root.clone(),
        (1, 0, 0),
        [(chain[0].clone(), VersionSet::full())],
    );
    dependency_provider.add_dependencies(chain[package_count as usize].clone(), (1, 0, 0), []);

    for n in 0..package_count as usize {
        for v in 1..=version_count {
            let requirement = VersionSet::higher_than(Version::new(version_count - v, 0, 0));
            dependency_provider.add_dependencies(
                chain[n].clone(),
                (v, 0, 0),
                [(chain[n + 1].clone(), requirement)],
            );
        }
    }

    c.bench_function("backtracking_ranges", |b| {
        b.iter(|| {
            let _ = resolve(&dependency_provider, root.clone(), (1, 0, 0));
        })
    });
}

fn bench_group(c: &mut Criterion) {
    backtracking_singletons(c, 100, 50);
    backtracking_ranges(c, 5, 50);
}

criterion_group!(benches, bench_group);
criterion_main!(benches);
