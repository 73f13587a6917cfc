// SPDX-License-Identifier: MPL-2.0

//! Publicly exported type aliases.

use crate::package::Package;
use crate::version::Version;

/// Map implementation used by the library.
pub type Map<K, V> = rustc_hash::FxHashMap<K, V>;

/// Set implementation used by the library.
pub type Set<V> = rustc_hash::FxHashSet<V>;

/// Concrete package versions picked by the library during [resolve](crate::resolve).
///
/// Contains every package that received a decision, the root included.
pub type SelectedDependencies = Map<Package, Version>;
