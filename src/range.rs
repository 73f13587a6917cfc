// SPDX-License-Identifier: MPL-2.0

//! Ranges are constraints defining sets of versions.
//!
//! A [Range] is stored as an ordered sequence of non-overlapping,
//! non-adjacent half-open intervals, each delimited by a lower and an upper
//! [Bound]. That representation is canonical: two ranges describe the same
//! set of versions if and only if they are structurally equal, which is what
//! makes `==` set equality and lets the solver compare version sets cheaply.
//!
//! The canonical form of the empty set is the empty sequence, and the full
//! set is the single segment `(Unbounded, Unbounded)`. Note that the algebra
//! treats the version space as dense: `>1.0.0` and `>=1.0.1` are different
//! sets even when no version happens to exist between the two bounds.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::ops::Bound;

/// A set of versions, represented as a canonical union of intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range<V> {
    segments: Vec<Segment<V>>,
}

type Segment<V> = (Bound<V>, Bound<V>);

impl<V> Range<V> {
    /// Empty set of versions.
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Set of all possible versions.
    pub fn full() -> Self {
        Self {
            segments: vec![(Bound::Unbounded, Bound::Unbounded)],
        }
    }

    /// Whether the set contains no version at all.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<V: Ord + Clone> Range<V> {
    /// Set containing exactly one version.
    pub fn singleton(v: impl Into<V>) -> Self {
        let v = v.into();
        Self {
            segments: vec![(Bound::Included(v.clone()), Bound::Included(v))],
        }
    }

    /// Set of all versions higher or equal to some version.
    pub fn higher_than(v: impl Into<V>) -> Self {
        Self {
            segments: vec![(Bound::Included(v.into()), Bound::Unbounded)],
        }
    }

    /// Set of all versions strictly higher than some version.
    pub fn strictly_higher_than(v: impl Into<V>) -> Self {
        Self {
            segments: vec![(Bound::Excluded(v.into()), Bound::Unbounded)],
        }
    }

    /// Set of all versions lower or equal to some version.
    pub fn lower_than(v: impl Into<V>) -> Self {
        Self {
            segments: vec![(Bound::Unbounded, Bound::Included(v.into()))],
        }
    }

    /// Set of all versions strictly lower than some version.
    pub fn strictly_lower_than(v: impl Into<V>) -> Self {
        Self {
            segments: vec![(Bound::Unbounded, Bound::Excluded(v.into()))],
        }
    }

    /// Set of versions from `v1` included to `v2` excluded.
    pub fn between(v1: impl Into<V>, v2: impl Into<V>) -> Self {
        let (lo, hi) = (Bound::Included(v1.into()), Bound::Excluded(v2.into()));
        if valid_segment(&lo, &hi) {
            Self {
                segments: vec![(lo, hi)],
            }
        } else {
            Self::empty()
        }
    }

    /// Whether the set contains the given version.
    pub fn contains(&self, version: &V) -> bool {
        self.segments.iter().any(|(lo, hi)| {
            let above = match lo {
                Bound::Unbounded => true,
                Bound::Included(v) => version >= v,
                Bound::Excluded(v) => version > v,
            };
            let below = match hi {
                Bound::Unbounded => true,
                Bound::Included(v) => version <= v,
                Bound::Excluded(v) => version < v,
            };
            above && below
        })
    }

    /// Set of all versions not contained in this one.
    pub fn complement(&self) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        // Lower bound of the gap currently being built, `None` past infinity.
        let mut gap_start = Some(Bound::Unbounded);
        for (lo, hi) in &self.segments {
            let gap_end = match lo {
                Bound::Unbounded => None,
                Bound::Included(v) => Some(Bound::Excluded(v.clone())),
                Bound::Excluded(v) => Some(Bound::Included(v.clone())),
            };
            if let (Some(start), Some(end)) = (gap_start, gap_end) {
                segments.push((start, end));
            }
            gap_start = match hi {
                Bound::Unbounded => None,
                Bound::Included(v) => Some(Bound::Excluded(v.clone())),
                Bound::Excluded(v) => Some(Bound::Included(v.clone())),
            };
        }
        if let Some(start) = gap_start {
            segments.push((start, Bound::Unbounded));
        }
        Self { segments }
    }

    /// Set of versions contained in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut segments = Vec::new();
        let (mut left, mut right) = (self.segments.iter(), other.segments.iter());
        let (mut l, mut r) = (left.next(), right.next());
        while let (Some(left_seg), Some(right_seg)) = (l, r) {
            let lo = match cmp_lower(&left_seg.0, &right_seg.0) {
                Ordering::Less => &right_seg.0,
                _ => &left_seg.0,
            };
            let hi = match cmp_upper(&left_seg.1, &right_seg.1) {
                Ordering::Greater => &right_seg.1,
                _ => &left_seg.1,
            };
            if valid_segment(lo, hi) {
                segments.push((lo.clone(), hi.clone()));
            }
            // Drop the segment ending first, it cannot overlap anything else.
            if cmp_upper(&left_seg.1, &right_seg.1) == Ordering::Less {
                l = left.next();
            } else {
                r = right.next();
            }
        }
        Self { segments }
    }

    /// Set of versions contained in at least one of the sets.
    pub fn union(&self, other: &Self) -> Self {
        let mut merged: Vec<&Segment<V>> =
            self.segments.iter().chain(other.segments.iter()).collect();
        merged.sort_by(|a, b| cmp_lower(&a.0, &b.0));
        let mut segments: Vec<Segment<V>> = Vec::with_capacity(merged.len());
        for segment in merged {
            match segments.last_mut() {
                Some(last) if bounds_connect(&last.1, &segment.0) => {
                    if cmp_upper(&segment.1, &last.1) == Ordering::Greater {
                        last.1 = segment.1.clone();
                    }
                }
                _ => segments.push(segment.clone()),
            }
        }
        Self { segments }
    }

    /// Whether the two sets have no version in common.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).is_empty()
    }

    /// Whether all versions of `self` are contained in `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        self == &self.intersection(other)
    }
}

/// Whether a segment contains at least one version.
fn valid_segment<V: Ord>(lo: &Bound<V>, hi: &Bound<V>) -> bool {
    match (lo, hi) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        (Bound::Included(a), Bound::Included(b)) => a <= b,
        (Bound::Included(a), Bound::Excluded(b))
        | (Bound::Excluded(a), Bound::Included(b))
        | (Bound::Excluded(a), Bound::Excluded(b)) => a < b,
    }
}

/// Total order of lower bounds: unbounded first, and at equal versions an
/// inclusive bound starts before an exclusive one.
fn cmp_lower<V: Ord>(a: &Bound<V>, b: &Bound<V>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

/// Total order of upper bounds: unbounded last, and at equal versions an
/// exclusive bound ends before an inclusive one.
fn cmp_upper<V: Ord>(a: &Bound<V>, b: &Bound<V>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

/// Whether the segment ending at `hi` overlaps or touches one starting at
/// `lo`, in which case their union is a single segment.
fn bounds_connect<V: Ord>(hi: &Bound<V>, lo: &Bound<V>) -> bool {
    match (hi, lo) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        (Bound::Included(a), Bound::Included(b))
        | (Bound::Included(a), Bound::Excluded(b))
        | (Bound::Excluded(a), Bound::Included(b)) => b <= a,
        // Both bounds exclude the shared version, so it would fall in a gap.
        (Bound::Excluded(a), Bound::Excluded(b)) => b < a,
    }
}

impl<V: Display + Eq> Display for Range<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "∅");
        }
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                write!(f, " | ")?;
            }
            match segment {
                (Bound::Unbounded, Bound::Unbounded) => write!(f, "*")?,
                (Bound::Unbounded, Bound::Included(v)) => write!(f, "<={v}")?,
                (Bound::Unbounded, Bound::Excluded(v)) => write!(f, "<{v}")?,
                (Bound::Included(v), Bound::Unbounded) => write!(f, ">={v}")?,
                (Bound::Excluded(v), Bound::Unbounded) => write!(f, ">{v}")?,
                (Bound::Included(a), Bound::Included(b)) if a == b => write!(f, "=={a}")?,
                (Bound::Included(a), Bound::Included(b)) => write!(f, ">={a}, <={b}")?,
                (Bound::Included(a), Bound::Excluded(b)) => write!(f, ">={a}, <{b}")?,
                (Bound::Excluded(a), Bound::Included(b)) => write!(f, ">{a}, <={b}")?,
                (Bound::Excluded(a), Bound::Excluded(b)) => write!(f, ">{a}, <{b}")?,
            }
        }
        Ok(())
    }
}

// TESTS #######################################################################

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;

    impl<V: Ord + Clone> Range<V> {
        /// Check segments are valid, sorted, non-overlapping and non-adjacent.
        pub(crate) fn check_invariants(self) -> Self {
            for (lo, hi) in &self.segments {
                assert!(valid_segment(lo, hi));
            }
            for adjacent in self.segments.windows(2) {
                assert!(!bounds_connect(&adjacent[0].1, &adjacent[1].0));
                assert_eq!(cmp_lower(&adjacent[0].0, &adjacent[1].0), Ordering::Less);
            }
            self
        }
    }

    /// Generate version sets from a random vector of deltas between bounds,
    /// with bounds randomly inclusive or exclusive.
    pub(crate) fn strategy() -> impl Strategy<Value = Range<u32>> {
        (
            any::<bool>(),
            prop::collection::vec(any::<(u32, bool)>(), 1..10),
        )
            .prop_map(|(start_unbounded, deltas)| segments_from_deltas(start_unbounded, deltas))
    }

    fn segments_from_deltas(start_unbounded: bool, deltas: Vec<(u32, bool)>) -> Range<u32> {
        let mut start = if start_unbounded {
            Some(Bound::Unbounded)
        } else {
            None
        };
        let mut largest: u32 = 0;
        let mut last_bound_was_inclusive = false;
        let mut segments = Vec::new();
        for (delta, inclusive) in deltas {
            largest = match largest.checked_add(delta) {
                Some(v) => v,
                // Skip a delta that would overflow the domain.
                None => continue,
            };
            let current = if inclusive {
                Bound::Included(largest)
            } else {
                Bound::Excluded(largest)
            };
            if let Some(start_bound) = start.take() {
                // A zero-width segment is only valid as Included..Included.
                if delta == 0 && !(matches!(start_bound, Bound::Included(_)) && inclusive) {
                    start = Some(start_bound);
                    continue;
                }
                last_bound_was_inclusive = inclusive;
                segments.push((start_bound, current));
            } else {
                // Touching the previous segment would break canonical form.
                if delta == 0 && (last_bound_was_inclusive || inclusive) {
                    continue;
                }
                start = Some(current);
            }
        }
        if let Some(start_bound) = start {
            segments.push((start_bound, Bound::Unbounded));
        }
        Range { segments }.check_invariants()
    }

    fn version_strategy() -> impl Strategy<Value = u32> {
        any::<u32>()
    }

    proptest! {
        #[test]
        fn negate_is_different(range in strategy()) {
            prop_assert_ne!(range.complement(), range);
        }

        #[test]
        fn double_negate_is_identity(range in strategy()) {
            prop_assert_eq!(range.complement().complement().check_invariants(), range);
        }

        #[test]
        fn negate_contains_opposite(range in strategy(), version in version_strategy()) {
            prop_assert_ne!(range.contains(&version), range.complement().contains(&version));
        }

        #[test]
        fn union_with_complement_is_full(range in strategy()) {
            prop_assert_eq!(range.union(&range.complement()).check_invariants(), Range::full());
        }

        #[test]
        fn intersection_with_complement_is_empty(range in strategy()) {
            prop_assert_eq!(range.intersection(&range.complement()).check_invariants(), Range::empty());
        }

        #[test]
        fn intersection_is_symmetric(r1 in strategy(), r2 in strategy()) {
            prop_assert_eq!(r1.intersection(&r2).check_invariants(), r2.intersection(&r1));
        }

        #[test]
        fn union_is_symmetric(r1 in strategy(), r2 in strategy()) {
            prop_assert_eq!(r1.union(&r2).check_invariants(), r2.union(&r1));
        }

        #[test]
        fn union_contains_either(r1 in strategy(), r2 in strategy(), version in version_strategy()) {
            prop_assert_eq!(
                r1.union(&r2).contains(&version),
                r1.contains(&version) || r2.contains(&version)
            );
        }

        #[test]
        fn intersection_contains_both(r1 in strategy(), r2 in strategy(), version in version_strategy()) {
            prop_assert_eq!(
                r1.intersection(&r2).contains(&version),
                r1.contains(&version) && r2.contains(&version)
            );
        }

        #[test]
        fn subset_of_intersection(r1 in strategy(), r2 in strategy()) {
            prop_assert!(r1.intersection(&r2).subset_of(&r1));
            prop_assert!(r1.intersection(&r2).subset_of(&r2));
        }

        #[test]
        fn is_disjoint_through_intersection(r1 in strategy(), r2 in strategy()) {
            prop_assert_eq!(r1.is_disjoint(&r2), r1.intersection(&r2) == Range::empty());
        }

        #[test]
        fn contains_the_singleton(version in version_strategy()) {
            prop_assert!(Range::singleton(version).contains(&version));
        }
    }

    #[test]
    fn full_is_complement_of_empty() {
        assert_eq!(Range::<u32>::empty().complement(), Range::full());
        assert_eq!(Range::<u32>::full().complement(), Range::empty());
    }

    #[test]
    fn excluded_bound_is_outside() {
        let range = Range::<u32>::strictly_higher_than(4u32);
        assert!(!range.contains(&4));
        assert!(range.contains(&5));
        let range = Range::<u32>::higher_than(4u32);
        assert!(range.contains(&4));
    }

    #[test]
    fn union_of_touching_bounds_merges() {
        // [.., 4] and (4, ..) cover everything.
        let below = Range::<u32>::lower_than(4u32);
        let above = Range::<u32>::strictly_higher_than(4u32);
        assert_eq!(below.union(&above), Range::full());
        // [.., 4) and (4, ..) leave the version 4 out.
        let strictly_below = Range::<u32>::strictly_lower_than(4u32);
        assert_eq!(
            strictly_below.union(&above),
            Range::singleton(4u32).complement()
        );
    }

    #[test]
    fn empty_intersection_is_canonical() {
        let left = Range::<u32>::between(1u32, 3u32);
        let right = Range::<u32>::between(5u32, 8u32);
        assert_eq!(left.intersection(&right), Range::empty());
        assert!(left.is_disjoint(&right));
    }

    #[test]
    fn between_with_reversed_bounds_is_empty() {
        assert_eq!(Range::<u32>::between(3u32, 3u32), Range::empty());
        assert_eq!(Range::<u32>::between(5u32, 3u32), Range::empty());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Range::<u32>::empty().to_string(), "∅");
        assert_eq!(Range::<u32>::full().to_string(), "*");
        assert_eq!(Range::<u32>::singleton(1u32).to_string(), "==1");
        assert_eq!(Range::<u32>::between(1u32, 3u32).to_string(), ">=1, <3");
        assert_eq!(
            Range::<u32>::strictly_lower_than(1u32)
                .union(&Range::higher_than(3u32))
                .to_string(),
            "<1 | >=3"
        );
    }
}
