// SPDX-License-Identifier: MPL-2.0

//! Semantic version identities and the constraint syntax over them.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::{InvalidConstraintError, InvalidVersionError};
use crate::range::Range;

/// Set of [Version]s accepted by a dependency requirement.
pub type VersionSet = Range<Version>;

/// A semantic version of the `MAJOR.MINOR.PATCH` form.
///
/// Versions are ordered lexicographically on the triple and compared by
/// value, so they can be used as map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl Version {
    /// Create a version with "major", "minor" and "patch" values.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl From<(u32, u32, u32)> for Version {
    fn from((major, minor, patch): (u32, u32, u32)) -> Self {
        Self::new(major, minor, patch)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = InvalidVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn component(part: &str, input: &str) -> Result<u32, InvalidVersionError> {
            // `u32::from_str` would accept a leading `+`.
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(InvalidVersionError::new(input));
            }
            part.parse().map_err(|_| InvalidVersionError::new(input))
        }

        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(major), Some(minor), Some(patch), None) => Ok(Self {
                major: component(major, s)?,
                minor: component(minor, s)?,
                patch: component(patch, s)?,
            }),
            _ => Err(InvalidVersionError::new(s)),
        }
    }
}

/// Parse a compound constraint such as `">=1.0.0, <2.0.0"`.
///
/// The constraint is a comma-separated intersection of atoms. An atom is
/// `*` (every version), an operator `>=`, `>`, `<=`, `<` or `==` followed by
/// a version, or a bare version (a singleton). Whitespace around atoms and
/// between the operator and the version is ignored.
impl FromStr for VersionSet {
    type Err = InvalidConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = VersionSet::full();
        for atom in s.split(',') {
            set = set.intersection(&parse_atom(atom.trim(), s)?);
        }
        Ok(set)
    }
}

fn parse_atom(atom: &str, constraint: &str) -> Result<VersionSet, InvalidConstraintError> {
    if atom == "*" {
        return Ok(VersionSet::full());
    }
    let version_of = |rest: &str| -> Result<Version, InvalidConstraintError> {
        rest.trim()
            .parse()
            .map_err(|source| InvalidConstraintError::Version {
                constraint: constraint.to_string(),
                source,
            })
    };
    if let Some(rest) = atom.strip_prefix(">=") {
        Ok(VersionSet::higher_than(version_of(rest)?))
    } else if let Some(rest) = atom.strip_prefix("<=") {
        Ok(VersionSet::lower_than(version_of(rest)?))
    } else if let Some(rest) = atom.strip_prefix("==") {
        Ok(VersionSet::singleton(version_of(rest)?))
    } else if let Some(rest) = atom.strip_prefix('>') {
        Ok(VersionSet::strictly_higher_than(version_of(rest)?))
    } else if let Some(rest) = atom.strip_prefix('<') {
        Ok(VersionSet::strictly_lower_than(version_of(rest)?))
    } else if atom.starts_with(|c: char| c.is_ascii_digit()) {
        Ok(VersionSet::singleton(version_of(atom)?))
    } else {
        Err(InvalidConstraintError::UnknownOperator {
            constraint: constraint.to_string(),
            atom: atom.to_string(),
        })
    }
}

// TESTS #######################################################################

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn set(s: &str) -> VersionSet {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display_roundtrip() {
        assert_eq!(v("1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("0.0.0").to_string(), "0.0.0");
        assert_eq!(v("10.20.30").to_string(), "10.20.30");
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.9") < v("1.1.0"));
        assert!(v("1.9.9") < v("2.0.0"));
    }

    #[test]
    fn rejects_malformed_versions() {
        for input in ["", "1", "1.0", "1.0.0.0", "1.0.a", "1.-1.0", "1.0.+2", "v1.0.0"] {
            assert!(input.parse::<Version>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn parse_constraint_atoms() {
        assert_eq!(set("*"), VersionSet::full());
        assert_eq!(set(">=1.0.0"), VersionSet::higher_than(v("1.0.0")));
        assert_eq!(set(">1.0.0"), VersionSet::strictly_higher_than(v("1.0.0")));
        assert_eq!(set("<=1.0.0"), VersionSet::lower_than(v("1.0.0")));
        assert_eq!(set("<1.0.0"), VersionSet::strictly_lower_than(v("1.0.0")));
        assert_eq!(set("==1.0.0"), VersionSet::singleton(v("1.0.0")));
        assert_eq!(set("1.0.0"), VersionSet::singleton(v("1.0.0")));
    }

    #[test]
    fn parse_compound_constraint() {
        assert_eq!(
            set(">=1.0.0, <2.0.0"),
            VersionSet::between(v("1.0.0"), v("2.0.0"))
        );
        assert_eq!(
            set(" >= 1.0.0 ,<2.0.0 "),
            VersionSet::between(v("1.0.0"), v("2.0.0"))
        );
        assert_eq!(set(">=2.0.0, <1.0.0"), VersionSet::empty());
    }

    #[test]
    fn constraint_errors() {
        assert!(matches!(
            "~1.0.0".parse::<VersionSet>(),
            Err(InvalidConstraintError::UnknownOperator { .. })
        ));
        assert!(matches!(
            ">=1.0".parse::<VersionSet>(),
            Err(InvalidConstraintError::Version { .. })
        ));
    }

    #[test]
    fn constraint_algebra_roundtrip() {
        let s = set(">=1.0.0, <2.0.0");
        let t = set(">=1.5.0");
        assert_eq!(s.intersection(&t), set(">=1.5.0, <2.0.0"));
        assert_eq!(s.complement(), set("<1.0.0").union(&set(">=2.0.0")));
        assert!(s.contains(&v("1.0.0")));
        assert!(!s.contains(&v("2.0.0")));
    }
}
