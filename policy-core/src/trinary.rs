//! Three-valued (Kleene) logic.
//!
//! `Trinary` is stored as an integer code matching the source format's own
//! encoding (`1`/`-1`/`0`) so serialization round-trips exactly, but callers
//! should treat the codes as an implementation detail and use the named
//! variants.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Trinary {
    False = -1,
    Unknown = 0,
    True = 1,
}

impl Trinary {
    pub fn code(self) -> i8 {
        self as i8
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(Trinary::True),
            -1 => Some(Trinary::False),
            0 => Some(Trinary::Unknown),
            _ => None,
        }
    }

    /// `not unknown = unknown`; otherwise the ordinary boolean flip.
    pub fn not(self) -> Trinary {
        match self {
            Trinary::True => Trinary::False,
            Trinary::False => Trinary::True,
            Trinary::Unknown => Trinary::Unknown,
        }
    }

    /// Kleene strong conjunction: `false` annihilates, `true` is the
    /// identity, two unknowns stay unknown.
    pub fn and(self, other: Trinary) -> Trinary {
        use Trinary::*;
        match (self, other) {
            (False, _) | (_, False) => False,
            (True, True) => True,
            _ => Unknown,
        }
    }

    /// Kleene strong disjunction, dual to [`Trinary::and`].
    pub fn or(self, other: Trinary) -> Trinary {
        use Trinary::*;
        match (self, other) {
            (True, _) | (_, True) => True,
            (False, False) => False,
            _ => Unknown,
        }
    }

    /// Value equality — *not* Kleene-lifted, per the language spec: two
    /// trinary values are equal iff their codes match.
    pub fn equals(self, other: Trinary) -> bool {
        self == other
    }

    /// `True` is truthy; `False` and `Unknown` are not. Used by quantifier
    /// predicates and `if`.
    pub fn is_truthy(self) -> bool {
        matches!(self, Trinary::True)
    }
}

impl fmt::Display for Trinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trinary::True => "true",
            Trinary::False => "false",
            Trinary::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl std::ops::Not for Trinary {
    type Output = Trinary;
    fn not(self) -> Trinary {
        Trinary::not(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Trinary::*;

    const ALL: [Trinary; 3] = [True, False, Unknown];

    #[test]
    fn double_negation_is_identity() {
        for a in ALL {
            assert_eq!(a.not().not(), a);
        }
    }

    #[test]
    fn and_or_are_commutative_and_associative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.and(b), b.and(a));
                assert_eq!(a.or(b), b.or(a));
                for c in ALL {
                    assert_eq!(a.and(b).and(c), a.and(b.and(c)));
                    assert_eq!(a.or(b).or(c), a.or(b.or(c)));
                }
            }
        }
    }

    #[test]
    fn de_morgan_holds() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.and(b).not(), a.not().or(b.not()));
                assert_eq!(a.or(b).not(), a.not().and(b.not()));
            }
        }
    }

    #[test]
    fn and_truth_table() {
        assert_eq!(True.and(True), True);
        assert_eq!(True.and(False), False);
        assert_eq!(True.and(Unknown), Unknown);
        assert_eq!(False.and(True), False);
        assert_eq!(False.and(False), False);
        assert_eq!(False.and(Unknown), False);
        assert_eq!(Unknown.and(True), Unknown);
        assert_eq!(Unknown.and(False), False);
        assert_eq!(Unknown.and(Unknown), Unknown);
    }

    #[test]
    fn or_truth_table() {
        assert_eq!(True.or(True), True);
        assert_eq!(True.or(False), True);
        assert_eq!(True.or(Unknown), True);
        assert_eq!(False.or(True), True);
        assert_eq!(False.or(False), False);
        assert_eq!(False.or(Unknown), Unknown);
        assert_eq!(Unknown.or(True), True);
        assert_eq!(Unknown.or(False), Unknown);
        assert_eq!(Unknown.or(Unknown), Unknown);
    }

    #[test]
    fn display_matches_serialization_keywords() {
        assert_eq!(True.to_string(), "true");
        assert_eq!(False.to_string(), "false");
        assert_eq!(Unknown.to_string(), "unknown");
    }
}
