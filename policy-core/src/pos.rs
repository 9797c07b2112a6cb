//! Source coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A single point in a source file.
///
/// `line` and `column` are both 1-based; `column` counts Unicode scalar
/// values (display cells), not bytes. `offset` is a 0-based UTF-8 byte
/// index, used for slicing the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Pos {
    pub const fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of source text, from `from` to `to` inclusive of both endpoints.
///
/// `from <= to` lexicographically (line, then column) is an invariant every
/// constructor upholds; callers that grow a range over time should use
/// [`Range::extend_to`] rather than rebuild the struct, so the "farthest
/// token wins" rule (never move `to` backwards) holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub file: Arc<str>,
    pub from: Pos,
    pub to: Pos,
}

impl Range {
    pub fn new(file: Arc<str>, from: Pos, to: Pos) -> Self {
        debug_assert!((from.line, from.column) <= (to.line, to.column));
        Self { file, from, to }
    }

    /// A zero-width range at a single point, for synthetic nodes.
    pub fn point(file: Arc<str>, at: Pos) -> Self {
        Self {
            file,
            from: at,
            to: at,
        }
    }

    /// The smallest range containing both `self` and `other`. Requires both
    /// ranges to belong to the same file.
    pub fn merge(&self, other: &Range) -> Range {
        debug_assert_eq!(self.file, other.file, "cannot merge ranges across files");
        let from = if (self.from.line, self.from.column) <= (other.from.line, other.from.column) {
            self.from
        } else {
            other.from
        };
        let to = if (self.to.line, self.to.column) >= (other.to.line, other.to.column) {
            self.to
        } else {
            other.to
        };
        Range {
            file: self.file.clone(),
            from,
            to,
        }
    }

    /// Widen `self.to` to `other.to` if `other` ends further along; never
    /// moves `to` backwards (invariant 6).
    pub fn extend_to(&mut self, other: &Range) {
        if (other.to.line, other.to.column) > (self.to.line, self.to.column) {
            self.to = other.to;
        }
    }

    pub fn contains(&self, other: &Range) -> bool {
        self.file == other.file
            && (self.from.line, self.from.column) <= (other.from.line, other.from.column)
            && (self.to.line, self.to.column) >= (other.to.line, other.to.column)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from.line == self.to.line {
            write!(
                f,
                "{}:{}:{}-{}",
                self.file, self.from.line, self.from.column, self.to.column
            )
        } else {
            write!(
                f,
                "{}:{}:{}-{}:{}",
                self.file, self.from.line, self.from.column, self.to.line, self.to.column
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> Arc<str> {
        Arc::from("policy.pl")
    }

    #[test]
    fn single_line_range_display() {
        let r = Range::new(file(), Pos::new(3, 1, 10), Pos::new(3, 8, 17));
        assert_eq!(r.to_string(), "policy.pl:3:1-8");
    }

    #[test]
    fn multi_line_range_display() {
        let r = Range::new(file(), Pos::new(3, 1, 10), Pos::new(5, 4, 40));
        assert_eq!(r.to_string(), "policy.pl:3:1-5:4");
    }

    #[test]
    fn merge_picks_outer_bounds() {
        let a = Range::new(file(), Pos::new(2, 1, 5), Pos::new(2, 5, 9));
        let b = Range::new(file(), Pos::new(2, 10, 14), Pos::new(3, 1, 20));
        let m = a.merge(&b);
        assert_eq!(m.from, a.from);
        assert_eq!(m.to, b.to);
    }

    #[test]
    fn extend_to_never_moves_backwards() {
        let mut r = Range::new(file(), Pos::new(1, 1, 0), Pos::new(1, 5, 4));
        let earlier = Range::new(file(), Pos::new(1, 1, 0), Pos::new(1, 3, 2));
        r.extend_to(&earlier);
        assert_eq!(r.to, Pos::new(1, 5, 4));

        let later = Range::new(file(), Pos::new(2, 1, 10), Pos::new(2, 1, 10));
        r.extend_to(&later);
        assert_eq!(r.to, later.to);
    }
}
