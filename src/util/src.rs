use std::fmt;

/// A byte offset into the source text.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SrcLoc(usize);

impl SrcLoc {
    pub fn start() -> Self {
        Self(0)
    }

    pub fn offset(self) -> usize {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn advance(self, c: char) -> Self {
        Self(self.0 + c.len_utf8())
    }

    pub fn later_than(self, other: Self) -> bool {
        self.0 > other.0
    }

    /// Zero-based (line, column) of this location within `code`.
    pub fn in_context(&self, code: &str) -> (usize, usize) {
        let mut pos = self.0;
        for (i, line) in code.split('\n').enumerate() {
            if pos <= line.len() {
                return (i, line[..pos.min(line.len())].chars().count());
            }
            pos -= line.len() + 1;
        }
        (code.split('\n').count(), 0)
    }
}

impl fmt::Debug for SrcLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<usize> for SrcLoc {
    fn from(pos: usize) -> Self {
        Self(pos)
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum SrcRegion {
    None,
    Range(SrcLoc, SrcLoc),
}

impl SrcRegion {
    pub fn none() -> Self {
        SrcRegion::None
    }

    pub fn single(loc: SrcLoc) -> Self {
        SrcRegion::Range(loc, loc.next())
    }

    pub fn range(from: SrcLoc, until: SrcLoc) -> SrcRegion {
        if from.0 < until.0 {
            SrcRegion::Range(from, until)
        } else {
            SrcRegion::None
        }
    }

    pub fn start(&self) -> Option<SrcLoc> {
        match self {
            SrcRegion::Range(from, _) => Some(*from),
            SrcRegion::None => None,
        }
    }

    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (SrcRegion::None, other) => other,
            (this, SrcRegion::None) => this,
            (SrcRegion::Range(from_a, until_a), SrcRegion::Range(from_b, until_b)) =>
                SrcRegion::Range(from_a.min(from_b), until_a.max(until_b)),
        }
    }

    pub fn later_than(self, other: Self) -> bool {
        match (self, other) {
            (SrcRegion::Range(_, until_a), SrcRegion::Range(_, until_b)) => until_a.later_than(until_b),
            (SrcRegion::Range(_, _), SrcRegion::None) => true,
            _ => false,
        }
    }

    pub fn in_context(&self, code: &str) -> Option<((usize, usize), (usize, usize))> {
        match self {
            SrcRegion::Range(from, until) => Some((from.in_context(code), until.in_context(code))),
            SrcRegion::None => None,
        }
    }
}

impl fmt::Debug for SrcRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SrcRegion::None => write!(f, "<none>"),
            SrcRegion::Range(from, to) => write!(f, "{:?}:{:?}", from, to),
        }
    }
}

impl From<usize> for SrcRegion {
    fn from(pos: usize) -> Self {
        SrcRegion::single(SrcLoc::from(pos))
    }
}

impl From<(usize, usize)> for SrcRegion {
    fn from((from, to): (usize, usize)) -> Self {
        SrcRegion::range(SrcLoc::from(from), SrcLoc::from(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loc_in_context() {
        let code = "(define a 1)\n(+ a\n   2)";
        assert_eq!(SrcLoc::from(0).in_context(code), (0, 0));
        assert_eq!(SrcLoc::from(13).in_context(code), (1, 0));
        assert_eq!(SrcLoc::from(21).in_context(code), (2, 3));
    }

    #[test]
    fn test_region_union() {
        let a = SrcRegion::from((2, 4));
        let b = SrcRegion::from((7, 9));
        assert_eq!(a.union(b), SrcRegion::from((2, 9)));
        assert_eq!(a.union(b).start().map(SrcLoc::offset), Some(2));
        assert_eq!(SrcRegion::none().start(), None);
        assert_eq!(SrcRegion::none().union(b), b);
        assert!(b.later_than(a));
        assert!(!a.later_than(b));
    }
}
