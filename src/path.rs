use std::fmt;

use memchr::memchr_iter;
use smallvec::SmallVec;
use smol_str::SmolStr;

pub const SEPARATOR: char = '.';
pub const SEPARATOR_STR: &str = ".";

/// One `.`-delimited unit of a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment(SmolStr);

impl Segment {
    pub fn new(text: impl Into<SmolStr>) -> Self {
        Segment(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_smol_str(&self) -> &SmolStr {
        &self.0
    }

    pub fn is_index(&self) -> bool {
        is_index_segment(&self.0)
    }

    /// Position addressed by an index segment, `None` for key segments and
    /// digit segments above [`MAX_INDEX`].
    pub fn index(&self) -> Option<usize> {
        segment_index(&self.0)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed dotted header such as `items.3.name`. Always has at least one
/// segment.
///
/// # Examples
/// ```
/// use csv2json::Path;
///
/// let path = Path::parse("items.3.name");
/// assert_eq!(path.depth(), 3);
/// assert!(path.parents()[1].is_index());
/// assert_eq!(path.last().as_str(), "name");
/// assert_eq!(path.to_string(), "items.3.name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    parents: SmallVec<[Segment; 4]>,
    last: Segment,
}

impl Path {
    pub fn parse(input: &str) -> Self {
        let mut parents = SmallVec::new();
        let mut start = 0;
        for idx in memchr_iter(SEPARATOR as u8, input.as_bytes()) {
            parents.push(Segment::new(&input[start..idx]));
            start = idx + 1;
        }
        Self {
            parents,
            last: Segment::new(&input[start..]),
        }
    }

    /// Every segment but the last.
    pub fn parents(&self) -> &[Segment] {
        &self.parents
    }

    pub fn last(&self) -> &Segment {
        &self.last
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.parents.iter().chain(std::iter::once(&self.last))
    }

    /// Number of segments, at least 1.
    pub fn depth(&self) -> usize {
        self.parents.len() + 1
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments().enumerate() {
            if idx > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}

/// Largest position an index segment may address. Digit segments above it
/// are keys, so a header can never demand an unbounded sequence.
pub const MAX_INDEX: usize = 999_999;

/// Non-empty, ASCII digits only, and at most [`MAX_INDEX`].
pub fn is_index_segment(segment: &str) -> bool {
    segment_index(segment).is_some()
}

pub fn segment_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    segment.parse::<usize>().ok().filter(|index| *index <= MAX_INDEX)
}

/// The dotted path of the node currently being visited by a tree walk.
///
/// Pushing and popping reuse one buffer so lookups by dotted string do not
/// allocate per node.
#[derive(Debug, Default)]
pub struct PathCursor {
    dotted: String,
    marks: SmallVec<[usize; 8]>,
}

impl PathCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: &str) {
        self.marks.push(self.dotted.len());
        if self.marks.len() > 1 {
            self.dotted.push(SEPARATOR);
        }
        self.dotted.push_str(segment);
    }

    pub fn push_index(&mut self, index: usize) {
        let mut buffer = itoa::Buffer::new();
        self.push(buffer.format(index));
    }

    pub fn pop(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.dotted.truncate(mark);
        }
    }

    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    pub fn as_str(&self) -> &str {
        &self.dotted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_segments() {
        let path = Path::parse("abc.0.def.10");
        let kinds: Vec<bool> = path.segments().map(Segment::is_index).collect();
        assert_eq!(kinds, vec![false, true, false, true]);
        assert_eq!(path.last().index(), Some(10));
    }

    #[test]
    fn parse_keeps_empty_segments() {
        let root = Path::parse("");
        assert_eq!(root.depth(), 1);
        assert!(root.parents().is_empty());
        assert_eq!(root.last().as_str(), "");
        let path = Path::parse("a..b");
        assert_eq!(path.depth(), 3);
        assert!(!path.parents()[1].is_index());
    }

    #[test]
    fn index_requires_ascii_digits() {
        assert!(is_index_segment("007"));
        assert!(!is_index_segment("-1"));
        assert!(!is_index_segment("1e3"));
        assert!(!is_index_segment("\u{0663}"));
        assert_eq!(segment_index("99999999999999999999999"), None);
    }

    #[test]
    fn oversized_digit_segments_are_keys() {
        assert_eq!(segment_index("999999"), Some(MAX_INDEX));
        assert_eq!(segment_index("1000000"), None);
        assert_eq!(segment_index("18446744073709551615"), None);
        assert!(!Segment::new("99999999999").is_index());
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Path::parse("a.1.b").to_string(), "a.1.b");
        assert_eq!(Path::parse("a.1.b"), Path::parse("a.1.b"));
        assert_ne!(Path::parse("a.1"), Path::parse("a.01"));
    }

    #[test]
    fn cursor_pushes_and_pops() {
        let mut cursor = PathCursor::new();
        assert_eq!(cursor.as_str(), "");
        cursor.push("abc");
        cursor.push_index(3);
        assert_eq!(cursor.as_str(), "abc.3");
        assert_eq!(cursor.depth(), 2);
        cursor.pop();
        cursor.push("def");
        assert_eq!(cursor.as_str(), "abc.def");
        cursor.pop();
        cursor.pop();
        assert_eq!(cursor.as_str(), "");
        cursor.pop();
        assert_eq!(cursor.depth(), 0);
    }
}
