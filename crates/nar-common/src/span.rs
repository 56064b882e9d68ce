use std::fmt;

use serde::Serialize;

/// Byte-offset span into source text. Start is inclusive, end is exclusive.
///
/// Positions are byte offsets; [`LineIndex`] turns them into lines and
/// columns for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// Whether the span is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Index of a source file within one compilation session.
///
/// The driver owns the table mapping ids to paths; the typing core only
/// carries the id so locations stay `Copy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub u32);

/// A span qualified by the file it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub file: FileId,
    pub span: Span,
}

impl Location {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Location {
            file,
            span: Span::new(start, end),
        }
    }

    /// Whether `other` is in the same file and inside this location.
    ///
    /// An empty (synthetic) location never contains anything.
    pub fn contains(&self, other: &Location) -> bool {
        !self.span.is_empty() && self.file == other.file && self.span.contains(other.span)
    }

    pub fn start(&self) -> u32 {
        self.span.start
    }

    pub fn end(&self) -> u32 {
        self.span.end
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}..{}", self.file.0, self.span.start, self.span.end)
    }
}

/// Line starts of one source text, for turning byte offsets into
/// 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();
        LineIndex { starts }
    }

    /// Line and column of `offset`, both 1-based. Columns count bytes.
    pub fn position(&self, offset: u32) -> (u32, u32) {
        let line = self.starts.partition_point(|&start| start <= offset).max(1) - 1;
        (line as u32 + 1, offset - self.starts[line] + 1)
    }

    pub fn lines(&self) -> usize {
        self.starts.len()
    }
}
