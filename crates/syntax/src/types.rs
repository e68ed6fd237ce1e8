use serde::{Deserialize, Serialize};

/// Half-open byte span `[start, end)` into the source of a translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A function definition found in a translation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Identifier taken from the function declarator
    pub name: String,

    /// Everything before the body, trimmed (e.g. `static int foo (char *s)`)
    pub signature: String,

    /// Span of the whole definition, signature and body included
    pub byte_range: ByteRange,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,
}

impl FunctionRecord {
    /// Get the number of lines spanned by the definition
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Which definition wins when two functions share a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the definition that appears first in the source
    #[default]
    KeepFirst,

    /// Keep the definition that appears last in the source
    KeepLast,

    /// Fail indexing with `SyntaxError::DuplicateFunction`
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range_len() {
        assert_eq!(ByteRange::new(4, 10).len(), 6);
        assert!(ByteRange::new(3, 3).is_empty());
        assert_eq!(ByteRange::new(10, 4).len(), 0);
    }

    #[test]
    fn test_line_count() {
        let record = FunctionRecord {
            name: "foo".into(),
            signature: "int foo(void)".into(),
            byte_range: ByteRange::new(0, 30),
            start_line: 3,
            end_line: 7,
        };
        assert_eq!(record.line_count(), 5);
    }
}
