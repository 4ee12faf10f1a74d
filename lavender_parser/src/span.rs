//! Span information for source locations
//!
//! Byte-offset spans with line/column tracking for error reporting.

use serde::{Deserialize, Serialize};

/// Represents a span in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset start (0-indexed)
    pub start: usize,
    /// Byte offset end (exclusive)
    pub end: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column (1-indexed, in bytes)
    pub column: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Create an empty span at position 0
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the length of the span in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Helper struct to track line and column positions while lexing
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// Byte positions where each line starts
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Create a new source map from source code
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Get line and column for a byte offset (both 1-indexed)
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        (line + 1, offset - line_start + 1)
    }

    /// Create a span with line/column information
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.line_col(start);
        Span {
            start,
            end,
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_map() {
        let source = "def f\ndef g\n";
        let map = SourceMap::new(source);

        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(5), (1, 6));
        assert_eq!(map.line_col(6), (2, 1));
        assert_eq!(map.line_col(11), (2, 6));
    }

    #[test]
    fn test_span_len() {
        let span = Span::new(3, 8, 1, 4);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::empty().is_empty());
    }
}
