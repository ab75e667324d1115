//! Byte offset to line/column conversion for host files
//!
//! Lines are 1-indexed, columns are 0-indexed and counted in characters so
//! they agree with the token spans reported inside snippets.

use crate::errors::SourceLocation;
use std::ops::Range;

/// Line index for fast byte offset to line/column conversion
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { source, line_starts }
    }

    /// Convert byte offset to (line, column)
    pub fn offset_to_position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let line_start = self.line_starts[line];
        let column = self
            .source
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(offset - line_start);

        (line + 1, column)
    }

    pub fn location(&self, range: Range<usize>) -> SourceLocation {
        let start = self.offset_to_position(range.start);
        let end = self.offset_to_position(range.end);
        SourceLocation::from_range(start, end)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let source = "line1\nline2\nline3";
        let index = LineIndex::new(source);

        assert_eq!(index.offset_to_position(0), (1, 0));
        assert_eq!(index.offset_to_position(6), (2, 0));
        assert_eq!(index.offset_to_position(14), (3, 2));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_columns_count_characters() {
        let source = "λx = [rust| i32 { 1 } |]";
        let index = LineIndex::new(source);
        let bracket = source.find('[').unwrap();
        assert_eq!(index.offset_to_position(bracket), (1, 5));
    }

    #[test]
    fn test_range_location() {
        let source = "a\nbcd\nef";
        let index = LineIndex::new(source);
        let loc = index.location(3..7);
        assert_eq!((loc.line, loc.col, loc.end_line, loc.end_col), (2, 1, 3, 1));
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let index = LineIndex::new("abc");
        assert_eq!(index.offset_to_position(99), (1, 3));
    }
}
