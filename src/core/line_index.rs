//! Byte-offset to line/column conversion.

use text_size::{TextRange, TextSize};

use super::position::{Position, Span};

/// Maps byte offsets in a document to 0-indexed line/column pairs.
///
/// Built once per parsed text; lookups are a binary search over the
/// precomputed line-start table.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    /// Byte offset of the start of each line (line 0 starts at 0)
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a position.
    ///
    /// Offsets past the last line start clamp onto the final line.
    pub fn position(&self, offset: TextSize) -> Position {
        let offset = u32::from(offset);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next_line) => next_line - 1,
        };
        Position::new(line as u32, offset - self.line_starts[line])
    }

    /// Convert a byte range to a line/column span.
    pub fn span(&self, range: TextRange) -> Span {
        Span::new(self.position(range.start()), self.position(range.end()))
    }

    /// Convert a position back to a byte offset.
    ///
    /// Positions beyond the end of the table clamp to the last known line.
    pub fn offset(&self, position: Position) -> TextSize {
        let line = (position.line as usize).min(self.line_starts.len() - 1);
        TextSize::new(self.line_starts[line] + position.column)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_lookup() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.position(TextSize::new(0)), Position::new(0, 0));
        assert_eq!(index.position(TextSize::new(1)), Position::new(0, 1));
        assert_eq!(index.position(TextSize::new(3)), Position::new(1, 0));
        assert_eq!(index.position(TextSize::new(6)), Position::new(2, 0));
        assert_eq!(index.position(TextSize::new(8)), Position::new(3, 1));
    }

    #[test]
    fn test_offset_roundtrip() {
        let text = "line one\nline two\nline three";
        let index = LineIndex::new(text);
        for off in [0u32, 5, 9, 12, 20] {
            let pos = index.position(TextSize::new(off));
            assert_eq!(index.offset(pos), TextSize::new(off));
        }
    }

    #[test]
    fn test_line_count() {
        assert_eq!(LineIndex::new("").line_count(), 1);
        assert_eq!(LineIndex::new("a\nb").line_count(), 2);
    }
}
