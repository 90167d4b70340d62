//! Line-end indexing for fast position → line/column lookup.

/// Computes the character offset of every line terminator in `text`.
///
/// The final entry is always the text length, so a text without newlines
/// still has one line. Offsets are in characters, matching source positions.
pub fn compute_line_ends(text: &str) -> Vec<u32> {
    let mut ends = Vec::new();
    let mut count = 0u32;
    for ch in text.chars() {
        if ch == '\n' {
            ends.push(count);
        }
        count += 1;
    }
    ends.push(count);
    ends
}

/// A precomputed line-end table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_ends: Vec<u32>,
}

impl LineIndex {
    /// Builds the index for `text`.
    pub fn new(text: &str) -> Self {
        Self {
            line_ends: compute_line_ends(text),
        }
    }

    /// Wraps a line-end table computed earlier, e.g. one stored on a script.
    pub fn from_line_ends(line_ends: Vec<u32>) -> Self {
        Self { line_ends }
    }

    /// Returns the raw line-end offsets.
    pub fn line_ends(&self) -> &[u32] {
        &self.line_ends
    }

    /// Number of lines in the text.
    pub fn line_count(&self) -> usize {
        self.line_ends.len()
    }

    /// Converts a character position into 1-indexed (line, column) coordinates.
    ///
    /// Returns `None` if the position lies past the end of the text.
    pub fn line_col(&self, position: u32) -> Option<(u32, u32)> {
        let line_idx = match self.line_ends.binary_search(&position) {
            Ok(idx) => idx,
            Err(idx) if idx < self.line_ends.len() => idx,
            Err(_) => return None,
        };
        let line_start = if line_idx == 0 {
            0
        } else {
            self.line_ends[line_idx - 1] + 1
        };
        Some((line_idx as u32 + 1, position - line_start + 1))
    }
}
