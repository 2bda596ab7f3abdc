//! Batch segmentation of T-SQL scripts.
//!
//! Scripts are split on separator lines (`GO` by default). A separator line
//! is a line whose trimmed content equals the keyword, compared
//! case-insensitively. `GO 5` or `SELECT 1 GO` are ordinary SQL lines.

use serde::Serialize;

/// Default batch separator keyword used by SQL Server tooling.
pub const DEFAULT_SEPARATOR: &str = "GO";

/// Maximum number of characters kept in a batch preview.
pub const PREVIEW_CHARS: usize = 80;

/// A non-empty unit of SQL text submitted as one execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Batch(String);

impl Batch {
    /// Builds a batch from raw text, trimming surrounding whitespace.
    ///
    /// Returns `None` when nothing is left after trimming.
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Full SQL text of the batch.
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Single-line preview for status output.
    pub fn preview(&self) -> String {
        preview(&self.0)
    }
}

impl std::fmt::Display for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered batches; position in the sequence is the execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSequence {
    batches: Vec<Batch>,
}

impl BatchSequence {
    /// Number of batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// True when the script held no executable content.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Batches in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Batch> {
        self.batches.iter()
    }

    /// Batch at a zero-based index.
    pub fn get(&self, index: usize) -> Option<&Batch> {
        self.batches.get(index)
    }

    fn push_accumulated(&mut self, lines: &mut Vec<&str>) {
        if let Some(batch) = Batch::new(&lines.join("\n")) {
            self.batches.push(batch);
        }
        lines.clear();
    }
}

impl<'a> IntoIterator for &'a BatchSequence {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

impl FromIterator<Batch> for BatchSequence {
    fn from_iter<I: IntoIterator<Item = Batch>>(iter: I) -> Self {
        Self {
            batches: iter.into_iter().collect(),
        }
    }
}

/// Splits a script on `GO` separator lines.
///
/// # Example
/// ```rust
/// use sqldeploy_core::batch::segment;
///
/// let batches = segment("SELECT 1\nGO\nSELECT 2\nGO\n");
/// assert_eq!(batches.len(), 2);
/// assert_eq!(batches.get(1).map(|b| b.text()), Some("SELECT 2"));
/// ```
pub fn segment(script: &str) -> BatchSequence {
    segment_with(script, DEFAULT_SEPARATOR)
}

/// Splits a script on lines consisting solely of `separator`.
///
/// Empty segments (leading, consecutive or trailing separators, blank
/// regions) are dropped. Content after the last separator forms a final
/// batch.
pub fn segment_with(script: &str, separator: &str) -> BatchSequence {
    let separator = separator.trim();
    let mut sequence = BatchSequence::default();
    let mut current: Vec<&str> = Vec::new();

    for line in script.lines() {
        if line.trim().eq_ignore_ascii_case(separator) {
            sequence.push_accumulated(&mut current);
        } else {
            current.push(line);
        }
    }
    sequence.push_accumulated(&mut current);

    sequence
}

/// Flattens newlines and truncates to [`PREVIEW_CHARS`] characters.
pub fn preview(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(PREVIEW_CHARS)
        .collect()
}
