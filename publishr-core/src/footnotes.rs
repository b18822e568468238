//! Cross-file footnote numbering.

use once_cell::sync::Lazy;
use regex::Regex;

static DEFINITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}\[\^[^\]]*\]:").expect("valid footnote definition regex"));

/// Number of author-written footnote definitions (`[^label]: ...` lines,
/// indented by at most three spaces).
pub fn count_footnote_definitions(markup: &str) -> usize {
    markup.lines().filter(|line| DEFINITION_RE.is_match(line)).count()
}

/// Footnotes a single file contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FootnoteCounts {
    pub footnotes: usize,
    pub citation_footnotes: usize,
}

/// Running totals over the files already processed, in sorted-filename order.
///
/// Read with [`FootnoteCursor::next_start`] before a file is rendered and
/// advanced once after it, which keeps footnote numbers unique and strictly
/// increasing across all files of one language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FootnoteCursor {
    footnotes: usize,
    citation_footnotes: usize,
}

impl FootnoteCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of the first footnote in the next file.
    pub fn next_start(&self) -> usize {
        1 + self.footnotes + self.citation_footnotes
    }

    pub fn advance(&mut self, counts: FootnoteCounts) {
        self.footnotes += counts.footnotes;
        self.citation_footnotes += counts.citation_footnotes;
    }

    pub fn footnotes(&self) -> usize {
        self.footnotes
    }

    pub fn citation_footnotes(&self) -> usize {
        self.citation_footnotes
    }
}
