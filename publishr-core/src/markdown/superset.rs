//! Superset markup normalization.
//!
//! Expands the project's own macros (`CITE`, `CITES`, `\part`, `\pagebreak`
//! comments) into plain markup the render engine understands. Citations are
//! resolved through [`CitationContext`]; footnote-style citation bodies are
//! appended to the end of the file as reference definitions.

use super::citations::{CitationContext, DeferredFootnotes};
use crate::filter::{run_hook, FilterError, FilterHook, FilterStage};
use crate::footnotes::{count_footnote_definitions, FootnoteCounts};
use crate::models::CitationRequest;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Page break the render engine passes through verbatim.
pub const PAGE_BREAK: &str = "<br style='page-break-before:always;'>";

const PAGEBREAK_COMMENT: &str = r"{::comment}\pagebreak{:/}";

static PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{::comment\}\\part\{(.*?)\}\{:/\}").expect("valid part regex"));

/// `CITE[prenote][postnote]{key}`
static CITE_PRE_POST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CITE\[([^\]]*?)\]\[(.*?)\]\{(\w+)\}").expect("valid cite regex")
});

/// `CITE[postnote]{key}`
static CITE_POST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CITE\[(.*?)\]\{(\w+?)\}").expect("valid cite regex"));

/// `CITES[pre][post]{a}[post]{b}...`
static CITES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CITES((?:(?:\[[^\]]*\]){1,2}\{\w+\})+)").expect("valid cites regex")
});

static CITES_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\[([^\]]*)\])?\[([^\]]*)\]\{(\w+)\}").expect("valid cites entry regex")
});

static FOOTNOTE_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\^([^\]\s]+)\]").expect("valid footnote label regex"));

/// Result of normalizing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFile {
    pub markup: String,
    pub counts: FootnoteCounts,
}

/// Expands superset macros file by file.
///
/// One normalizer serves a whole build so that generated footnote anchors
/// stay unique across files.
pub struct SupersetNormalizer<'a> {
    citations: CitationContext<'a>,
    footnotes: DeferredFootnotes,
    filter: Option<&'a dyn FilterHook>,
}

impl<'a> SupersetNormalizer<'a> {
    pub fn new(citations: CitationContext<'a>) -> Self {
        Self {
            citations,
            footnotes: DeferredFootnotes::new(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<&'a dyn FilterHook>) -> Self {
        self.filter = filter;
        self
    }

    /// Normalize one file's markup and run the markup-stage hook.
    pub fn normalize(&mut self, source: &str, filename: &str) -> Result<NormalizedFile, FilterError> {
        self.footnotes.begin_file(footnote_labels(source));

        let lines: Vec<String> = source.lines().map(|line| self.normalize_line(line)).collect();

        let mut markup = lines.join("\n");
        markup.push_str("\n\n");
        markup.push_str(&self.footnotes.definitions().join("\n"));

        let counts = FootnoteCounts {
            footnotes: count_footnote_definitions(source),
            citation_footnotes: self.footnotes.len(),
        };

        let markup = run_hook(self.filter, FilterStage::Markup, markup, filename)?;
        Ok(NormalizedFile { markup, counts })
    }

    /// Rewrite a single line. Footnote-style citations found on the line
    /// are queued for the current file.
    pub fn normalize_line(&mut self, line: &str) -> String {
        // Whitespace-only lines would otherwise read as forced line breaks.
        if line.trim().is_empty() {
            return String::new();
        }

        let mut line = line.to_string();

        if line.contains(r"{::comment}\part{") {
            line = PART_RE
                .replace_all(&line, |caps: &Captures| {
                    format!(
                        "<br /><br /><br /><br />\n\n# {}\n\n{}\n",
                        &caps[1], PAGE_BREAK
                    )
                })
                .into_owned();
        }

        if line.contains(PAGEBREAK_COMMENT) {
            line = line.replace(PAGEBREAK_COMMENT, PAGE_BREAK);
        }

        if line.contains("CITE") {
            line = self.expand_citations(&line);
        }

        line
    }

    fn expand_citations(&mut self, line: &str) -> String {
        // A footnote body must not receive another footnote.
        let inside_footnote = line.contains("]:");

        let line = CITE_PRE_POST_RE
            .replace_all(line, |caps: &Captures| {
                let request = CitationRequest::new(&caps[3], Some(&caps[1]), Some(&caps[2]));
                self.cite(&[request], inside_footnote)
            })
            .into_owned();

        let line = CITE_POST_RE
            .replace_all(&line, |caps: &Captures| {
                let request = CitationRequest::new(&caps[2], None, Some(&caps[1]));
                self.cite(&[request], inside_footnote)
            })
            .into_owned();

        CITES_RE
            .replace_all(&line, |caps: &Captures| {
                let requests: Vec<CitationRequest> = CITES_ENTRY_RE
                    .captures_iter(&caps[1])
                    .map(|entry| {
                        CitationRequest::new(
                            &entry[3],
                            entry.get(1).map(|m| m.as_str()),
                            Some(&entry[2]),
                        )
                    })
                    .collect();
                self.cite(&requests, inside_footnote)
            })
            .into_owned()
    }

    fn cite(&mut self, requests: &[CitationRequest], inside_footnote: bool) -> String {
        let resolved: Vec<String> = requests
            .iter()
            .map(|request| self.citations.resolve(request, inside_footnote))
            .collect();
        self.citations
            .format_citation(&resolved, inside_footnote, &mut self.footnotes)
    }
}

/// Labels of footnotes written by the author in `source`.
pub fn footnote_labels(source: &str) -> Vec<String> {
    FOOTNOTE_LABEL_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}
