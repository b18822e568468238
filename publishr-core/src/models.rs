//! Data model shared by the normalizer, the resolver and the builders.

use serde::{Deserialize, Serialize};

/// Citation rendering mode for e-book output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    /// Full citation text in a footnote appended to the file.
    #[default]
    Footnote,
    /// Full citation text inline as `^[...]^`.
    Superscript,
    /// Ordinal reference into the bibliography listing, e.g. `[ 3 p. 12]`.
    Classic,
}

/// Kind of bibliography record, reduced to what citation formatting cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    Book,
    ArticleJournal,
    Online,
    Other,
}

/// A person or organization credited on an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub family: String,

    /// Set for organization names written as `{{Name}}` in the database.
    #[serde(default)]
    pub literal: bool,
}

/// A bibliography record, immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographyEntry {
    pub key: String,
    pub entry_type: EntryType,

    #[serde(default)]
    pub authors: Vec<Contributor>,

    #[serde(default)]
    pub editors: Vec<Contributor>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub volume: Option<String>,

    #[serde(default)]
    pub issue: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

/// One parsed citation, created per macro occurrence and consumed immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRequest {
    pub key: String,
    pub prenote: Option<String>,
    pub postnote: Option<String>,
}

impl CitationRequest {
    pub fn new(key: impl Into<String>, prenote: Option<&str>, postnote: Option<&str>) -> Self {
        Self {
            key: key.into(),
            prenote: prenote.map(str::to_string),
            postnote: postnote.map(str::to_string),
        }
    }
}

/// Severity of a non-fatal build finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
}

/// A non-fatal problem found while building, surfaced on the build report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,

    #[serde(default)]
    pub source_path: Option<String>,
}

impl Diagnostic {
    pub fn warning(code: &str, message: impl Into<String>, source_path: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: DiagnosticSeverity::Warning,
            source_path,
        }
    }
}
