//! Citation resolution against the project bibliography.
//!
//! A [`CitationRequest`] resolves to a single formatted string; several
//! resolved requests are joined and wrapped according to the citation style.

use crate::bibliography::{BibliographyStore, UsedKeySet};
use crate::config::Metadata;
use crate::models::{BibliographyEntry, CitationRequest, CitationStyle, Contributor, EntryType};
use std::collections::HashSet;

/// Context required to resolve citation keys.
pub struct CitationContext<'a> {
    pub bibliography: &'a BibliographyStore,
    pub used_keys: &'a UsedKeySet,
    pub metadata: &'a Metadata,
}

impl<'a> CitationContext<'a> {
    pub fn new(
        bibliography: &'a BibliographyStore,
        used_keys: &'a UsedKeySet,
        metadata: &'a Metadata,
    ) -> Self {
        Self {
            bibliography,
            used_keys,
            metadata,
        }
    }

    /// Project-wide style, overridden by classic inside footnote bodies.
    pub fn effective_style(&self, inside_footnote: bool) -> CitationStyle {
        if inside_footnote {
            CitationStyle::Classic
        } else {
            self.metadata.ebook_citation_style
        }
    }

    /// Resolve one citation to text. Never fails: unknown keys produce a
    /// visible missing-definition marker naming the key.
    pub fn resolve(&self, request: &CitationRequest, inside_footnote: bool) -> String {
        let prenote = request.prenote.as_deref().unwrap_or("");
        let postnote = self.page_label(request.postnote.as_deref().unwrap_or(""));

        let Some(ordinal) = self.used_keys.ordinal(&request.key) else {
            return missing_definition(&request.key);
        };

        match self.effective_style(inside_footnote) {
            CitationStyle::Classic => format!("{} {} {}", prenote, ordinal, postnote),
            CitationStyle::Footnote | CitationStyle::Superscript => {
                match self.bibliography.get(&request.key) {
                    Some(entry) => {
                        let text = entry_text(entry);
                        if postnote.is_empty() {
                            format!("{} {}.", prenote, text)
                        } else {
                            format!("{} {}, {}", prenote, text, postnote)
                        }
                    }
                    None => missing_definition(&request.key),
                }
            }
        }
    }

    /// Prefix a postnote with the localized page label.
    ///
    /// Ranges (`12-14`) and lists (`12, 14`) take the plural label.
    pub fn page_label(&self, postnote: &str) -> String {
        let postnote = postnote.trim();
        if postnote.is_empty() {
            return String::new();
        }
        let label = if postnote.contains('-') || postnote.contains(',') {
            self.metadata.page_label_other()
        } else {
            self.metadata.page_label_one()
        };
        if label.is_empty() {
            postnote.to_string()
        } else {
            format!("{} {}", label, postnote)
        }
    }

    /// Join resolved citations with `"; "` and wrap them for the effective style.
    ///
    /// Footnote style emits a reference to a deferred footnote whose body is
    /// pushed onto `footnotes`.
    pub fn format_citation(
        &self,
        resolved: &[String],
        inside_footnote: bool,
        footnotes: &mut DeferredFootnotes,
    ) -> String {
        let joined = resolved.join("; ");
        match self.effective_style(inside_footnote) {
            CitationStyle::Superscript => format!("^[{}]^", joined),
            CitationStyle::Footnote => footnotes.push(joined),
            CitationStyle::Classic => format!("[{}] ", joined),
        }
    }
}

pub fn missing_definition(key: &str) -> String {
    format!("Missing definition for entry <b>{}</b>", key)
}

/// Author, title and URL of an entry joined with `", "`.
///
/// Names are wrapped in `name(...)` and book titles in `title(...)`; both
/// macros are turned into real markup by the HTML and LaTeX transforms.
pub fn entry_text(entry: &BibliographyEntry) -> String {
    let authors = if !entry.authors.is_empty() {
        Some(format_names(&entry.authors))
    } else {
        // Editor-only works such as encyclopedias cite the first editor.
        entry.editors.first().map(format_name)
    };

    let title = entry.title.as_deref().map(|title| match entry.entry_type {
        EntryType::Book => format!("title({})", title),
        EntryType::ArticleJournal | EntryType::Online => {
            let mut out = format!("\"{}\"", title);
            if let Some(volume) = entry.volume.as_deref().filter(|v| !v.is_empty()) {
                out.push_str(&format!(", title({})", volume));
            }
            if let Some(issue) = entry.issue.as_deref().filter(|v| !v.is_empty()) {
                out.push_str(&format!(", Issue {}", issue));
            }
            out
        }
        EntryType::Other => title.to_string(),
    });

    [authors, title, entry.url.clone()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_names(names: &[Contributor]) -> String {
    names.iter().map(format_name).collect::<Vec<_>>().join(" & ")
}

fn format_name(name: &Contributor) -> String {
    if name.literal {
        name.family.clone()
    } else {
        format!("name({})", name.family)
    }
}

/// Footnote bodies generated for citations, appended to the end of a file.
///
/// Anchors come from a counter that lives for the whole build, and labels
/// already written by the author in the current file are skipped, so a
/// generated anchor can never collide with another footnote.
#[derive(Debug, Default)]
pub struct DeferredFootnotes {
    next: usize,
    reserved: HashSet<String>,
    bodies: Vec<String>,
}

impl DeferredFootnotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new file: forget its bodies and reserve the author's labels.
    /// The anchor counter keeps running.
    pub fn begin_file<I, S>(&mut self, reserved_labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bodies.clear();
        self.reserved = reserved_labels.into_iter().map(Into::into).collect();
    }

    fn next_label(&mut self) -> String {
        loop {
            self.next += 1;
            let label = format!("bibfootnote{}", self.next);
            if !self.reserved.contains(&label) {
                return label;
            }
        }
    }

    /// Register a body and return the `[^label]` reference to put in the text.
    pub fn push(&mut self, body: String) -> String {
        let reference = format!("[^{}]", self.next_label());
        self.bodies.push(format!("{}: {}", reference, body));
        reference
    }

    /// Reference definitions for the current file, in citation order.
    pub fn definitions(&self) -> &[String] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}
