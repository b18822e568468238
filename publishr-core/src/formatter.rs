//! Bibliography listing entries.

use crate::markdown::html_escape;
use crate::models::{BibliographyEntry, Contributor, EntryType};

/// Citation style requested for the generated bibliography page.
pub const BIBLIOGRAPHY_STYLE: &str = "chicago-fullnote-bibliography";

/// Turns a parsed entry into one formatted HTML line of the bibliography page.
///
/// A full CSL processor can be plugged in here; the pipeline only hands
/// over the entry and a style name and uses the returned string verbatim.
pub trait CitationFormatter {
    fn format(&self, entry: &BibliographyEntry, style: &str) -> String;
}

/// Author, title, volume, issue and URL, comma separated.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl CitationFormatter for PlainFormatter {
    fn format(&self, entry: &BibliographyEntry, _style: &str) -> String {
        let mut parts = Vec::new();

        let names = if entry.authors.is_empty() {
            &entry.editors
        } else {
            &entry.authors
        };
        if !names.is_empty() {
            parts.push(join_names(names));
        }

        if let Some(title) = entry.title.as_deref() {
            let title = html_escape(title);
            parts.push(match entry.entry_type {
                EntryType::Book => format!("<i>{}</i>", title),
                EntryType::ArticleJournal | EntryType::Online => format!("“{}”", title),
                EntryType::Other => title,
            });
        }
        if let Some(volume) = entry.volume.as_deref() {
            parts.push(format!("vol. {}", html_escape(volume)));
        }
        if let Some(issue) = entry.issue.as_deref() {
            parts.push(format!("no. {}", html_escape(issue)));
        }
        if let Some(url) = entry.url.as_deref() {
            let url = html_escape(url);
            parts.push(format!("<a href=\"{0}\">{0}</a>", url));
        }

        let mut line = parts.join(", ");
        if !line.is_empty() {
            line.push('.');
        }
        line
    }
}

fn join_names(names: &[Contributor]) -> String {
    let names: Vec<String> = names.iter().map(|n| html_escape(&n.family)).collect();
    match names.len() {
        0 => String::new(),
        1 => names[0].clone(),
        n => format!("{} and {}", names[..n - 1].join(", "), names[n - 1]),
    }
}
