//! Bibliography loading, lookup and the set of keys a project actually cites.

use crate::models::{BibliographyEntry, Contributor, Diagnostic, EntryType};
use hayagriva::{
    io::from_biblatex_str,
    types::{EntryType as SourceType, MaybeTyped, Numeric, Person},
    Entry,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::{fs, mem, path::Path};
use tracing::{debug, warn};

/// Entries of one language's consolidated bibliography, keyed by citation key.
#[derive(Debug, Clone, Default)]
pub struct BibliographyStore {
    entries: BTreeMap<String, BibliographyEntry>,
    diagnostics: Vec<Diagnostic>,
}

impl BibliographyStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Load a `.bib` file. A missing file yields an empty store.
    ///
    /// Read and parse failures are logged and kept as diagnostics; the
    /// store stays empty so citations degrade to missing-entry markers.
    pub fn load(path: &Path) -> Self {
        let mut store = Self::new();
        if !path.exists() {
            debug!("No bibliography at {:?}, citations disabled", path);
            return store;
        }

        match fs::read_to_string(path) {
            Ok(contents) => store.extend_from_biblatex(&contents, Some(path)),
            Err(err) => {
                warn!("Failed to read bibliography {:?}: {}", path, err);
                store.diagnostics.push(Diagnostic::warning(
                    "bibliography.load_failed",
                    format!("Failed to read bibliography: {}", err),
                    Some(path.to_string_lossy().to_string()),
                ));
            }
        }
        store
    }

    /// Parse BibLaTeX source directly (used by previews and tests).
    pub fn from_biblatex(contents: &str) -> Self {
        let mut store = Self::new();
        store.extend_from_biblatex(contents, None);
        store
    }

    pub fn from_entries(entries: impl IntoIterator<Item = BibliographyEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key.clone(), e)).collect(),
            diagnostics: Vec::new(),
        }
    }

    fn extend_from_biblatex(&mut self, contents: &str, origin: Option<&Path>) {
        match from_biblatex_str(contents) {
            Ok(library) => {
                for entry in library.iter() {
                    let converted = convert_entry(entry);
                    self.entries.insert(converted.key.clone(), converted);
                }
            }
            Err(errors) => {
                let joined = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!("Failed to parse bibliography {:?}: {}", origin, joined);
                self.diagnostics.push(Diagnostic::warning(
                    "bibliography.load_failed",
                    format!("Failed to parse bibliography: {}", joined),
                    origin.map(|p| p.to_string_lossy().to_string()),
                ));
            }
        }
    }

    /// Lookup a bibliography entry by key.
    pub fn get(&self, key: &str) -> Option<&BibliographyEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Take accumulated diagnostics (clearing the internal buffer).
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        mem::take(&mut self.diagnostics)
    }
}

fn convert_entry(entry: &Entry) -> BibliographyEntry {
    let entry_type = match entry.entry_type() {
        SourceType::Book => EntryType::Book,
        SourceType::Article => EntryType::ArticleJournal,
        SourceType::Web => EntryType::Online,
        _ => EntryType::Other,
    };

    // BibLaTeX articles keep volume and issue on the parent periodical.
    let parent = entry.parents().first();
    let volume = entry
        .volume()
        .or_else(|| parent.and_then(|p| p.volume()))
        .map(numeric_text);
    let issue = entry
        .issue()
        .or_else(|| parent.and_then(|p| p.issue()))
        .map(numeric_text);

    BibliographyEntry {
        key: entry.key().to_string(),
        entry_type,
        authors: entry.authors().map(convert_people).unwrap_or_default(),
        editors: entry.editors().map(convert_people).unwrap_or_default(),
        title: entry.title().map(|t| t.to_string()),
        volume,
        issue,
        url: entry.url().map(|u| u.to_string()),
    }
}

fn convert_people(people: &[Person]) -> Vec<Contributor> {
    people
        .iter()
        .map(|person| {
            let has_given = person
                .given_name
                .as_deref()
                .is_some_and(|g| !g.trim().is_empty());
            // `{{World Bank}}` arrives as a single family name without given name.
            let literal = person.name.starts_with('{')
                || (!has_given && person.name.trim().contains(char::is_whitespace));
            Contributor {
                family: person.name.replace(['{', '}'], ""),
                literal,
            }
        })
        .collect()
}

fn numeric_text(value: &MaybeTyped<Numeric>) -> String {
    match value {
        MaybeTyped::Typed(n) => n.to_string(),
        MaybeTyped::String(s) => s.clone(),
    }
}

static USED_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[.*?\]\{(.*?)\}").expect("valid used key regex"));

/// Every citation key referenced with `[...]{key}` syntax in `text`.
pub fn scan_citation_keys(text: &str) -> Vec<String> {
    USED_KEY_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Sorted, de-duplicated keys that are both cited and present in the bibliography.
///
/// Positions in this list are the ordinals used by classic citations and by
/// the generated bibliography listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedKeySet {
    keys: Vec<String>,
}

impl UsedKeySet {
    /// Intersect the keys cited in `sources` with the keys in `store`.
    ///
    /// Keys cited but absent from the store are logged; they stay visible in
    /// the output as missing-definition markers.
    pub fn discover<'a>(
        sources: impl IntoIterator<Item = &'a str>,
        store: &BibliographyStore,
    ) -> Self {
        let cited: BTreeSet<String> = sources
            .into_iter()
            .flat_map(scan_citation_keys)
            .collect();

        let mut keys = Vec::with_capacity(cited.len());
        for key in cited {
            if store.contains(&key) {
                keys.push(key);
            } else if !store.is_empty() {
                warn!("Citation key '{}' has no bibliography entry", key);
            }
        }
        Self { keys }
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        Self {
            keys: set.into_iter().collect(),
        }
    }

    /// 1-based position of `key`, if it is in the set.
    pub fn ordinal(&self, key: &str) -> Option<usize> {
        self.keys
            .binary_search_by(|k| k.as_str().cmp(key))
            .ok()
            .map(|idx| idx + 1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ordinal(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
