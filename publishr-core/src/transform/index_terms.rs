//! Index-term table for the print output.
//!
//! The term file holds one `pattern` or `pattern>label` per line; `#` lines
//! and blank lines are ignored. Patterns are regular expressions.

use crate::models::Diagnostic;
use regex::Regex;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct IndexTerm {
    pub pattern: String,
    pub label: Option<String>,
    matcher: Regex,
}

impl IndexTerm {
    /// Text written into `\index{}`: the label, or the pattern itself.
    pub fn entry(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.pattern)
    }
}

/// Terms ordered by descending pattern length, so longer terms claim text first.
#[derive(Debug, Clone, Default)]
pub struct IndexTerms {
    terms: Vec<IndexTerm>,
    diagnostics: Vec<Diagnostic>,
}

impl IndexTerms {
    /// Load `path`; a missing file disables indexing.
    pub fn load(path: &Path) -> Option<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let mut terms = Self::parse(&contents);
                for diagnostic in &mut terms.diagnostics {
                    diagnostic.source_path = Some(path.display().to_string());
                }
                Some(terms)
            }
            Err(_) => {
                tracing::debug!("No index term file at {:?}", path);
                None
            }
        }
    }

    pub fn parse(contents: &str) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut terms = Vec::new();
        let mut diagnostics = Vec::new();

        for line in contents.lines() {
            if line.starts_with('#') || line.trim().is_empty() || !seen.insert(line) {
                continue;
            }
            let (pattern, label) = match line.split_once('>') {
                Some((pattern, label)) => (pattern, Some(label.to_string())),
                None => (line, None),
            };
            if pattern.is_empty() {
                continue;
            }

            let matcher = match Regex::new(pattern) {
                Ok(re) => re,
                Err(err) => {
                    tracing::warn!("Index pattern {:?} is not a valid regex ({}), matching literally", pattern, err);
                    diagnostics.push(Diagnostic::warning(
                        "index.invalid_pattern",
                        format!("Index pattern '{}' is not a valid regex: {}", pattern, err),
                        None,
                    ));
                    match Regex::new(&regex::escape(pattern)) {
                        Ok(re) => re,
                        Err(_) => continue,
                    }
                }
            };

            terms.push(IndexTerm {
                pattern: pattern.to_string(),
                label,
                matcher,
            });
        }

        // Stable: equal lengths keep file order.
        terms.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));

        Self { terms, diagnostics }
    }

    pub fn terms(&self) -> &[IndexTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Insert `\index{...}` after the first match of every term.
    ///
    /// Matches are collected against the untouched line first and only then
    /// written, so an inserted command is never matched again. A match that
    /// overlaps text already claimed by a longer term is skipped.
    pub fn apply(&self, line: &str) -> String {
        let mut claimed: Vec<(usize, usize, usize)> = Vec::new();

        for (idx, term) in self.terms.iter().enumerate() {
            let found = term.matcher.find_iter(line).find(|m| {
                m.start() < m.end()
                    && !claimed
                        .iter()
                        .any(|&(start, end, _)| m.start() < end && start < m.end())
            });
            if let Some(m) = found {
                claimed.push((m.start(), m.end(), idx));
            }
        }

        if claimed.is_empty() {
            return line.to_string();
        }
        claimed.sort_by_key(|&(_, end, _)| end);

        let mut out = String::with_capacity(line.len() + claimed.len() * 16);
        let mut last = 0;
        for (_, end, idx) in claimed {
            out.push_str(&line[last..end]);
            out.push_str(&format!("\\index{{{}}}", self.terms[idx].entry()));
            last = end;
        }
        out.push_str(&line[last..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_duplicates() {
        let terms = IndexTerms::parse("# animals\ncat\n\ndog>Dogs\ncat\ncataclysm\n");
        let patterns: Vec<&str> = terms.terms().iter().map(|t| t.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["cataclysm", "cat", "dog"]);
        assert_eq!(terms.terms()[2].entry(), "Dogs");
        assert_eq!(terms.terms()[1].entry(), "cat");
    }

    #[test]
    fn test_longest_match_wins() {
        let terms = IndexTerms::parse("cat\ncataclysm");
        assert_eq!(terms.apply("a cataclysm"), "a cataclysm\\index{cataclysm}");
    }

    #[test]
    fn test_shorter_term_still_matches_elsewhere() {
        let terms = IndexTerms::parse("cat\ncataclysm");
        assert_eq!(
            terms.apply("a cataclysm and a cat"),
            "a cataclysm\\index{cataclysm} and a cat\\index{cat}"
        );
    }

    #[test]
    fn test_label_and_regex() {
        let terms = IndexTerms::parse("Kant(ian)?>Kant, Immanuel");
        assert_eq!(
            terms.apply("the Kantian view"),
            "the Kantian\\index{Kant, Immanuel} view"
        );
    }

    #[test]
    fn test_only_first_match_per_term() {
        let terms = IndexTerms::parse("dog");
        assert_eq!(terms.apply("dog eats dog"), "dog\\index{dog} eats dog");
    }

    #[test]
    fn test_invalid_regex_matches_literally() {
        let mut terms = IndexTerms::parse("f(x");
        assert_eq!(terms.apply("let f(x be"), "let f(x\\index{f(x} be");
        let diagnostics = terms.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "index.invalid_pattern");
    }
}
