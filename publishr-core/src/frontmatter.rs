//! Page front matter handling.

/// Source kinds the builders read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `*.page`: carries a site-generator header terminated by `---`.
    Page,
    /// `*.txt`: front matter, table of contents, cover text; used verbatim.
    Text,
}

impl SourceKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".page") {
            Some(SourceKind::Page)
        } else if name.ends_with(".txt") {
            Some(SourceKind::Text)
        } else {
            None
        }
    }
}

/// Drop everything up to and including the last line that is exactly `---`.
///
/// Content without such a line is returned unchanged.
///
/// # Example
///
/// ```
/// use publishr_core::frontmatter::strip_page_header;
///
/// let page = "---\ntitle: One\n---\n# Hello\n";
/// assert_eq!(strip_page_header(page), "# Hello");
/// ```
pub fn strip_page_header(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    match lines.iter().rposition(|line| line.trim() == "---") {
        Some(idx) => lines[idx + 1..].join("\n"),
        None => lines.join("\n"),
    }
}

/// The markup body of a source file.
pub fn source_body(content: &str, kind: SourceKind) -> String {
    match kind {
        SourceKind::Page => strip_page_header(content),
        SourceKind::Text => content.to_string(),
    }
}
