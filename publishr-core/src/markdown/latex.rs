//! LaTeX output for the reference render engine.
//!
//! Produces the raw LaTeX shapes the print transform expects: one block
//! command per line, `{::comment}` superset comments as `% ` line comments,
//! and images as a `figure` block whose opening line carries the image
//! title's attribute hints (`\begin{figure}   %  width="40" class="WO"`).

use pulldown_cmark::{Event, HeadingLevel, Tag, TagEnd};
use std::collections::HashMap;

/// Writes body events as LaTeX, inlining footnote definitions at their reference.
pub struct LatexWriter<'d, 'a> {
    definitions: &'d HashMap<String, Vec<Event<'a>>>,
    out: String,
    pending_text: String,
    image: Option<ImageState>,
    list_kinds: Vec<bool>,
    first_cell: bool,
    in_code_block: bool,
}

struct ImageState {
    src: String,
    hints: String,
    alt: String,
}

impl<'d, 'a> LatexWriter<'d, 'a> {
    pub fn new(definitions: &'d HashMap<String, Vec<Event<'a>>>) -> Self {
        Self {
            definitions,
            out: String::new(),
            pending_text: String::new(),
            image: None,
            list_kinds: Vec::new(),
            first_cell: true,
            in_code_block: false,
        }
    }

    pub fn write(mut self, events: Vec<Event<'a>>) -> String {
        for event in events {
            self.event(event);
        }
        self.flush_text();
        self.out
    }

    fn event(&mut self, event: Event<'a>) {
        // Consecutive text events are merged so that superset comments
        // split by the parser are still recognized.
        if let Event::Text(text) = &event {
            if let Some(image) = self.image.as_mut() {
                image.alt.push_str(text);
            } else if self.in_code_block {
                self.out.push_str(text);
            } else {
                self.pending_text.push_str(text);
            }
            return;
        }
        self.flush_text();

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Code(code) => {
                self.out.push_str(&format!("{{\\tt {}}}", escape(&code)));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => self.raw_html(&raw),
            Event::FootnoteReference(label) => {
                let body = match self.definitions.get(label.as_ref()) {
                    Some(events) => {
                        let nested = LatexWriter::new(self.definitions).write(events.clone());
                        nested.trim().to_string()
                    }
                    None => escape(&format!("[^{}]", label)),
                };
                self.out.push_str(&format!("\\footnote{{{}}}", body));
            }
            Event::SoftBreak => self.out.push('\n'),
            Event::HardBreak => self.out.push_str("\\newline\n"),
            Event::Rule => self.out.push_str("\\begin{center}\\rule{3in}{0.4pt}\\end{center}\n\n"),
            Event::TaskListMarker(done) => {
                self.out.push_str(if done { "[x] " } else { "[ ] " });
            }
            Event::InlineMath(math) => self.out.push_str(&format!("${}$", math)),
            Event::DisplayMath(math) => self.out.push_str(&format!("\\[{}\\]", math)),
            Event::Text(_) => {}
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let trimmed = text.trim();
        if let Some(inner) = trimmed
            .strip_prefix("{::comment}")
            .and_then(|rest| rest.strip_suffix("{:/}"))
        {
            if !self.out.is_empty() && !self.out.ends_with('\n') {
                self.out.push('\n');
            }
            self.out.push_str(&format!("% {}\n", inner));
        } else {
            self.out.push_str(&escape(&text));
        }
    }

    fn start(&mut self, tag: Tag<'a>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.out.push_str(&format!("\\{}{{", heading_command(level)));
            }
            Tag::BlockQuote(_) => self.out.push_str("\\begin{quote}\n"),
            Tag::CodeBlock(_) => {
                self.in_code_block = true;
                self.out.push_str("\\begin{verbatim}\n");
            }
            Tag::List(start) => {
                let ordered = start.is_some();
                self.list_kinds.push(ordered);
                let env = if ordered { "enumerate" } else { "itemize" };
                self.out.push_str(&format!("\\begin{{{}}}\n", env));
            }
            Tag::Item => self.out.push_str("\\item "),
            Tag::Table(alignments) => {
                let columns: String = alignments.iter().map(|_| 'l').collect();
                self.out.push_str(&format!("\\begin{{tabular}}{{{}}}\n", columns));
            }
            Tag::TableHead | Tag::TableRow => self.first_cell = true,
            Tag::TableCell => {
                if !self.first_cell {
                    self.out.push_str(" & ");
                }
                self.first_cell = false;
            }
            Tag::Emphasis => self.out.push_str("\\emph{"),
            Tag::Strong => self.out.push_str("\\textbf{"),
            Tag::Strikethrough => self.out.push_str("\\sout{"),
            Tag::Link { dest_url, .. } => {
                self.out.push_str(&format!("\\href{{{}}}{{", escape_url(&dest_url)));
            }
            Tag::Image { dest_url, title, .. } => {
                self.image = Some(ImageState {
                    src: dest_url.to_string(),
                    hints: title.to_string(),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.out.push_str("\n\n"),
            TagEnd::Heading(_) => self.out.push_str("}\n\n"),
            TagEnd::BlockQuote(_) => self.out.push_str("\\end{quote}\n\n"),
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("\\end{verbatim}\n\n");
            }
            TagEnd::List(_) => {
                let ordered = self.list_kinds.pop().unwrap_or(false);
                let env = if ordered { "enumerate" } else { "itemize" };
                self.out.push_str(&format!("\\end{{{}}}\n\n", env));
            }
            TagEnd::Item => self.out.push('\n'),
            TagEnd::Table => self.out.push_str("\\end{tabular}\n\n"),
            TagEnd::TableHead | TagEnd::TableRow => self.out.push_str(" \\\\\n"),
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link => self.out.push('}'),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.figure(image);
                }
            }
            _ => {}
        }
    }

    fn figure(&mut self, image: ImageState) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        if image.hints.trim().is_empty() {
            self.out.push_str("\\begin{figure}\n");
        } else {
            self.out.push_str(&format!("\\begin{{figure}}   %  {}\n", image.hints.trim()));
        }
        self.out.push_str("\\begin{center}\n");
        self.out.push_str(&format!("\\includegraphics{{{}}}\n", image.src));
        self.out.push_str("\\end{center}\n");
        if !image.alt.is_empty() {
            self.out.push_str(&format!("\\caption{{{}}}\n", escape(&image.alt)));
        }
        self.out.push_str("\\end{figure}\n");
    }

    fn raw_html(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if let Some(comment) = trimmed
            .strip_prefix("<!--")
            .and_then(|rest| rest.strip_suffix("-->"))
        {
            for line in comment.trim().lines() {
                self.out.push_str(&format!("% {}\n", line.trim()));
            }
        }
    }
}

fn heading_command(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "chapter",
        HeadingLevel::H2 => "section",
        HeadingLevel::H3 => "subsection",
        HeadingLevel::H4 => "subsubsection",
        HeadingLevel::H5 => "paragraph",
        HeadingLevel::H6 => "subparagraph",
    }
}

/// Escape LaTeX specials in running text.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '&' => out.push_str("\\&"),
            '%' => out.push_str("\\%"),
            '$' => out.push_str("\\$"),
            '#' => out.push_str("\\#"),
            '_' => out.push_str("\\_"),
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\~{}"),
            '…' => out.push_str("\\ldots{}"),
            '«' => out.push_str("\\og{}"),
            '»' => out.push_str("\\fg{}"),
            _ => out.push(c),
        }
    }
    out.replace("...", "\\ldots{}")
}

fn escape_url(url: &str) -> String {
    url.replace('%', "\\%").replace('#', "\\#")
}

#[cfg(test)]
mod tests {
    use crate::markdown::{MarkdownEngine, RenderEngine, RenderOptions};

    fn latex(md: &str) -> String {
        MarkdownEngine::new().to_latex(md, &RenderOptions::default())
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let out = latex("# Intro\n\nSome *text* here.");
        assert!(out.contains("\\chapter{Intro}\n"));
        assert!(out.contains("Some \\emph{text} here.\n"));
    }

    #[test]
    fn test_unnumbered_heading_keeps_star() {
        let out = latex("# * Preface");
        assert!(out.contains("\\chapter{* Preface}"));
    }

    #[test]
    fn test_footnote_inlined() {
        let out = latex("Claim[^1].\n\n[^1]: Source.");
        assert!(out.contains("Claim\\footnote{Source.}."));
    }

    #[test]
    fn test_superset_comment_becomes_line_comment() {
        let out = latex("Before\n\n{::comment}\\pagebreak{:/}\n\nAfter");
        assert!(out.contains("\n% \\pagebreak\n"));
    }

    #[test]
    fn test_figure_carries_hints() {
        let out = latex("![Dog](dog.jpg 'width=\"40\" class=\"WO\"')");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "\\begin{figure}   %  width=\"40\" class=\"WO\"");
        assert!(lines.contains(&"\\includegraphics{dog.jpg}"));
        assert!(lines.contains(&"\\caption{Dog}"));
        assert!(lines.contains(&"\\end{figure}"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(super::escape("50% of $x_1 & {y}"), "50\\% of \\$x\\_1 \\& \\{y\\}");
        assert_eq!(super::escape("wait... «oui»"), "wait\\ldots{} \\og{}oui\\fg{}");
    }
}
