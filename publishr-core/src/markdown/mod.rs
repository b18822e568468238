//! Markup processing: superset normalization, citations and the render engine.

pub mod citations;
pub mod latex;
pub mod superset;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::{HashMap, HashSet};

pub use citations::{CitationContext, DeferredFootnotes};
pub use latex::LatexWriter;
pub use superset::{NormalizedFile, SupersetNormalizer, PAGE_BREAK};

/// Options handed to the render engine for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Number of the first footnote in this file.
    pub footnote_start: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { footnote_start: 1 }
    }
}

/// Turns normalized markup into raw HTML or LaTeX.
///
/// The transforms downstream only rely on the line shapes documented on
/// [`MarkdownEngine`]; any engine producing the same shapes can be used.
pub trait RenderEngine {
    fn to_html(&self, markup: &str, options: &RenderOptions) -> String;
    fn to_latex(&self, markup: &str, options: &RenderOptions) -> String;

    /// How many footnote numbers `to_html` assigns for `markup`.
    fn footnote_count(&self, markup: &str) -> usize;
}

/// Render engine built on pulldown-cmark.
///
/// Footnotes are rendered as a trailing block, one tag per line:
///
/// ```text
/// <div class="footnotes">
/// <ol start="3">
/// <li id="fn:3">
/// <p>Text <a href="#fnref:3" class="reversefootnote">&#8617;</a></p>
/// </li>
/// </ol>
/// </div>
/// ```
pub struct MarkdownEngine {
    options: Options,
}

impl MarkdownEngine {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    fn parse<'a>(&self, markup: &'a str) -> Vec<Event<'a>> {
        Parser::new_ext(markup, self.options).collect()
    }
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for MarkdownEngine {
    fn to_html(&self, markup: &str, options: &RenderOptions) -> String {
        let (body, definitions) = split_footnote_definitions(self.parse(markup));

        let mut numbers: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let events = body.into_iter().map(|event| match event {
            Event::FootnoteReference(label) => {
                let label = label.to_string();
                let number = *numbers.entry(label.clone()).or_insert_with(|| {
                    order.push(label.clone());
                    options.footnote_start + order.len() - 1
                });
                Event::InlineHtml(CowStr::Boxed(
                    format!(
                        r##"<sup id="fnref:{0}"><a href="#fn:{0}" class="footnote">{0}</a></sup>"##,
                        number
                    )
                    .into_boxed_str(),
                ))
            }
            other => other,
        });

        let mut html_output = String::new();
        html::push_html(&mut html_output, events);

        let notes: Vec<(usize, String)> = order
            .iter()
            .filter_map(|label| {
                let events = definitions.get(label)?;
                let mut content = String::new();
                html::push_html(&mut content, events.iter().cloned());
                Some((numbers[label], content))
            })
            .collect();

        if !notes.is_empty() {
            if !html_output.ends_with('\n') {
                html_output.push('\n');
            }
            html_output.push_str(&render_footnote_block(&notes, options.footnote_start));
        }

        html_output
    }

    fn to_latex(&self, markup: &str, _options: &RenderOptions) -> String {
        let (body, definitions) = split_footnote_definitions(self.parse(markup));
        LatexWriter::new(&definitions).write(body)
    }

    fn footnote_count(&self, markup: &str) -> usize {
        let (body, _) = split_footnote_definitions(self.parse(markup));
        let labels: HashSet<String> = body
            .iter()
            .filter_map(|event| match event {
                Event::FootnoteReference(label) => Some(label.to_string()),
                _ => None,
            })
            .collect();
        labels.len()
    }
}

/// Separate footnote definitions from the body events, keyed by label.
fn split_footnote_definitions(
    events: Vec<Event<'_>>,
) -> (Vec<Event<'_>>, HashMap<String, Vec<Event<'_>>>) {
    let mut body = Vec::with_capacity(events.len());
    let mut definitions: HashMap<String, Vec<Event>> = HashMap::new();
    let mut current: Option<(String, Vec<Event>)> = None;

    for event in events {
        match event {
            Event::Start(Tag::FootnoteDefinition(label)) => {
                current = Some((label.to_string(), Vec::new()));
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                if let Some((label, events)) = current.take() {
                    definitions.insert(label, events);
                }
            }
            other => match current.as_mut() {
                Some((_, events)) => events.push(other),
                None => body.push(other),
            },
        }
    }

    (body, definitions)
}

fn render_footnote_block(notes: &[(usize, String)], start: usize) -> String {
    let mut out = String::from("<div class=\"footnotes\">\n");
    out.push_str(&format!("<ol start=\"{}\">\n", start));
    for (number, content) in notes {
        let backlink = format!(
            r##" <a href="#fnref:{}" class="reversefootnote">&#8617;</a>"##,
            number
        );
        let content = content.trim_end();
        let content = match content.rfind("</p>") {
            Some(idx) if idx + 4 == content.len() => {
                format!("{}{}</p>", &content[..idx], backlink)
            }
            _ => format!("{}\n<p>{}</p>", content, backlink.trim_start()),
        };
        out.push_str(&format!("<li id=\"fn:{}\">\n{}\n</li>\n", number, content));
    }
    out.push_str("</ol>\n</div>\n");
    out
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
