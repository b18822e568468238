//! E-reader HTML rewriting.
//!
//! Reading devices flatten `<blockquote>`, ignore `<ol>` numbering when a
//! footnote is jumped to and do not support `text-transform`. The
//! transformer works line by line over rendered HTML and compensates for
//! each of these, carrying an [`HtmlState`] from one line to the next.

use super::{basename, ImageCatalog};
use crate::config::Project;
use crate::filter::{run_hook, FilterError, FilterHook, FilterStage};
use crate::markdown::PAGE_BREAK;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;

const FOOTNOTES_DIV: &str = r#"<div class="footnotes">"#;

static OL_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<ol start="(\d+)""#).expect("valid ol regex"));
static QUOTE_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<blockquote class="([^"]*)""#).expect("valid blockquote regex"));
static QUOTED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(p|ul|ol|li)\b").expect("valid block tag regex"));

static FNREF_SUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<sup id="fnref:[^"]*">"#).expect("valid fnref regex"));
static FNREF_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="footnote">(.*?)</a>"#).expect("valid fnref link regex"));

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btitle\((.*?)\)").expect("valid title regex"));
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bname\((.*?)\)").expect("valid name regex"));
static OPENTYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bopentype\((.*?)\)").expect("valid opentype regex"));
static SUPERSCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\^([^\^]+)\^").expect("valid superscript regex"));

static H1_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<h1([^>]*)>(.*?)</h1>").expect("valid h1 regex"));
static STAR_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(h[1-6])([^>]*)>\*\s*").expect("valid heading regex"));

static CONFLICT_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"«««.*$").expect("valid regex"));
static CONFLICT_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"»»».*$").expect("valid regex"));

static IMAGE_CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<p([^>]*)><img src="([^"]*)" alt="([^"]*)"(.*?)/></p>"#)
        .expect("valid image caption regex")
});
static WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"width="(\d*)[^"]*""#).expect("valid width regex"));
static SRC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src="([^"]*)""#).expect("valid src regex"));
static JPG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src="([^"]*?\.jpg)"#).expect("valid jpg src regex"));

static P_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p\b[^>]*>").expect("valid p regex"));
static P_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p\b").expect("valid p regex"));
static FOOTNOTE_LI_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<li (id="fn[^"]*")"#).expect("valid li regex"));
static FOOTNOTE_LI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<li id="fn[^>]*>"#).expect("valid li regex"));
static OL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?ol\b[^>]*>").expect("valid ol regex"));
static BACKLINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"<a href="#fnref.*?</a>"##).expect("valid backlink regex"));

/// State carried across the lines of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlState {
    pub quote_depth: usize,
    /// Class of the outermost open blockquote.
    pub quote_type: Option<String>,
    /// Inside the trailing footnotes container.
    pub in_footnotes: bool,
    /// A footnote item opened and its paragraph has not been labelled yet.
    pub pending_footnote: bool,
    pub footnote_number: usize,
    /// `id="fn:N"` of the last footnote item, moved onto its paragraph.
    pub footnote_anchor: String,
}

/// Rewrites the rendered HTML of one file. Create one per file.
pub struct HtmlTransformer<'a> {
    project: &'a Project,
    images: &'a ImageCatalog,
    filter: Option<&'a dyn FilterHook>,
    state: HtmlState,
}

impl<'a> HtmlTransformer<'a> {
    pub fn new(project: &'a Project, images: &'a ImageCatalog) -> Self {
        Self {
            project,
            images,
            filter: None,
            state: HtmlState::default(),
        }
    }

    pub fn with_filter(mut self, filter: Option<&'a dyn FilterHook>) -> Self {
        self.filter = filter;
        self
    }

    pub fn state(&self) -> &HtmlState {
        &self.state
    }

    /// Rewrite every line, then run the project's html hook on the result.
    pub fn transform(&mut self, html: &str, filename: &str) -> Result<String, FilterError> {
        let lines: Vec<String> = html.split('\n').map(|line| self.process_line(line)).collect();
        run_hook(self.filter, FilterStage::Html, lines.join("\n"), filename)
    }

    pub fn process_line(&mut self, line: &str) -> String {
        self.update_state(line);

        let mut line = self.tag_blockquotes(line.to_string());
        line = self.rewrite_footnote_references(line);
        line = self.typography(line);
        line = uppercase_h1(line);
        line = strip_star_heading(line);
        line = mark_merge_conflicts(line);

        if line.contains("<img") {
            line = caption_image(line);
            line = self.localize_image(line);
        }

        if self.project.resources_url.is_some() {
            line = self.rewrite_resources(line);
        }

        if self.state.in_footnotes {
            line = self.strip_footnote_markup(line);
        }
        if self.state.pending_footnote && line.contains("<p>") {
            line = self.label_footnote(line);
        }
        if self.state.in_footnotes && line.contains("<p") {
            line = P_TAG_RE.replace_all(&line, "<p class='footnote'").into_owned();
        }

        line
    }

    fn update_state(&mut self, line: &str) {
        if line.contains(FOOTNOTES_DIV) {
            self.state.in_footnotes = true;
        }
        if self.state.in_footnotes && line.contains("</div>") {
            self.state.in_footnotes = false;
        }

        if self.state.in_footnotes {
            if let Some(caps) = OL_START_RE.captures(line) {
                if let Ok(start) = caps[1].parse::<usize>() {
                    self.state.footnote_number = start.saturating_sub(1);
                }
            }
        }

        if line.contains(r#"<li id="fn"#) {
            self.state.pending_footnote = true;
            self.state.footnote_number += 1;
        }

        if line.contains("<blockquote") {
            self.state.quote_depth += 1;
            if self.state.quote_depth == 1 {
                self.state.quote_type = QUOTE_CLASS_RE.captures(line).map(|caps| caps[1].to_string());
            }
        }
        if line.contains("</blockquote") {
            self.state.quote_depth = self.state.quote_depth.saturating_sub(1);
            if self.state.quote_depth == 0 {
                self.state.quote_type = None;
            }
        }
    }

    fn tag_blockquotes(&self, line: String) -> String {
        if self.state.quote_depth == 0 {
            return line;
        }
        let class = format!(
            "blockquote_{}_{}",
            self.state.quote_type.as_deref().unwrap_or(""),
            self.state.quote_depth
        );
        QUOTED_TAG_RE
            .replace_all(&line, |caps: &Captures| format!("<{} class=\"{}\"", &caps[1], class))
            .into_owned()
    }

    fn rewrite_footnote_references(&self, mut line: String) -> String {
        if line.contains(r#"<sup id="fnref"#) {
            line = FNREF_SUP_RE.replace_all(&line, "").into_owned();
            line = line.replace("</sup>", "");
            line = FNREF_LINK_RE
                .replace_all(&line, "><sup> [$1]</sup></a>")
                .into_owned();
        }
        if line.contains(FOOTNOTES_DIV) {
            let heading = self.project.metadata.footnote_heading.as_deref().unwrap_or("");
            line = line.replace(
                FOOTNOTES_DIV,
                &format!("{}{}<h4>{}</h4>", PAGE_BREAK, FOOTNOTES_DIV, heading),
            );
        }
        line
    }

    fn typography(&self, line: String) -> String {
        let metadata = &self.project.metadata;
        let line = TITLE_RE.replace_all(&line, |caps: &Captures| {
            let title = if metadata.ebook_format_upcase_title {
                upcase_text(&caps[1])
            } else {
                caps[1].to_string()
            };
            format!("<span class=\"booktitle\">{}</span>", title)
        });
        let line = NAME_RE.replace_all(&line, |caps: &Captures| {
            let name = if metadata.ebook_format_upcase_name {
                upcase_text(&caps[1])
            } else {
                caps[1].to_string()
            };
            format!("<span class=\"authorname\">{}</span>", name)
        });
        let line = OPENTYPE_RE.replace_all(&line, "$1");
        SUPERSCRIPT_RE.replace_all(&line, "<sup>$1</sup>").into_owned()
    }

    /// Swap in `name{lang}.jpg` when the project ships that variant.
    fn localize_image(&self, line: String) -> String {
        let lang = self.project.lang();
        if lang.is_empty() {
            return line;
        }
        let src = match SRC_RE.captures(&line) {
            Some(caps) => caps[1].to_string(),
            None => {
                tracing::debug!("Image line without src left as is: {}", line);
                return line;
            }
        };

        let localized_ext = format!("{}.jpg", lang);
        let localized = src.replace(".jpg", &localized_ext);
        if localized != src && self.images.has_raster(basename(&localized)) {
            line.replace(".jpg", &localized_ext)
        } else {
            line
        }
    }

    fn rewrite_resources(&self, mut line: String) -> String {
        let url = match self.project.resources_url.as_deref() {
            Some(url) => url,
            None => return line,
        };

        if line.contains(".jpg") {
            line = JPG_SRC_RE
                .replace_all(&line, |caps: &Captures| format!("src=\"{}{}", url, &caps[1]))
                .into_owned();
        }

        if !line.contains(r#"rel="stylesheet""#) {
            return line;
        }

        let link = line.clone();
        if let Some(dir) = &self.project.skeleton_dir {
            for name in ["epub.css", "preview.css"] {
                if !link.contains(name) {
                    continue;
                }
                match fs::read_to_string(dir.join(name)) {
                    Ok(css) => line = format!("<style>{}</style>", css),
                    Err(err) => tracing::warn!("Cannot inline stylesheet {}: {}", name, err),
                }
            }
        }

        if link.contains("override.css") {
            let path = self.project.localized_path("override", "css");
            if let Ok(css) = fs::read_to_string(&path) {
                line = format!("<style>{}</style>", css);
            }
        }

        line
    }

    fn strip_footnote_markup(&mut self, line: String) -> String {
        let line = P_OPEN_RE.replace_all(&line, "<p>").into_owned();
        if let Some(caps) = FOOTNOTE_LI_REF_RE.captures(&line) {
            self.state.footnote_anchor = caps[1].to_string();
        }
        let line = FOOTNOTE_LI_RE.replace_all(&line, "").replace("</li>", "");
        let line = OL_RE.replace_all(&line, "");
        BACKLINK_RE.replace_all(&line, "").into_owned()
    }

    /// Replace list numbering with a visible `[N]:` label.
    fn label_footnote(&mut self, line: String) -> String {
        let open = if self.state.footnote_anchor.is_empty() {
            "<p>".to_string()
        } else {
            format!("<p {}>", self.state.footnote_anchor)
        };
        self.state.pending_footnote = false;
        line.replacen(
            "<p>",
            &format!("<hr>{}<b>[{}]</b>: ", open, self.state.footnote_number),
            1,
        )
    }
}

fn uppercase_h1(line: String) -> String {
    if !line.contains("<h1") {
        return line;
    }
    H1_RE
        .replace_all(&line, |caps: &Captures| {
            format!("<h1{}>{}</h1><hr />", &caps[1], upcase_text(&caps[2]))
        })
        .into_owned()
}

/// A heading starting with `*` is unnumbered; the marker itself is dropped.
fn strip_star_heading(line: String) -> String {
    STAR_HEADING_RE.replace_all(&line, "<$1$2>").into_owned()
}

fn mark_merge_conflicts(line: String) -> String {
    let line = CONFLICT_START_RE.replace_all(&line, r#"<span style="color:red;">"#);
    let line = line.replace(
        "=======",
        r#"</span></p><p><span style="color:orange;">"#,
    );
    CONFLICT_END_RE.replace_all(&line, "</span></p>").into_owned()
}

/// Turn the alt text into a visible caption and widths into percentages.
fn caption_image(line: String) -> String {
    let line = IMAGE_CAPTION_RE.replace_all(
        &line,
        r#"<p class="image"><img src="$2"${1}${4}/><br /><code>$3</code></p>"#,
    );
    WIDTH_RE.replace_all(&line, r#"width="${1}%""#).into_owned()
}

/// Upper-case text while leaving tags and entities alone.
fn upcase_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;

    for c in html.chars() {
        if in_tag {
            in_tag = c != '>';
            out.push(c);
        } else if in_entity {
            in_entity = c != ';' && !c.is_whitespace();
            out.push(c);
        } else {
            match c {
                '<' => {
                    in_tag = true;
                    out.push(c);
                }
                '&' => {
                    in_entity = true;
                    out.push(c);
                }
                _ => out.extend(c.to_uppercase()),
            }
        }
    }
    out
}
