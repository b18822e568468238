//! Print LaTeX rewriting.
//!
//! Translates the superset macros left in rendered LaTeX into real
//! commands, fixes typography for the print engine, lays out figures from
//! the attribute hints on `\begin{figure}` lines, inserts index entries and
//! points image references at language-specific assets.

use super::{basename, ImageCatalog, IndexTerms};
use crate::config::Project;
use crate::filter::{run_hook, FilterError, FilterHook, FilterStage};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};

static HYPERTARGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\hypertarget\{[^}]*\}\{\}").expect("valid hypertarget regex"));
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\label\{[^}]*\}").expect("valid label regex"));
static HYPHEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-(\w)").expect("valid hyphen regex"));
static LONG_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w.])(\d{5,})").expect("valid number regex"));
/// Commands whose arguments are file names or citation keys.
static VERBATIM_ARGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:includegraphics|autocites?)(?:\[[^\]]*\]|\{[^}]*\})*")
        .expect("valid command regex")
});
static ELLIPSIS_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w \\ldots\{\})").expect("valid ellipsis regex"));
static OMISSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\\ldots\{\}\]").expect("valid omission regex"));

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bname\((.*?)\)").expect("valid name regex"));
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btitle\((.*?)\)").expect("valid title regex"));
static OPENTYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bopentype\((.*?)\)").expect("valid opentype regex"));
static TT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\tt (.*?)\}").expect("valid tt regex"));

static QUOTE_BEGIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\\begin\{(quot[a-z]*)\}(?:   %  class="([^"]*)")?"#).expect("valid quote regex")
});
static QUOTE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\end\{(quote|quotation)\}").expect("valid quote regex"));

static CHAPTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\chapter\{([^*].*)\}").expect("valid chapter regex"));
static STAR_CHAPTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\chapter\{\* (.+)\}").expect("valid chapter regex"));

static CITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s)CITE([(\[{])(.*?)\}").expect("valid cite regex"));
static CITES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s)CITES([(\[{])(.*?)\}").expect("valid cites regex"));
static COMMAND_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"% (\\.*)").expect("valid comment regex"));
static SUPERSCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\^\{\}(.*?)\\\^\{\}").expect("valid superscript regex"));

static FIGURE_HINTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"begin\{figure\}   %  (.*)").expect("valid figure regex"));
static WIDTH_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"width="([^"]*)""#).expect("valid width regex"));
static VSPACE_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"vspace="([^"]*)""#).expect("valid vspace regex"));
static CLASS_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="([^"]*)""#).expect("valid class regex"));
static INCLUDEGRAPHICS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\includegraphics\{(.*?)\}").expect("valid includegraphics regex"));
static GRAPHICS_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"includegraphics[^{]*\{([^}]*)\}").expect("valid src regex"));

/// Width used for a wrapped figure that carries no width hint.
const DEFAULT_WRAP_WIDTH: f64 = 0.5;

/// Float environment of the figure currently open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FigureEnvironment {
    #[default]
    Plain,
    /// `wrapfigure`, text flows beside the image.
    Wrap,
    /// `SCfigure`, caption beside the image.
    SideCaption,
}

impl FigureEnvironment {
    fn end_name(&self) -> &'static str {
        match self {
            FigureEnvironment::Plain => "figure",
            FigureEnvironment::Wrap => "wrapfigure",
            FigureEnvironment::SideCaption => "SCfigure",
        }
    }
}

/// State carried across the lines of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatexState {
    /// Width hint waiting for the next `\includegraphics`, as a text-width fraction.
    pub pending_width: Option<f64>,
    /// Vertical space hint of the current figure.
    pub pending_vspace: Option<String>,
    pub figure: FigureEnvironment,
    /// Environment names of the open quote blocks, innermost last.
    pub quotes: Vec<String>,
}

/// Rewrites the rendered LaTeX of one file. Create one per file.
pub struct LatexTransformer<'a> {
    project: &'a Project,
    images: &'a ImageCatalog,
    output_dir: PathBuf,
    index_terms: Option<&'a IndexTerms>,
    filter: Option<&'a dyn FilterHook>,
    state: LatexState,
}

impl<'a> LatexTransformer<'a> {
    /// `output_dir` holds the copied images that localized references are renamed in.
    pub fn new(project: &'a Project, images: &'a ImageCatalog, output_dir: &Path) -> Self {
        Self {
            project,
            images,
            output_dir: output_dir.to_path_buf(),
            index_terms: None,
            filter: None,
            state: LatexState::default(),
        }
    }

    pub fn with_index_terms(mut self, terms: Option<&'a IndexTerms>) -> Self {
        self.index_terms = terms.filter(|t| !t.is_empty());
        self
    }

    pub fn with_filter(mut self, filter: Option<&'a dyn FilterHook>) -> Self {
        self.filter = filter;
        self
    }

    pub fn state(&self) -> &LatexState {
        &self.state
    }

    /// Rewrite every line, then run the project's latex hook on the result.
    pub fn transform(&mut self, latex: &str, filename: &str) -> Result<String, FilterError> {
        let lines: Vec<String> = latex.split('\n').map(|line| self.process_line(line)).collect();
        run_hook(self.filter, FilterStage::Latex, lines.join("\n"), filename)
    }

    pub fn process_line(&mut self, line: &str) -> String {
        if line.trim().is_empty() {
            return line.to_string();
        }

        let mut line = self.translate_macros(line.to_string());
        line = cleanup(line);
        line = self.layout_figures(line);
        if line.contains("includegraphics") {
            // Asset names are never indexed.
            return self.localize_image(line);
        }
        if let Some(terms) = self.index_terms {
            line = terms.apply(&line);
        }
        line
    }

    fn translate_macros(&mut self, line: String) -> String {
        let line = NAME_RE.replace_all(&line, r"\name{$1}");
        let line = TITLE_RE.replace_all(&line, r"\book{$1}");
        let line = OPENTYPE_RE.replace_all(&line, r"\begin{opentype}$1\end{opentype}");
        let mut line = TT_RE.replace_all(&line, r"\object{$1}").into_owned();

        if line.contains("quot") {
            line = self.translate_quotes(line);
        }

        if line.contains("\\chapter{") {
            line = STAR_CHAPTER_RE
                .replace_all(&line, |caps: &Captures| {
                    format!(
                        "\\chapter*{{{0}}}\n\n\\addcontentsline{{toc}}{{chapter}}{{{0}}}\n\n\\rohead{{{0}}}",
                        &caps[1]
                    )
                })
                .into_owned();
            line = CHAPTER_RE
                .replace_all(&line, "\\chapter{$1}\n\n\\rohead{\\headmark}")
                .into_owned();
        }

        if line.contains("CITE") {
            line = CITE_RE.replace_all(&line, r"$1\autocite$2$3}").into_owned();
            line = CITES_RE.replace_all(&line, r"$1\autocites$2$3}").into_owned();
            line = line.replace("\\{", "{").replace("\\}", "}");
        }

        let line = COMMAND_COMMENT_RE.replace_all(&line, "$1");
        SUPERSCRIPT_RE
            .replace_all(&line, r"\textsuperscript{$1}")
            .into_owned()
    }

    /// `{quote}` becomes `{quotenormal}`, a classed quote `{quoteX}` with
    /// `class="Y"` becomes `{quoteXY}`; closing tags follow their opener.
    fn translate_quotes(&mut self, line: String) -> String {
        let state = &mut self.state;
        let line = QUOTE_BEGIN_RE.replace_all(&line, |caps: &Captures| {
            let env = match caps.get(2) {
                Some(class) => format!("{}{}", &caps[1], class.as_str()),
                None if &caps[1] == "quote" || &caps[1] == "quotation" => {
                    format!("{}normal", &caps[1])
                }
                None => caps[1].to_string(),
            };
            state.quotes.push(env.clone());
            format!("\\begin{{{}}}", env)
        });
        QUOTE_END_RE
            .replace_all(&line, |caps: &Captures| {
                let env = state
                    .quotes
                    .pop()
                    .unwrap_or_else(|| format!("{}normal", &caps[1]));
                format!("\\end{{{}}}", env)
            })
            .into_owned()
    }

    fn layout_figures(&mut self, mut line: String) -> String {
        if let Some(hints) = FIGURE_HINTS_RE.captures(&line).map(|caps| caps[1].to_string()) {
            self.begin_figure(&mut line, &hints);
        }

        if line.contains("includegraphics") {
            if let Some(width) = self.state.pending_width.take() {
                line = INCLUDEGRAPHICS_RE
                    .replace_all(&line, |caps: &Captures| {
                        format!("\\includegraphics[width={}\\textwidth]{{{}}}", width, &caps[1])
                    })
                    .into_owned();
            }
        }

        if line.contains("end{figure}") {
            line = self.end_figure(line);
        }

        line
    }

    fn begin_figure(&mut self, line: &mut String, hints: &str) {
        if let Some(caps) = WIDTH_HINT_RE.captures(hints) {
            self.state.pending_width = width_fraction(&caps[1]);
        }
        if let Some(caps) = VSPACE_HINT_RE.captures(hints) {
            self.state.pending_vspace = Some(caps[1].to_string());
        }

        let class = match CLASS_HINT_RE.captures(hints) {
            Some(caps) => caps[1].to_string(),
            None => return,
        };
        let mut letters = class.chars();
        match letters.next() {
            Some('W') => {
                let side = letters.next().unwrap_or('O');
                let width = self.state.pending_width.unwrap_or(DEFAULT_WRAP_WIDTH);
                *line = line.replacen(
                    "begin{figure}",
                    &format!("begin{{wrapfigure}}{{{}}}{{{}\\textwidth}}\n", side, width),
                    1,
                );
                if let Some(vspace) = &self.state.pending_vspace {
                    line.push_str(&format!("\n\\vspace{{{}}}\n", vspace));
                }
                self.state.figure = FigureEnvironment::Wrap;
            }
            Some(placement @ ('H' | 'h')) => {
                *line = line.replacen("begin{figure}", &format!("begin{{figure}}[{}]", placement), 1);
            }
            Some('S') => {
                *line = line.replacen("begin{figure}", "begin{SCfigure}", 1);
                self.state.figure = FigureEnvironment::SideCaption;
            }
            _ => {}
        }
    }

    /// Close the open figure. An end without a matching start passes through.
    fn end_figure(&mut self, line: String) -> String {
        let figure = std::mem::take(&mut self.state.figure);
        let vspace = self.state.pending_vspace.take();

        match figure {
            FigureEnvironment::Plain => line,
            FigureEnvironment::Wrap => {
                let line = line.replacen("end{figure}", &format!("end{{{}}}", figure.end_name()), 1);
                match vspace {
                    Some(vspace) => format!("\n\\vspace{{{}}}\n{}", vspace, line),
                    None => line,
                }
            }
            FigureEnvironment::SideCaption => {
                line.replacen("end{figure}", &format!("end{{{}}}", figure.end_name()), 1)
            }
        }
    }

    /// Point the reference at `stem-{lang}` when a localized asset exists.
    ///
    /// The vector variant wins over the raster one. The copied asset in the
    /// output directory is renamed once; later references find it renamed.
    fn localize_image(&self, line: String) -> String {
        let src = match GRAPHICS_SRC_RE.captures(&line) {
            Some(caps) => caps[1].to_string(),
            None => {
                tracing::debug!("includegraphics without a source left as is: {}", line);
                return line;
            }
        };

        let lang = self.project.lang();
        let stem = match basename(&src).strip_suffix(".jpg") {
            Some(stem) if !lang.is_empty() => stem,
            _ => return line.replace(".jpg", ""),
        };
        let dashed = self.project.lang_dashed();

        let vector = format!("{}{}.eps", stem, lang);
        let raster = format!("{}{}.jpg", stem, lang);
        let localized = if self.images.has_vector(&vector) {
            Some((vector, format!("{}{}.eps", stem, dashed)))
        } else if self.images.has_raster(&raster) {
            Some((raster, format!("{}{}.jpg", stem, dashed)))
        } else {
            None
        };

        match localized {
            Some((from, to)) => {
                self.rename_asset(&from, &to);
                line.replace(".jpg", &dashed)
            }
            None => line.replace(".jpg", ""),
        }
    }

    fn rename_asset(&self, from: &str, to: &str) {
        let source = self.output_dir.join(from);
        if !source.exists() {
            return;
        }
        let target = self.output_dir.join(to);
        match fs::rename(&source, &target) {
            Ok(()) => tracing::debug!("Renamed {:?} to {:?}", source, target),
            Err(err) => tracing::warn!("Failed to rename {:?}: {}", source, err),
        }
    }
}

/// Typography fixes for the print engine.
fn cleanup(line: String) -> String {
    let line = HYPERTARGET_RE.replace_all(&line, "");
    let line = LABEL_RE.replace_all(&line, "");

    // Quotes followed by ! or ? confuse the babel shorthands.
    let mut line = line.replace('!', "!{}").replace('?', "?{}");

    line = outside_commands(&line, |text| {
        let text = HYPHEN_RE.replace_all(text, r"$1\hyp{}$2");
        LONG_NUMBER_RE
            .replace_all(&text, |caps: &Captures| {
                format!("{}{}", &caps[1], group_thousands(&caps[2]))
            })
            .into_owned()
    });

    let line = line.replace('°', "\\textdegree{}");
    let line = ELLIPSIS_WORD_RE.replace_all(&line, r"\mbox{$1}");
    OMISSION_RE.replace_all(&line, r"\omission{}").into_owned()
}

/// Apply `rewrite` to the text between file-name and citation-key commands.
fn outside_commands(line: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for m in VERBATIM_ARGS_RE.find_iter(line) {
        out.push_str(&rewrite(&line[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&rewrite(&line[last..]));
    out
}

/// `1234567` becomes `1\,234\,567`.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 2);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push_str("\\,");
        }
        out.push(c);
    }
    out
}

/// `"40"` or `"40%"` as a fraction of the text width.
fn width_fraction(raw: &str) -> Option<f64> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().map(|percent| percent / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Metadata;

    fn project(language: Option<&str>) -> Project {
        Project::with_metadata("/nonexistent", language, Metadata::default())
    }

    fn run_lines(transformer: &mut LatexTransformer<'_>, lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| transformer.process_line(l)).collect()
    }

    #[test]
    fn test_wrap_figure() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        let out = run_lines(
            &mut transformer,
            &[
                r#"\begin{figure}   %  width="40" class="WO""#,
                r"\includegraphics{dog.jpg}",
                r"\end{figure}",
            ],
        );

        assert!(out[0].starts_with("\\begin{wrapfigure}{O}{0.4\\textwidth}\n"));
        assert_eq!(out[1], "\\includegraphics[width=0.4\\textwidth]{dog}");
        assert_eq!(out[2], "\\end{wrapfigure}");
        assert_eq!(transformer.state(), &LatexState::default());
    }

    #[test]
    fn test_wrap_figure_with_vspace_and_side() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        let out = run_lines(
            &mut transformer,
            &[
                r#"\begin{figure}   %  vspace="-1em" class="WL""#,
                r"\includegraphics{map.jpg}",
                r"\end{figure}",
            ],
        );

        assert!(out[0].starts_with("\\begin{wrapfigure}{L}{0.5\\textwidth}\n"));
        assert!(out[0].ends_with("\n\\vspace{-1em}\n"));
        assert_eq!(out[1], "\\includegraphics{map}");
        assert_eq!(out[2], "\n\\vspace{-1em}\n\\end{wrapfigure}");
    }

    #[test]
    fn test_placement_and_side_caption() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        let out = transformer.process_line(r#"\begin{figure}   %  class="H""#);
        assert!(out.starts_with("\\begin{figure}[H]"));
        assert_eq!(transformer.process_line(r"\end{figure}"), "\\end{figure}");

        let out = transformer.process_line(r#"\begin{figure}   %  class="S""#);
        assert!(out.starts_with("\\begin{SCfigure}"));
        assert_eq!(transformer.state().figure, FigureEnvironment::SideCaption);
        assert_eq!(transformer.process_line(r"\end{figure}"), "\\end{SCfigure}");
        assert_eq!(transformer.state().figure, FigureEnvironment::Plain);
    }

    #[test]
    fn test_unmatched_figure_end_passes_through() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        assert_eq!(transformer.process_line(r"\end{figure}"), "\\end{figure}");
        assert_eq!(transformer.state(), &LatexState::default());
    }

    #[test]
    fn test_width_applies_to_next_image_only() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        let out = run_lines(
            &mut transformer,
            &[
                r#"\begin{figure}   %  width="25%""#,
                r"\includegraphics{a.jpg}",
                r"\includegraphics{b.jpg}",
            ],
        );
        assert_eq!(out[1], "\\includegraphics[width=0.25\\textwidth]{a}");
        assert_eq!(out[2], "\\includegraphics{b}");
    }

    #[test]
    fn test_macro_translation() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        insta::assert_snapshot!(
            transformer.process_line(r"name(Kant) wrote title(Critique) in {\tt opentype(fi)}"),
            @r"\name{Kant} wrote \book{Critique} in \object{\begin{opentype}fi\end{opentype}}"
        );
        assert_eq!(transformer.process_line(r"% \pagebreak"), "\\pagebreak");
        assert_eq!(
            transformer.process_line(r"x\^{}2\^{}"),
            "x\\textsuperscript{2}"
        );
    }

    #[test]
    fn test_chapters() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        assert_eq!(
            transformer.process_line(r"\chapter{Intro}"),
            "\\chapter{Intro}\n\n\\rohead{\\headmark}"
        );
        assert_eq!(
            transformer.process_line(r"\chapter{* Preface}"),
            "\\chapter*{Preface}\n\n\\addcontentsline{toc}{chapter}{Preface}\n\n\\rohead{Preface}"
        );
    }

    #[test]
    fn test_citations() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        assert_eq!(
            transformer.process_line(r"As shown CITE[12]\{smith-2001\}."),
            "As shown \\autocite[12]{smith-2001}."
        );
        assert_eq!(
            transformer.process_line(r"Both CITES[cf.][1-2]\{a\}[5]\{b\} here"),
            "Both \\autocites[cf.][1-2]{a}[5]{b} here"
        );
    }

    #[test]
    fn test_quote_environments() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        let out = run_lines(
            &mut transformer,
            &[
                r#"\begin{quote}   %  class="poem""#,
                r"\begin{quote}",
                r"\end{quote}",
                r"\end{quote}",
            ],
        );
        assert_eq!(
            out,
            vec![
                "\\begin{quotepoem}",
                "\\begin{quotenormal}",
                "\\end{quotenormal}",
                "\\end{quotepoem}",
            ]
        );
    }

    #[test]
    fn test_cleanup() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        assert_eq!(
            transformer.process_line("Well-known? Yes! 30° and 1234567 km"),
            "Well\\hyp{}known?{} Yes!{} 30\\textdegree{} and 1\\,234\\,567 km"
        );
        assert_eq!(
            transformer.process_line(r"and so \ldots{} [\ldots{}] end\label{x}"),
            "and s\\mbox{o \\ldots{}} \\omission{} end"
        );
    }

    #[test]
    fn test_cleanup_keeps_file_names_and_keys() {
        let project = project(None);
        let images = ImageCatalog::default();
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"));

        assert_eq!(
            transformer.process_line(r"\includegraphics{IMG_20230101.jpg}"),
            "\\includegraphics{IMG_20230101}"
        );
        assert_eq!(
            transformer.process_line(r"See CITE[12]\{report2023\_12345\}."),
            "See \\autocite[12]{report2023\\_12345}."
        );
        assert_eq!(
            transformer.process_line(r"A well-known claim CITE[3-4]\{doe-2020\} from 12345 sources"),
            "A well\\hyp{}known claim \\autocite[3-4]{doe-2020} from 12\\,345 sources"
        );
    }

    #[test]
    fn test_localized_images_are_renamed_once() {
        let out_dir = tempfile::tempdir().unwrap();
        std::fs::write(out_dir.path().join("dog.en.eps"), b"eps").unwrap();
        std::fs::write(out_dir.path().join("cat.en.jpg"), b"jpg").unwrap();

        let project = project(Some("en"));
        let images = ImageCatalog::from_names(["dog.en.eps", "dog.en.jpg", "cat.en.jpg"]);
        let mut transformer = LatexTransformer::new(&project, &images, out_dir.path());

        assert_eq!(transformer.process_line(r"\includegraphics{dog.jpg}"), "\\includegraphics{dog-en}");
        assert!(out_dir.path().join("dog-en.eps").exists());
        assert!(!out_dir.path().join("dog.en.eps").exists());

        // Already renamed: the reference is still rewritten.
        assert_eq!(transformer.process_line(r"\includegraphics{dog.jpg}"), "\\includegraphics{dog-en}");

        assert_eq!(transformer.process_line(r"\includegraphics{cat.jpg}"), "\\includegraphics{cat-en}");
        assert!(out_dir.path().join("cat-en.jpg").exists());

        assert_eq!(transformer.process_line(r"\includegraphics{owl.jpg}"), "\\includegraphics{owl}");
    }

    #[test]
    fn test_index_terms_applied() {
        let project = project(None);
        let images = ImageCatalog::default();
        let terms = IndexTerms::parse("cat\ncataclysm");
        let mut transformer = LatexTransformer::new(&project, &images, Path::new("/nonexistent"))
            .with_index_terms(Some(&terms));

        assert_eq!(
            transformer.process_line("a cataclysm"),
            "a cataclysm\\index{cataclysm}"
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("12345"), "12\\,345");
        assert_eq!(group_thousands("123456"), "123\\,456");
        assert_eq!(cleanup("pi is 3.14159 and 2024".into()), "pi is 3.14159 and 2024");
    }

    #[test]
    fn test_width_fraction() {
        assert_eq!(width_fraction("40"), Some(0.4));
        assert_eq!(width_fraction("40%"), Some(0.4));
        assert_eq!(width_fraction("wide"), None);
    }
}
