//! Build orchestration: e-book HTML and print LaTeX for one project language.
//!
//! Files are processed strictly one after another in sorted file-name
//! order; continuous footnote numbering depends on it.

use crate::{
    bibliography::{scan_citation_keys, BibliographyStore, UsedKeySet},
    config::{ConfigError, Project},
    filter::{FilterError, FilterHook, ScriptFilter},
    footnotes::{FootnoteCounts, FootnoteCursor},
    formatter::{CitationFormatter, PlainFormatter, BIBLIOGRAPHY_STYLE},
    frontmatter::{source_body, SourceKind},
    markdown::{CitationContext, MarkdownEngine, RenderEngine, RenderOptions, SupersetNormalizer},
    merge::{merge_bibliography, MergeOutcome},
    models::Diagnostic,
    transform::{HtmlTransformer, ImageCatalog, IndexTerms, LatexTransformer},
};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
}

/// Text fragments rendered in front of the pages of an e-book.
const EBOOK_TEXT_STEMS: [&str; 3] = ["covertext", "frontmatter", "toc"];

/// What a build produced.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Output files in reading order.
    pub files: Vec<PathBuf>,
    pub merge: Option<MergeOutcome>,
    pub diagnostics: Vec<Diagnostic>,
}

/// One source file, header already stripped.
struct Source {
    name: String,
    kind: SourceKind,
    body: String,
}

/// Builds the outputs of one language of one project.
pub struct ProjectBuilder {
    project: Project,
    engine: Box<dyn RenderEngine>,
    formatter: Box<dyn CitationFormatter>,
}

impl ProjectBuilder {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            engine: Box::new(MarkdownEngine::new()),
            formatter: Box::new(PlainFormatter),
        }
    }

    pub fn with_engine(mut self, engine: Box<dyn RenderEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_formatter(mut self, formatter: Box<dyn CitationFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Keys cited in the project's pages that the bibliography defines.
    pub fn used_keys(&self) -> Result<(BibliographyStore, UsedKeySet), BuildError> {
        let store = BibliographyStore::load(&self.project.bibliography_path());
        let pages = self.read_sources(&self.page_files()?)?;
        let used = UsedKeySet::discover(pages.iter().map(|s| s.body.as_str()), &store);
        Ok((store, used))
    }

    /// Render every page and text fragment to e-reader HTML under `epub/`.
    pub fn build_ebook(&self) -> Result<BuildReport, BuildError> {
        let project = &self.project;
        let out_dir = project.input_dir.join("epub");
        fs::create_dir_all(&out_dir)?;
        tracing::info!("Building e-book for {:?} into {:?}", project.input_dir, out_dir);

        let mut report = BuildReport {
            merge: Some(merge_bibliography(project)?),
            ..BuildReport::default()
        };

        let (mut store, used_keys) = self.used_keys()?;
        report.diagnostics.extend(store.take_diagnostics());

        let mut paths = self.page_files()?;
        for stem in EBOOK_TEXT_STEMS {
            let path = project.localized_path(stem, "txt");
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort_by_key(|p| file_name(p));
        let sources = self.read_sources(&paths)?;
        report
            .diagnostics
            .extend(missing_key_diagnostics(&sources, &store));

        copy_images(project, &out_dir, &["jpg"])?;
        let override_css = project.localized_path("override", "css");
        if override_css.is_file() {
            fs::copy(&override_css, out_dir.join("override.css"))?;
        }

        let images = ImageCatalog::scan(&project.images_dir());
        let filter = ScriptFilter::discover(&project.input_dir, &project.localized_stem("filter"));
        let hook = filter.as_ref().map(|f| f as &dyn FilterHook);

        let context = CitationContext::new(&store, &used_keys, &project.metadata);
        let mut normalizer = SupersetNormalizer::new(context).with_filter(hook);
        let mut cursor = FootnoteCursor::new();
        let mut written = Vec::with_capacity(sources.len());

        for source in &sources {
            let footnote_start = if project.metadata.continuous_footnote_numbering_ebook {
                cursor.next_start()
            } else {
                1
            };

            let normalized = normalizer.normalize(&source.body, &source.name)?;
            // Numbers the engine actually assigned, citation footnotes included.
            let emitted = self.engine.footnote_count(&normalized.markup);
            let citation_footnotes = normalized.counts.citation_footnotes;
            cursor.advance(FootnoteCounts {
                footnotes: emitted.saturating_sub(citation_footnotes),
                citation_footnotes,
            });

            let html = self
                .engine
                .to_html(&normalized.markup, &RenderOptions { footnote_start });
            let html = HtmlTransformer::new(project, &images)
                .with_filter(hook)
                .transform(&html, &source.name)?;

            let out_path = out_dir.join(output_name(&source.name, "html"));
            fs::write(&out_path, html)?;
            tracing::debug!("Rendered {} (footnotes from {})", source.name, footnote_start);
            written.push(out_path);
        }

        report.files = reading_order(project, written);

        if project.bibliography_path().is_file() {
            let path = out_dir.join(project.localized_name("bibliography", "html"));
            fs::write(&path, self.bibliography_page(&store, &used_keys))?;
            report.files.push(path);
        }

        tracing::info!("E-book build wrote {} files", report.files.len());
        Ok(report)
    }

    /// Render every page and text fragment to print LaTeX under `latex/`.
    pub fn build_latex(&self) -> Result<BuildReport, BuildError> {
        let project = &self.project;
        let out_dir = project.input_dir.join("latex");
        fs::create_dir_all(&out_dir)?;
        tracing::info!("Building LaTeX for {:?} into {:?}", project.input_dir, out_dir);

        let mut report = BuildReport {
            merge: Some(merge_bibliography(project)?),
            ..BuildReport::default()
        };

        copy_images(project, &out_dir, &["jpg", "eps", "pdf"])?;
        for path in self.localized_files(&["tex", "bib"])? {
            fs::copy(&path, out_dir.join(file_name(&path)))?;
        }

        let images = ImageCatalog::scan(&project.images_dir());
        let mut index_terms = IndexTerms::load(&project.localized_path("indexterms", "txt"));
        if let Some(terms) = index_terms.as_mut() {
            report.diagnostics.extend(terms.take_diagnostics());
        }
        let filter = ScriptFilter::discover(&project.input_dir, &project.localized_stem("filter"));
        let hook = filter.as_ref().map(|f| f as &dyn FilterHook);

        let paths: Vec<PathBuf> = self
            .localized_files(&["page", "txt"])?
            .into_iter()
            .filter(|p| !file_name(p).contains("indexterms"))
            .collect();

        for source in self.read_sources(&paths)? {
            let latex = self.engine.to_latex(&source.body, &RenderOptions::default());
            let latex = LatexTransformer::new(project, &images, &out_dir)
                .with_index_terms(index_terms.as_ref())
                .with_filter(hook)
                .transform(&latex, &source.name)?;

            let out_path = out_dir.join(output_name(&source.name, "tex"));
            fs::write(&out_path, latex)?;
            tracing::debug!("Rendered {}", source.name);
            report.files.push(out_path);
        }

        tracing::info!("LaTeX build wrote {} files", report.files.len());
        Ok(report)
    }

    fn bibliography_page(&self, store: &BibliographyStore, used_keys: &UsedKeySet) -> String {
        let heading = self.project.metadata.ebook_citation_heading.as_deref().unwrap_or("");
        let mut lines = vec![format!("<h1>{}</h1>", heading)];

        for (idx, key) in used_keys.iter().enumerate() {
            if let Some(entry) = store.get(key) {
                let text = self.formatter.format(entry, BIBLIOGRAPHY_STYLE);
                lines.push(format!("<p><b>[{}]</b> {}</p>", idx + 1, text));
            }
        }
        lines.join("\n")
    }

    fn page_files(&self) -> Result<Vec<PathBuf>, BuildError> {
        self.localized_files(&["page"])
    }

    /// Top-level files of the project's language with one of `extensions`, sorted.
    fn localized_files(&self, extensions: &[&str]) -> Result<Vec<PathBuf>, BuildError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.project.input_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if extensions
                .iter()
                .any(|ext| self.project.is_localized_file(&name, ext))
            {
                files.push(entry.into_path());
            }
        }
        files.sort_by_key(|p| file_name(p));
        Ok(files)
    }

    fn read_sources(&self, paths: &[PathBuf]) -> Result<Vec<Source>, BuildError> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let name = file_name(path);
            let Some(kind) = SourceKind::from_file_name(&name) else {
                continue;
            };
            let content = fs::read_to_string(path)?;
            sources.push(Source {
                body: source_body(&content, kind),
                name,
                kind,
            });
        }
        Ok(sources)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `chapter1.en.page` becomes `chapter1.en.<ext>`.
fn output_name(source_name: &str, ext: &str) -> String {
    Path::new(source_name)
        .with_extension(ext)
        .to_string_lossy()
        .into_owned()
}

/// Cover text, front matter and table of contents first, then the rest sorted.
fn reading_order(project: &Project, mut files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut ordered = Vec::with_capacity(files.len());
    for stem in EBOOK_TEXT_STEMS {
        let name = project.localized_name(stem, "html");
        if let Some(pos) = files.iter().position(|p| file_name(p) == name) {
            ordered.push(files.remove(pos));
        }
    }
    files.sort();
    ordered.extend(files);
    ordered
}

/// One warning per file and key cited without a bibliography entry.
fn missing_key_diagnostics(sources: &[Source], store: &BibliographyStore) -> Vec<Diagnostic> {
    if store.is_empty() {
        return Vec::new();
    }
    let mut diagnostics = Vec::new();
    for source in sources.iter().filter(|s| s.kind == SourceKind::Page) {
        let missing: BTreeSet<String> = scan_citation_keys(&source.body)
            .into_iter()
            .filter(|key| key.chars().all(|c| c.is_alphanumeric() || c == '_'))
            .filter(|key| !store.contains(key))
            .collect();
        for key in missing {
            diagnostics.push(Diagnostic::warning(
                "citation.missing",
                format!("Citation key '{}' has no bibliography entry", key),
                Some(source.name.clone()),
            ));
        }
    }
    diagnostics
}

/// Copy unlocalized images and those of the project's language into `out_dir`.
pub fn copy_images(project: &Project, out_dir: &Path, extensions: &[&str]) -> io::Result<usize> {
    let images_dir = project.images_dir();
    if !images_dir.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(&images_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let wanted = extensions.iter().any(|ext| {
            let unlocalized = name.ends_with(&format!(".{}", ext)) && name.matches('.').count() == 1;
            let localized = !project.lang().is_empty()
                && name.ends_with(&format!("{}.{}", project.lang(), ext));
            unlocalized || localized
        });
        if wanted {
            fs::copy(entry.path(), out_dir.join(&name))?;
            copied += 1;
        }
    }
    tracing::debug!("Copied {} images into {:?}", copied, out_dir);
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Metadata;

    #[test]
    fn test_output_name() {
        assert_eq!(output_name("chapter1.en.page", "html"), "chapter1.en.html");
        assert_eq!(output_name("toc.txt", "tex"), "toc.tex");
    }

    #[test]
    fn test_reading_order() {
        let project = Project::with_metadata("/p", Some("en"), Metadata::default());
        let files = vec![
            PathBuf::from("/p/epub/a.en.html"),
            PathBuf::from("/p/epub/toc.en.html"),
            PathBuf::from("/p/epub/covertext.en.html"),
        ];
        let ordered = reading_order(&project, files);
        assert_eq!(
            ordered,
            vec![
                PathBuf::from("/p/epub/covertext.en.html"),
                PathBuf::from("/p/epub/toc.en.html"),
                PathBuf::from("/p/epub/a.en.html"),
            ]
        );
    }

    #[test]
    fn test_copy_images_by_language() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();
        for name in ["dog.jpg", "dog.en.jpg", "dog.de.jpg", "map.eps"] {
            fs::write(images.join(name), b"x").unwrap();
        }
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let project = Project::with_metadata(dir.path(), Some("en"), Metadata::default());
        let copied = copy_images(&project, &out, &["jpg"]).unwrap();

        assert_eq!(copied, 2);
        assert!(out.join("dog.jpg").exists());
        assert!(out.join("dog.en.jpg").exists());
        assert!(!out.join("dog.de.jpg").exists());
        assert!(!out.join("map.eps").exists());
    }
}
