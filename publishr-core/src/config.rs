//! Project configuration: language tag, input directory and `metadata.yml`.

use crate::models::CitationStyle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read metadata file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Input directory does not exist: {0}")]
    MissingInputDir(PathBuf),
}

/// Per-language project metadata, matching `metadata{lang}.yml`.
///
/// Every key is optional; unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub ebook_citation_style: CitationStyle,

    /// Label put in front of a single page postnote, e.g. "p."
    #[serde(default)]
    pub ebook_citation_page_one: Option<String>,

    /// Label put in front of a page range postnote, e.g. "pp."
    #[serde(default)]
    pub ebook_citation_page_other: Option<String>,

    #[serde(default)]
    pub ebook_citation_heading: Option<String>,

    #[serde(default)]
    pub footnote_heading: Option<String>,

    #[serde(default)]
    pub ebook_format_upcase_title: bool,

    #[serde(default)]
    pub ebook_format_upcase_name: bool,

    #[serde(default)]
    pub continuous_footnote_numbering_ebook: bool,

    #[serde(default)]
    pub latex_command: Option<String>,

    /// Options handed through untouched to the render engine.
    #[serde(default, alias = "kramdown_options")]
    pub render_options: HashMap<String, serde_yaml::Value>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Metadata {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // An empty file parses to YAML null, which is not a mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load metadata from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn page_label_one(&self) -> &str {
        self.ebook_citation_page_one.as_deref().unwrap_or("")
    }

    pub fn page_label_other(&self) -> &str {
        self.ebook_citation_page_other.as_deref().unwrap_or("")
    }
}

/// Canonical dotted language tag: `"en"` and `".en"` both become `".en"`.
///
/// Empty or absent tags select the default locale and yield `None`.
pub fn normalize_language(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() || raw == "." {
        return None;
    }
    if raw.starts_with('.') {
        Some(raw.to_string())
    } else {
        Some(format!(".{}", raw))
    }
}

/// One language of one project on disk.
#[derive(Debug, Clone)]
pub struct Project {
    pub input_dir: PathBuf,
    pub language: Option<String>,
    pub metadata: Metadata,

    /// Prefix for image URLs and switch for stylesheet inlining.
    pub resources_url: Option<String>,

    /// Directory holding the stock `epub.css`/`preview.css` stylesheets.
    pub skeleton_dir: Option<PathBuf>,
}

impl Project {
    /// Open a project, reading `metadata{lang}.yml` when it exists.
    pub fn open<P: AsRef<Path>>(input_dir: P, language: Option<&str>) -> Result<Self, ConfigError> {
        let input_dir = input_dir.as_ref().to_path_buf();
        if !input_dir.is_dir() {
            return Err(ConfigError::MissingInputDir(input_dir));
        }
        let language = normalize_language(language);

        let mut project = Self {
            input_dir,
            language,
            metadata: Metadata::default(),
            resources_url: None,
            skeleton_dir: None,
        };

        let metadata_path = project.localized_path("metadata", "yml");
        if metadata_path.exists() {
            project.metadata = Metadata::from_file(&metadata_path)?;
        } else {
            tracing::debug!("No metadata file at {:?}, using defaults", metadata_path);
        }

        Ok(project)
    }

    /// Build a project from already loaded metadata (used by previews and tests).
    pub fn with_metadata<P: AsRef<Path>>(
        input_dir: P,
        language: Option<&str>,
        metadata: Metadata,
    ) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            language: normalize_language(language),
            metadata,
            resources_url: None,
            skeleton_dir: None,
        }
    }

    pub fn with_resources_url(mut self, url: Option<String>) -> Self {
        self.resources_url = url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_skeleton_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.skeleton_dir = dir;
        self
    }

    /// The dotted language tag, or an empty string for the default locale.
    pub fn lang(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }

    /// Language tag in the dash form used for renamed print assets (`-en`).
    pub fn lang_dashed(&self) -> String {
        self.lang().replace('.', "-")
    }

    /// `stem{lang}.ext`, e.g. `bibliography.en.bib`.
    pub fn localized_name(&self, stem: &str, ext: &str) -> String {
        format!("{}{}.{}", stem, self.lang(), ext)
    }

    /// `stem{lang}` without extension, e.g. `filter.en`.
    pub fn localized_stem(&self, stem: &str) -> String {
        format!("{}{}", stem, self.lang())
    }

    pub fn localized_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.input_dir.join(self.localized_name(stem, ext))
    }

    pub fn bibliography_path(&self) -> PathBuf {
        self.localized_path("bibliography", "bib")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.input_dir.join("images")
    }

    /// True when `file_name` belongs to this project's language.
    ///
    /// For the default locale only untagged names (a single dot) match.
    pub fn is_localized_file(&self, file_name: &str, ext: &str) -> bool {
        let suffix = format!("{}.{}", self.lang(), ext);
        if !file_name.ends_with(&suffix) {
            return false;
        }
        match &self.language {
            Some(_) => true,
            None => file_name.matches('.').count() == 1,
        }
    }
}
