//! # publishr-core
//!
//! Core library for publishr, which renders one book source into e-reader
//! HTML and print LaTeX.
//!
//! This crate provides the superset markup normalizer, citation resolution
//! against a biblatex bibliography, and the line-oriented HTML and LaTeX
//! post-processing passes.

pub mod bibliography;
pub mod builder;
pub mod config;
pub mod filter;
pub mod footnotes;
pub mod formatter;
pub mod frontmatter;
pub mod markdown;
pub mod merge;
pub mod models;
pub mod transform;

pub use bibliography::{BibliographyStore, UsedKeySet};
pub use builder::{BuildError, BuildReport, ProjectBuilder};
pub use config::{Metadata, Project};
pub use filter::{FilterHook, FilterStage, ScriptFilter};
pub use footnotes::{FootnoteCounts, FootnoteCursor};
pub use formatter::{CitationFormatter, PlainFormatter};
pub use markdown::{MarkdownEngine, RenderEngine, RenderOptions, SupersetNormalizer};
pub use merge::{merge_bibliography, MergeOutcome, SkipReason};
pub use models::{
    BibliographyEntry, CitationRequest, CitationStyle, Diagnostic, DiagnosticSeverity,
};
pub use transform::{HtmlTransformer, ImageCatalog, IndexTerms, LatexTransformer};
