//! CLI command implementations.

pub mod ebook;
pub mod latex;
pub mod merge;
pub mod used_keys;

pub use ebook::build_ebook;
pub use latex::build_latex;
pub use merge::merge_bib;
pub use used_keys::used_keys;

use anyhow::{Context, Result};
use publishr_core::{BuildReport, DiagnosticSeverity, Project};
use std::path::Path;

fn open_project(dir: &Path, language: Option<&str>) -> Result<Project> {
    tracing::info!("Opening project {:?}", dir);
    Project::open(dir, language).context("Failed to open project")
}

/// Print written files and diagnostics of a finished build.
fn print_report(kind: &str, report: &BuildReport) {
    if let Some(outcome) = &report.merge {
        tracing::debug!("Bibliography merge: {:?}", outcome);
    }
    for diag in &report.diagnostics {
        let level = match diag.severity {
            DiagnosticSeverity::Warning => "warning",
        };
        let source = diag
            .source_path
            .as_deref()
            .map(|s| format!(" [{}]", s))
            .unwrap_or_default();
        eprintln!("{}{}: {} ({})", level, source, diag.message, diag.code);
    }
    println!("✅ {} build wrote {} files", kind, report.files.len());
}
