//! E-book command implementation.

use super::{open_project, print_report};
use anyhow::{Context, Result};
use publishr_core::ProjectBuilder;
use std::path::{Path, PathBuf};

/// Render every page of the language to HTML under `<project>/epub`.
pub fn build_ebook(
    dir: &Path,
    language: Option<&str>,
    resources_url: Option<String>,
    skeleton: Option<PathBuf>,
) -> Result<()> {
    let project = open_project(dir, language)?
        .with_resources_url(resources_url)
        .with_skeleton_dir(skeleton);

    let report = ProjectBuilder::new(project)
        .build_ebook()
        .context("Failed to build e-book")?;

    print_report("E-book", &report);
    Ok(())
}
