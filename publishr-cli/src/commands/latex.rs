//! LaTeX command implementation.

use super::{open_project, print_report};
use anyhow::{Context, Result};
use publishr_core::ProjectBuilder;
use std::path::Path;

/// Render every page and text fragment of the language under `<project>/latex`.
pub fn build_latex(dir: &Path, language: Option<&str>) -> Result<()> {
    let project = open_project(dir, language)?;
    if let Some(command) = project.metadata.latex_command.as_deref() {
        tracing::info!("Compile the output with `{}` inside the latex directory", command);
    }

    let report = ProjectBuilder::new(project)
        .build_latex()
        .context("Failed to build LaTeX")?;

    print_report("LaTeX", &report);
    Ok(())
}
