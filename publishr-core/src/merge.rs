//! Consolidation of per-language bibliography fragments.
//!
//! Every `*{lang}.bib` file in the input directory is concatenated, in
//! sorted file-name order, into `bibliography{lang}.bib`. The consolidated
//! file starts with an ownership marker; once an author removes it the file
//! is theirs and merging leaves it alone.

use crate::config::Project;
use std::fs;
use std::io;
use walkdir::WalkDir;

/// First-line marker of a consolidated file the merge may overwrite.
pub const AUTOGENERATED_MARKER: &str = "# autogenerated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The consolidated file lost its marker and belongs to the author.
    ManuallyOwned,
    /// No fragments and no consolidated file.
    NoFragments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Performed { fragments: usize },
    Skipped(SkipReason),
}

impl MergeOutcome {
    pub fn performed(&self) -> bool {
        matches!(self, MergeOutcome::Performed { .. })
    }
}

fn header(project: &Project) -> String {
    format!(
        "{} by concatenation of all *{}.bib files in this directory. Do not edit this file manually, changes will be overwritten. Remove this line if you want to take control over this file.\n\n",
        AUTOGENERATED_MARKER,
        project.lang()
    )
}

/// Fragment file names for the project's language, sorted.
pub fn bibliography_fragments(project: &Project) -> io::Result<Vec<String>> {
    let output_name = project.localized_name("bibliography", "bib");
    let mut names = Vec::new();

    for entry in WalkDir::new(&project.input_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != output_name && project.is_localized_file(&name, "bib") {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Merge the fragments into `bibliography{lang}.bib` unless the author owns it.
pub fn merge_bibliography(project: &Project) -> io::Result<MergeOutcome> {
    let output_path = project.bibliography_path();

    if output_path.exists() {
        let existing = fs::read_to_string(&output_path)?;
        let first_line = existing.lines().next();
        if let Some(line) = first_line {
            if !line.contains(AUTOGENERATED_MARKER) {
                tracing::info!("{:?} is maintained by hand, not merging", output_path);
                return Ok(MergeOutcome::Skipped(SkipReason::ManuallyOwned));
            }
        }
    }

    let fragments = bibliography_fragments(project)?;
    if fragments.is_empty() && !output_path.exists() {
        tracing::debug!("No bibliography fragments in {:?}", project.input_dir);
        return Ok(MergeOutcome::Skipped(SkipReason::NoFragments));
    }

    let mut output = header(project);
    for name in &fragments {
        output.push_str(&fs::read_to_string(project.input_dir.join(name))?);
    }
    fs::write(&output_path, output)?;

    tracing::info!(
        "Merged {} bibliography fragments into {:?}",
        fragments.len(),
        output_path
    );
    Ok(MergeOutcome::Performed {
        fragments: fragments.len(),
    })
}
