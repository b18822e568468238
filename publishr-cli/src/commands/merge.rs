//! Bibliography merge command.

use super::open_project;
use anyhow::{Context, Result};
use publishr_core::{merge_bibliography, MergeOutcome, SkipReason};
use std::path::Path;

pub fn merge_bib(dir: &Path, language: Option<&str>) -> Result<()> {
    let project = open_project(dir, language)?;
    let outcome = merge_bibliography(&project).context("Failed to merge bibliography")?;
    let target = project.localized_name("bibliography", "bib");

    match outcome {
        MergeOutcome::Performed { fragments } => {
            println!("Merged {} fragments into {}", fragments, target)
        }
        MergeOutcome::Skipped(SkipReason::ManuallyOwned) => {
            println!("Skipped: {} is maintained by hand", target)
        }
        MergeOutcome::Skipped(SkipReason::NoFragments) => {
            println!("Skipped: no bibliography fragments found")
        }
    }
    Ok(())
}
