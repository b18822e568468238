//! Report the bibliography keys the pages cite.

use super::open_project;
use anyhow::{Context, Result};
use publishr_core::ProjectBuilder;
use serde_json::json;
use std::path::Path;

pub fn used_keys(dir: &Path, language: Option<&str>, json: bool) -> Result<()> {
    let project = open_project(dir, language)?;
    let (store, used) = ProjectBuilder::new(project)
        .used_keys()
        .context("Failed to scan citations")?;

    if json {
        let keys: Vec<_> = used
            .iter()
            .enumerate()
            .map(|(idx, key)| json!({ "ordinal": idx + 1, "key": key }))
            .collect();
        let payload = json!({
            "entries": store.len(),
            "used": keys,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{} of {} entries cited", used.len(), store.len());
        for (idx, key) in used.iter().enumerate() {
            println!("[{}] {}", idx + 1, key);
        }
    }
    Ok(())
}
