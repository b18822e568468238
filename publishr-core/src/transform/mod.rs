//! Line state machines that turn rendered output into reader-ready files.

pub mod html;
pub mod index_terms;
pub mod latex;

use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

pub use html::{HtmlState, HtmlTransformer};
pub use index_terms::{IndexTerm, IndexTerms};
pub use latex::{FigureEnvironment, LatexState, LatexTransformer};

/// Basenames of the images a project ships, used to find language variants.
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    raster: BTreeSet<String>,
    vector: BTreeSet<String>,
}

impl ImageCatalog {
    /// Scan `dir` (not recursively) for `.jpg` and `.eps` files.
    pub fn scan(dir: &Path) -> Self {
        let mut catalog = Self::default();
        if !dir.is_dir() {
            tracing::debug!("No images directory at {:?}", dir);
            return catalog;
        }

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            catalog.insert(name);
        }
        catalog
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for name in names {
            catalog.insert(name.into());
        }
        catalog
    }

    fn insert(&mut self, name: String) {
        if name.ends_with(".jpg") {
            self.raster.insert(name);
        } else if name.ends_with(".eps") {
            self.vector.insert(name);
        }
    }

    pub fn has_raster(&self, name: &str) -> bool {
        self.raster.contains(name)
    }

    pub fn has_vector(&self, name: &str) -> bool {
        self.vector.contains(name)
    }
}

/// Final path component of an image reference.
pub(crate) fn basename(src: &str) -> &str {
    src.rsplit('/').next().unwrap_or(src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["dog.jpg", "dog.en.jpg", "map.en.eps", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let catalog = ImageCatalog::scan(dir.path());
        assert!(catalog.has_raster("dog.en.jpg"));
        assert!(catalog.has_vector("map.en.eps"));
        assert!(!catalog.has_raster("notes.txt"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let catalog = ImageCatalog::scan(Path::new("/nonexistent/images"));
        assert!(!catalog.has_raster("dog.jpg"));
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("images/dog.jpg"), "dog.jpg");
        assert_eq!(basename("dog.jpg"), "dog.jpg");
    }
}
