//! Project-supplied postprocessing hook.
//!
//! A project may ship an executable `filter{lang}` next to its sources. It is
//! invoked once per output file and stage as `filter{lang} <stage> <filename>`,
//! receives the assembled text on stdin and must print the replacement text.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Failed to run filter {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filter {path:?} failed at stage {stage} (exit {code:?}): {stderr}")]
    Failed {
        path: PathBuf,
        stage: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Filter {0:?} produced non UTF-8 output")]
    InvalidOutput(PathBuf),
}

/// Pipeline stage a hook runs after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    /// After superset normalization, before rendering.
    Markup,
    Html,
    Latex,
}

impl FilterStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStage::Markup => "kramdown_postprocessing",
            FilterStage::Html => "html_postprocessing",
            FilterStage::Latex => "latex_postprocessing",
        }
    }
}

/// Opaque text postprocessor.
pub trait FilterHook {
    fn apply(&self, stage: FilterStage, text: &str, filename: &str) -> Result<String, FilterError>;
}

/// Runs an external executable as the hook.
#[derive(Debug, Clone)]
pub struct ScriptFilter {
    path: PathBuf,
}

impl ScriptFilter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The project's `filter{lang}` executable, if it exists.
    pub fn discover(input_dir: &Path, localized_stem: &str) -> Option<Self> {
        let path = input_dir.join(localized_stem);
        if path.is_file() {
            debug!("Using filter hook {:?}", path);
            Some(Self::new(path))
        } else {
            None
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FilterHook for ScriptFilter {
    fn apply(&self, stage: FilterStage, text: &str, filename: &str) -> Result<String, FilterError> {
        let spawn_err = |source| FilterError::Spawn {
            path: self.path.clone(),
            source,
        };

        let mut child = Command::new(&self.path)
            .arg(stage.as_str())
            .arg(filename)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Fed from a separate thread so a hook streaming its output cannot
        // block on a full stdout pipe while we are still writing.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = text.to_owned();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output().map_err(spawn_err)?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(err)) if err.kind() != ErrorKind::BrokenPipe => return Err(spawn_err(err)),
                Ok(_) => {}
                Err(_) => debug!("Filter input writer for {:?} panicked", self.path),
            }
        }
        if !output.status.success() {
            return Err(FilterError::Failed {
                path: self.path.clone(),
                stage: stage.as_str(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| FilterError::InvalidOutput(self.path.clone()))
    }
}

/// Run `hook` when present, otherwise pass `text` through.
pub fn run_hook(
    hook: Option<&dyn FilterHook>,
    stage: FilterStage,
    text: String,
    filename: &str,
) -> Result<String, FilterError> {
    match hook {
        Some(hook) => hook.apply(stage, &text, filename),
        None => Ok(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upcase;

    impl FilterHook for Upcase {
        fn apply(&self, stage: FilterStage, text: &str, _filename: &str) -> Result<String, FilterError> {
            Ok(format!("{}:{}", stage.as_str(), text.to_uppercase()))
        }
    }

    #[test]
    fn test_run_hook_passthrough() {
        let out = run_hook(None, FilterStage::Html, "abc".into(), "a.html").unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_run_hook_applies() {
        let out = run_hook(Some(&Upcase), FilterStage::Latex, "abc".into(), "a.tex").unwrap();
        assert_eq!(out, "latex_postprocessing:ABC");
    }

    #[test]
    fn test_discover_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ScriptFilter::discover(dir.path(), "filter.en").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_script_filter_roundtrip() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.en");
        std::fs::write(&path, "#!/bin/sh\nprintf '%s|%s|' \"$1\" \"$2\"\ncat\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let filter = ScriptFilter::discover(dir.path(), "filter.en").unwrap();
        let out = filter.apply(FilterStage::Html, "body", "ch1.en.page").unwrap();
        assert_eq!(out, "html_postprocessing|ch1.en.page|body");
    }
}
