//! File task descriptor

use std::path::{Path, PathBuf};

/// One unit of work: a source file and where its output goes.
///
/// Produced by the collector, consumed exactly once by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    source: PathBuf,
    relative_path: PathBuf,
    password: Option<String>,
}

impl FileTask {
    /// Create a task. `relative_path` is the output path under the destination folder.
    pub fn new(source: impl Into<PathBuf>, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            relative_path: relative_path.into(),
            password: None,
        }
    }

    /// Attach a decryption password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// File name sent with uploads
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether the source has a `.pdf` extension (any case)
    pub fn is_pdf(&self) -> bool {
        self.source
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}
