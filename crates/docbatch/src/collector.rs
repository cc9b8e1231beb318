//! Input file collection
//!
//! Turns a source string (one file, one folder, or a `|`-delimited
//! list of both) into the `FileTask`s fed to the pool.

use std::path::{self, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::CollectionConfig;
use crate::processing::is_same_path;
use crate::types::FileTask;

/// Result kind of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Success,
    /// Files were collected but the user should be told something
    SuccessWithWarning,
    /// Nothing to process
    Unfulfilled,
    UnfulfilledWithError,
}

impl CollectionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::SuccessWithWarning)
    }
}

#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    pub status: CollectionStatus,
    pub message: Option<String>,
    /// Empty unless `status` is a success
    pub tasks: Vec<FileTask>,
}

impl CollectionOutcome {
    fn failed(status: CollectionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            tasks: Vec::new(),
        }
    }
}

/// Resolve the extension allow-list.
///
/// `input` is a `|`-separated list or `all`. Entries the service does not
/// support are dropped; an empty result falls back to every supported
/// extension. Extensions are upper-case, without the dot.
pub fn parse_input_extensions(
    input: Option<&str>,
    supported: &[String],
    only_pdf: bool,
) -> Vec<String> {
    if only_pdf {
        return vec!["PDF".to_string()];
    }

    let input = input.map(str::trim).unwrap_or_default();
    if input.is_empty() || input.eq_ignore_ascii_case("all") {
        return supported.to_vec();
    }

    let extensions: Vec<String> = input
        .split('|')
        .map(|entry| entry.trim().trim_start_matches('.').to_uppercase())
        .filter(|entry| supported.contains(entry))
        .collect();

    if extensions.is_empty() {
        supported.to_vec()
    } else {
        extensions
    }
}

/// Append a trailing separator to a folder path string
pub fn normalize_folder_path(folder: &str) -> String {
    match folder.chars().last() {
        Some(last) if path::is_separator(last) => folder.to_string(),
        _ => format!("{}{}", folder, path::MAIN_SEPARATOR),
    }
}

/// Output name under the destination: the service always produces PDF
fn output_name(source: &Path) -> PathBuf {
    let mut name = PathBuf::from(source.file_name().unwrap_or_default());
    let is_pdf = name
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        name.set_extension("pdf");
    }
    name
}

pub struct FileCollector {
    settings: CollectionConfig,
    extensions: Vec<String>,
}

impl FileCollector {
    /// `supported` lists the service's extensions for the workflow input kind
    pub fn new(settings: &CollectionConfig, supported: &[String]) -> Self {
        let extensions = parse_input_extensions(
            settings.input_extensions.as_deref(),
            supported,
            settings.only_process_pdf,
        );
        Self {
            settings: settings.clone(),
            extensions,
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn collect(&self, source: &str, destination: &Path) -> CollectionOutcome {
        let source = source.trim();
        if source.is_empty() {
            return CollectionOutcome::failed(
                CollectionStatus::UnfulfilledWithError,
                "no source files specified",
            );
        }

        let entries: Vec<PathBuf> = source
            .split('|')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
            .collect();

        let single_folder = match entries.as_slice() {
            [only] if only.is_dir() => true,
            [only] if !only.is_file() => {
                return CollectionOutcome::failed(
                    CollectionStatus::UnfulfilledWithError,
                    format!("invalid source: {}", only.display()),
                )
            }
            _ => false,
        };

        let destination = PathBuf::from(normalize_folder_path(&destination.to_string_lossy()));
        if !destination.is_dir() {
            return CollectionOutcome::failed(
                CollectionStatus::UnfulfilledWithError,
                format!("destination folder {} does not exist", destination.display()),
            );
        }

        let mut tasks = Vec::new();
        if single_folder {
            self.walk(&entries[0], Path::new(""), self.settings.process_subfolders, &mut tasks);
        } else {
            for entry in &entries {
                if entry.is_file() {
                    if self.accepts(entry) {
                        tasks.push(FileTask::new(entry, output_name(entry)));
                    }
                } else if entry.is_dir() {
                    if self.settings.process_subfolders {
                        let prefix = PathBuf::from(entry.file_name().unwrap_or_default());
                        self.walk(entry, &prefix, true, &mut tasks);
                    }
                } else {
                    tracing::debug!("Skipping missing source entry {}", entry.display());
                }
            }
        }

        tracing::info!("Collected {} files from {}", tasks.len(), source);

        if tasks.is_empty() {
            return CollectionOutcome::failed(CollectionStatus::Unfulfilled, "no file to process");
        }

        if self.settings.warn_when_same_input_output_directory
            && self.any_input_folder_is(&entries, &destination)
        {
            return CollectionOutcome {
                status: CollectionStatus::SuccessWithWarning,
                message: Some(
                    "an input folder is also the destination folder, processed files may replace their originals"
                        .to_string(),
                ),
                tasks,
            };
        }

        CollectionOutcome {
            status: CollectionStatus::Success,
            message: None,
            tasks,
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_uppercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    fn walk(&self, root: &Path, prefix: &Path, recursive: bool, tasks: &mut Vec<FileTask>) {
        let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker.into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                continue;
            }

            let folder = entry
                .path()
                .parent()
                .and_then(|parent| parent.strip_prefix(root).ok())
                .unwrap_or_else(|| Path::new(""));
            let relative = prefix.join(folder).join(output_name(entry.path()));
            tasks.push(FileTask::new(entry.path(), relative));
        }
    }

    fn any_input_folder_is(&self, entries: &[PathBuf], destination: &Path) -> bool {
        entries.iter().any(|entry| {
            let folder = if entry.is_dir() {
                Some(entry.as_path())
            } else {
                entry.parent()
            };
            folder.is_some_and(|folder| is_same_path(folder, destination))
        })
    }
}
