//! Output production: keep the produced artifact or copy the original through

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

use filetime::FileTime;
use tempfile::NamedTempFile;

use crate::config::FileProductionPolicy;
use crate::error::Result;
use crate::remote::messages;
use crate::types::{FileTask, ReductionFlags, WorkflowResult};

/// Inputs of the keep-or-discard decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepDecision {
    pub reduction_intended: bool,
    pub produced_size: u64,
    pub input_size: u64,
    pub input_is_pdf: bool,
    pub flags: ReductionFlags,
}

/// Whether the produced artifact replaces the original at the destination
pub fn must_keep_produced_file(decision: &KeepDecision) -> bool {
    if !decision.reduction_intended {
        return true;
    }
    decision.produced_size < decision.input_size
        || decision.flags.linearized
        || !decision.input_is_pdf
        || decision.flags.content_removed
        || decision.flags.version_changed
}

/// Size and timestamps of an input, captured before it can be overwritten
#[derive(Debug, Clone, Copy)]
pub struct InputSnapshot {
    pub size: u64,
    pub accessed: FileTime,
    pub modified: FileTime,
    pub created: Option<SystemTime>,
}

impl InputSnapshot {
    pub fn capture(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            size: metadata.len(),
            accessed: FileTime::from_last_access_time(&metadata),
            modified: FileTime::from_last_modification_time(&metadata),
            created: metadata.created().ok(),
        })
    }
}

/// What production left at the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionReport {
    pub output_size: u64,
    pub kept_produced: bool,
    pub warnings: Vec<String>,
}

/// Applies the production policy for every file of a run
#[derive(Debug, Clone, Copy)]
pub struct OutputProducer {
    policy: FileProductionPolicy,
    reduction_intended: bool,
}

impl OutputProducer {
    pub fn new(policy: FileProductionPolicy, reduction_intended: bool) -> Self {
        Self {
            policy,
            reduction_intended,
        }
    }

    /// Materialize `result` for `task` at `destination`
    pub fn produce(
        &self,
        task: &FileTask,
        destination: &Path,
        input: &InputSnapshot,
        result: WorkflowResult,
    ) -> Result<ProductionReport> {
        let source = task.source();
        let same_path = is_same_path(source, destination);
        let mut warnings = Vec::new();

        let keep = result.artifact.as_ref().is_some_and(|artifact| {
            must_keep_produced_file(&KeepDecision {
                reduction_intended: self.reduction_intended,
                produced_size: artifact.len() as u64,
                input_size: input.size,
                input_is_pdf: task.is_pdf(),
                flags: result.flags,
            })
        });

        match result.artifact {
            Some(artifact) if keep => {
                // Staged files are created owner-only; mirror the input's mode
                let permissions = fs::metadata(source).ok().map(|m| m.permissions());
                write_atomically(destination, &artifact)?;
                if let Some(permissions) = permissions {
                    if let Err(e) = fs::set_permissions(destination, permissions) {
                        tracing::debug!(
                            "Could not copy permissions to {}: {}",
                            destination.display(),
                            e
                        );
                    }
                }

                if self.policy.delete_original_on_success && !same_path {
                    if let Err(e) = remove_file_ex(source) {
                        tracing::warn!("Could not delete {}: {}", source.display(), e);
                        warnings.push(format!(
                            "{}: original file could not be deleted: {}",
                            source.display(),
                            e
                        ));
                    }
                }
                if self.policy.keep_write_and_access_time {
                    // The artifact is already in place; a lost timestamp is not a failure
                    warnings.extend(restore_times(destination, input));
                }
                if let Some(created) = input.created {
                    if let Err(e) = set_creation_time(destination, created) {
                        tracing::debug!(
                            "Could not restore creation time of {}: {}",
                            destination.display(),
                            e
                        );
                    }
                }
            }
            discarded => {
                if discarded.is_some() {
                    tracing::debug!(
                        "Discarding produced file for {}: no size gain",
                        source.display()
                    );
                }
                if !same_path {
                    if let Some(parent) = destination.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(source, destination)?;
                    if self.policy.keep_write_and_access_time {
                        filetime::set_file_times(destination, input.accessed, input.modified)?;
                    }
                }
                if self.reduction_intended {
                    warnings.push(format!(
                        "{}: {}",
                        source.display(),
                        messages::FILE_SIZE_REDUCTION_FAILED
                    ));
                }
            }
        }

        Ok(ProductionReport {
            output_size: fs::metadata(destination)?.len(),
            kept_produced: keep,
            warnings,
        })
    }
}

/// Both paths exist and resolve to the same file
pub fn is_same_path(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Write through a sibling temporary file and rename over `destination`.
///
/// Safe when `destination` is also the file being read.
fn write_atomically(destination: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

/// Delete a file, clearing the read-only attribute first
#[allow(clippy::permissions_set_readonly_false)]
/// Copy the input's access and write times onto `path`, as a warning on failure
fn restore_times(path: &Path, input: &InputSnapshot) -> Option<String> {
    let e = filetime::set_file_times(path, input.accessed, input.modified).err()?;
    tracing::warn!("Could not restore times of {}: {}", path.display(), e);
    Some(format!(
        "{}: original access and write times could not be restored: {}",
        path.display(),
        e
    ))
}

fn remove_file_ex(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    fs::remove_file(path)
}

#[cfg(any(windows, target_os = "macos"))]
fn set_creation_time(path: &Path, created: SystemTime) -> io::Result<()> {
    #[cfg(target_os = "macos")]
    use std::os::macos::fs::FileTimesExt;
    #[cfg(windows)]
    use std::os::windows::fs::FileTimesExt;

    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_times(fs::FileTimes::new().set_created(created))
}

/// No settable birth time on this platform
#[cfg(not(any(windows, target_os = "macos")))]
fn set_creation_time(_path: &Path, _created: SystemTime) -> io::Result<()> {
    Ok(())
}
