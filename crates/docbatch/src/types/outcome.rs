//! Per-file results

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Structural changes reported while running a workflow.
///
/// Each flag forces the produced artifact to be kept even without a size win.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionFlags {
    pub content_removed: bool,
    pub version_changed: bool,
    pub linearized: bool,
}

impl ReductionFlags {
    pub fn merge(&mut self, other: ReductionFlags) {
        self.content_removed |= other.content_removed;
        self.version_changed |= other.version_changed;
        self.linearized |= other.linearized;
    }
}

/// Output of one workflow run that reached the end of its steps
#[derive(Debug, Clone, Default)]
pub struct WorkflowResult {
    pub flags: ReductionFlags,
    /// Remote document handle, already scheduled for closing
    pub document_id: Option<String>,
    /// Non-fatal warnings in step order
    pub warnings: Vec<String>,
    /// Bytes returned by the save step
    pub artifact: Option<Vec<u8>>,
}

/// Reported for every file that was processed and produced successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperationsResult {
    pub input_path: PathBuf,
    pub input_size: u64,
    pub output_size: u64,
    pub converted_to_pdf: bool,
}
