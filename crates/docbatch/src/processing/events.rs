//! Batch progress events
//!
//! Every callback is mandatory: an observer is handed to the pool at
//! construction time and receives all events of every run.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use crate::remote::PageRange;
use crate::types::FileOperationsResult;

use super::stats::BatchSummary;

/// 1-based worker number, used only for reporting
pub type WorkerId = usize;

/// Receives engine events.
///
/// Calls are serialized across workers. A callback may call back into the
/// pool (`pause_work`, `abort_work`, ...).
pub trait BatchObserver: Send + Sync {
    /// Before each upload attempt
    fn upload_started(&self, worker: WorkerId, file: &Path, attempt: u32);

    /// Before each attempt of a server-side operation
    fn operation_started(&self, worker: WorkerId, file: &Path, attempt: u32);

    /// Before each download attempt
    fn download_started(&self, worker: WorkerId, file: &Path, attempt: u32);

    /// Before each attempt of one OCR chunk
    fn chunk_progress(
        &self,
        worker: WorkerId,
        file: &Path,
        pages: &PageRange,
        page_count: u32,
        attempt: u32,
    );

    fn error(&self, message: &str);

    fn warning(&self, message: &str);

    /// Remote usage credit left after a successful step
    fn remaining_tokens(&self, tokens: i64);

    fn file_completed(&self, result: &FileOperationsResult);

    fn worker_paused(&self, worker: WorkerId);

    fn worker_completed(&self, worker: WorkerId);

    /// Fired once per run, after the last worker completed
    fn all_completed(&self);
}

/// Serializes observer calls coming from all workers.
///
/// The lock is reentrant so an observer may trigger events from inside a
/// callback, and it is distinct from the pool state lock.
pub struct EventSink {
    observer: Arc<dyn BatchObserver>,
    dispatch: ReentrantMutex<()>,
}

impl EventSink {
    pub fn new(observer: Arc<dyn BatchObserver>) -> Self {
        Self {
            observer,
            dispatch: ReentrantMutex::new(()),
        }
    }

    /// Invoke the observer under the dispatch lock
    pub fn emit<F>(&self, event: F)
    where
        F: FnOnce(&dyn BatchObserver),
    {
        let _guard = self.dispatch.lock();
        event(self.observer.as_ref());
    }

    /// Hold the dispatch lock across several events
    pub fn hold(&self) -> ReentrantMutexGuard<'_, ()> {
        self.dispatch.lock()
    }
}

/// Logs every event through `tracing` and keeps a running summary
#[derive(Default)]
pub struct TracingObserver {
    summary: Mutex<BatchSummary>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary.lock().clone()
    }
}

impl BatchObserver for TracingObserver {
    fn upload_started(&self, worker: WorkerId, file: &Path, attempt: u32) {
        if attempt == 0 {
            tracing::info!("[worker {}] Uploading {}", worker, file.display());
        } else {
            tracing::info!(
                "[worker {}] Uploading {} (retry {})",
                worker,
                file.display(),
                attempt
            );
        }
    }

    fn operation_started(&self, worker: WorkerId, file: &Path, attempt: u32) {
        tracing::debug!(
            "[worker {}] Processing {} (attempt {})",
            worker,
            file.display(),
            attempt + 1
        );
    }

    fn download_started(&self, worker: WorkerId, file: &Path, attempt: u32) {
        tracing::debug!(
            "[worker {}] Downloading {} (attempt {})",
            worker,
            file.display(),
            attempt + 1
        );
    }

    fn chunk_progress(
        &self,
        worker: WorkerId,
        file: &Path,
        pages: &PageRange,
        page_count: u32,
        attempt: u32,
    ) {
        tracing::info!(
            "[worker {}] OCR {} pages {} of {} (attempt {})",
            worker,
            file.display(),
            pages,
            page_count,
            attempt + 1
        );
    }

    fn error(&self, message: &str) {
        self.summary.lock().errors += 1;
        tracing::error!("{}", message);
    }

    fn warning(&self, message: &str) {
        self.summary.lock().warnings += 1;
        tracing::warn!("{}", message);
    }

    fn remaining_tokens(&self, tokens: i64) {
        self.summary.lock().remaining_tokens = Some(tokens);
        tracing::debug!("Remaining tokens: {}", tokens);
    }

    fn file_completed(&self, result: &FileOperationsResult) {
        self.summary.lock().record_completed(result);
        tracing::info!(
            "Completed {} ({} -> {} bytes)",
            result.input_path.display(),
            result.input_size,
            result.output_size
        );
    }

    fn worker_paused(&self, worker: WorkerId) {
        tracing::info!("[worker {}] Paused", worker);
    }

    fn worker_completed(&self, worker: WorkerId) {
        tracing::debug!("[worker {}] Finished", worker);
    }

    fn all_completed(&self) {
        let summary = self.summary.lock();
        tracing::info!(
            "All work completed: {} files, {} errors, {} warnings",
            summary.files_completed,
            summary.errors,
            summary.warnings
        );
    }
}
