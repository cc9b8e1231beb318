//! docbatch: batch document processing against a remote document service
//!
//! A pool of worker threads drains a shared queue of files. Each file runs
//! through a workflow of remote operations (load, reduce, OCR, save) with
//! per-call retries, and the produced document is kept or discarded
//! depending on whether it actually helps.

pub mod collector;
pub mod config;
pub mod error;
pub mod processing;
pub mod remote;
pub mod types;

pub use collector::{CollectionOutcome, CollectionStatus, FileCollector};
pub use config::BatchConfig;
pub use error::{Error, Result};
pub use processing::{BatchObserver, BatchRun, OperationsManager, RunState, TracingObserver};
pub use remote::{DocumentApi, HttpDocumentApi, RemoteOperationClient};
pub use types::{FileOperationsResult, FileTask, Operation, WorkflowDefinition};
