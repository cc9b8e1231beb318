//! Batch processing engine: worker pool, workflow execution and output production

mod events;
mod executor;
mod output;
mod pool;
mod queue;
mod stats;

pub use events::{BatchObserver, EventSink, TracingObserver, WorkerId};
pub use executor::{ocr_page_ranges, WorkflowExecutor};
pub use output::{
    is_same_path, must_keep_produced_file, InputSnapshot, KeepDecision, OutputProducer,
    ProductionReport,
};
pub use pool::{BatchRun, OperationsManager, RunState};
pub use queue::WorkQueue;
pub use stats::{compute_reduction_ratio, compute_saved_space_ratio, BatchSummary};
