//! Core types shared by the engine

pub mod outcome;
pub mod task;
pub mod workflow;

pub use outcome::{FileOperationsResult, ReductionFlags, WorkflowResult};
pub use task::FileTask;
pub use workflow::{
    BitonalImageCompression, ColorImageCompression, ImageQuality, ImageToPdfConfig, OcrConfig,
    Operation, PdfVersion, ReduceConfig, WorkflowDefinition,
};
