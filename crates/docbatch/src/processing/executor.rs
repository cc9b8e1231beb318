//! Runs a workflow's operations for one file
//!
//! Steps run strictly in order and each produces a uniform `StepOutcome`.
//! The first fatal outcome ends the workflow; warnings accumulate. The remote
//! document is closed in the background whenever one was opened.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::remote::api::{ReduceErrorCode, ResponseStatus};
use crate::remote::spool::spool_compressed;
use crate::remote::{messages, PageRange, RemoteOperationClient, UploadRequest};
use crate::types::{
    FileTask, ImageToPdfConfig, OcrConfig, Operation, PdfVersion, ReduceConfig, ReductionFlags,
    WorkflowDefinition, WorkflowResult,
};

use super::events::{EventSink, WorkerId};

/// Result of one operation
#[derive(Debug, Default)]
pub struct StepOutcome {
    /// Handle opened by a load step
    pub document_id: Option<String>,
    pub warnings: Vec<String>,
    pub remaining_tokens: Option<i64>,
    pub flags: ReductionFlags,
    /// Bytes returned by a save step
    pub artifact: Option<Vec<u8>>,
    pub fatal: Option<Error>,
    /// Stopped early on cancellation
    pub cancelled: bool,
}

impl StepOutcome {
    fn failed(error: Error) -> Self {
        Self {
            fatal: Some(error),
            ..Default::default()
        }
    }
}

/// Split `page_count` pages into requests of at most `chunk_length` pages
pub fn ocr_page_ranges(page_count: u32, chunk_length: u32) -> Vec<PageRange> {
    if page_count == 0 {
        return Vec::new();
    }
    let chunk_length = chunk_length.clamp(1, page_count);
    let chunk_count = page_count.div_ceil(chunk_length);
    let remainder = page_count % chunk_length;

    (1..=chunk_count)
        .map(|chunk| {
            let start = chunk_length * (chunk - 1) + 1;
            let length = if chunk == chunk_count && remainder != 0 {
                remainder
            } else {
                chunk_length
            };
            PageRange::new(start, start + length - 1)
        })
        .collect()
}

fn remaining_tokens(status: &ResponseStatus, action: &'static str) -> Result<i64> {
    status
        .remaining_tokens
        .ok_or(Error::InvalidResponse { action })
}

struct StepContext<'a> {
    worker: WorkerId,
    task: &'a FileTask,
    document_id: Option<&'a str>,
    is_cancelled: &'a dyn Fn() -> bool,
}

impl<'a> StepContext<'a> {
    fn document_id(&self, action: &str) -> Result<&'a str> {
        self.document_id
            .ok_or_else(|| Error::internal(format!("{} requires a loaded document", action)))
    }
}

/// Executes a shared workflow for any number of files
pub struct WorkflowExecutor {
    client: RemoteOperationClient,
    workflow: Arc<WorkflowDefinition>,
    events: Arc<EventSink>,
    ocr_page_chunk_length: u32,
}

impl WorkflowExecutor {
    pub fn new(
        client: RemoteOperationClient,
        workflow: Arc<WorkflowDefinition>,
        events: Arc<EventSink>,
        ocr_page_chunk_length: u32,
    ) -> Self {
        Self {
            client,
            workflow,
            events,
            ocr_page_chunk_length,
        }
    }

    pub fn workflow(&self) -> &WorkflowDefinition {
        &self.workflow
    }

    /// Run every step for `task`.
    ///
    /// Returns `Ok(None)` when cancellation stopped the workflow and `Err` for
    /// the first fatal step.
    pub fn run(
        &self,
        worker: WorkerId,
        task: &FileTask,
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<Option<WorkflowResult>> {
        let mut result = WorkflowResult::default();

        for step in self.workflow.steps() {
            if is_cancelled() {
                tracing::debug!(
                    "[worker {}] Cancelled before {} of {}",
                    worker,
                    step.action_name(),
                    task.source().display()
                );
                self.close(result.document_id.take());
                return Ok(None);
            }

            let context = StepContext {
                worker,
                task,
                document_id: result.document_id.as_deref(),
                is_cancelled,
            };
            let outcome = self.execute(step, &context);

            result.warnings.extend(outcome.warnings);
            result.flags.merge(outcome.flags);
            if let Some(document_id) = outcome.document_id {
                result.document_id = Some(document_id);
            }

            if let Some(error) = outcome.fatal {
                tracing::warn!(
                    "[worker {}] {} failed for {}: {}",
                    worker,
                    step.action_name(),
                    task.source().display(),
                    error
                );
                self.close(result.document_id.take());
                return Err(error);
            }

            if let Some(tokens) = outcome.remaining_tokens {
                self.events.emit(|o| o.remaining_tokens(tokens));
            }

            if outcome.cancelled {
                self.close(result.document_id.take());
                return Ok(None);
            }

            if outcome.artifact.is_some() {
                result.artifact = outcome.artifact;
            }
        }

        self.close(result.document_id.clone());
        Ok(Some(result))
    }

    fn close(&self, document_id: Option<String>) {
        if let Some(document_id) = document_id {
            self.client.close_document_detached(document_id);
        }
    }

    fn execute(&self, step: &Operation, context: &StepContext<'_>) -> StepOutcome {
        let outcome = match step {
            Operation::LoadDocument { output_version } => self.load(context, Some(*output_version)),
            Operation::LoadImage => self.load(context, None),
            Operation::Reduce(config) => self.reduce(context, config),
            Operation::Ocr(config) => self.ocr(context, config),
            Operation::SaveDocument => self.save(context, None),
            Operation::SaveImageAsPdf(config) => self.save(context, Some(config)),
        };
        outcome.unwrap_or_else(StepOutcome::failed)
    }

    /// Documents carry a version; images are loaded with `None`
    fn load(
        &self,
        context: &StepContext<'_>,
        output_version: Option<PdfVersion>,
    ) -> Result<StepOutcome> {
        const ACTION: &str = "Load";
        let source = context.task.source();
        let spool = spool_compressed(source)?;
        let file_name = context.task.file_name();
        let is_document = output_version.is_some();

        let request = UploadRequest {
            file_name: &file_name,
            content: spool.path(),
            conformance: output_version.map(PdfVersion::load_conformance),
            password: if is_document {
                context.task.password()
            } else {
                None
            },
        };

        let response = self.client.call(
            |attempt| {
                self.events
                    .emit(|o| o.upload_started(context.worker, source, attempt))
            },
            |api| {
                if is_document {
                    api.load_document(&request)
                } else {
                    api.load_image(&request)
                }
            },
        )?;

        response.status.check(ACTION)?;
        let document_id = response
            .file_id
            .ok_or(Error::InvalidResponse { action: ACTION })?;

        Ok(StepOutcome {
            document_id: Some(document_id),
            remaining_tokens: Some(remaining_tokens(&response.status, ACTION)?),
            ..Default::default()
        })
    }

    fn reduce(&self, context: &StepContext<'_>, config: &ReduceConfig) -> Result<StepOutcome> {
        const ACTION: &str = "Reduce";
        let document_id = context.document_id(ACTION)?;
        let source = context.task.source();

        let response = self.client.call(
            |attempt| {
                self.events
                    .emit(|o| o.operation_started(context.worker, source, attempt))
            },
            |api| api.reduce(document_id, config),
        )?;

        let file = source.display().to_string();
        let warnings = response
            .warnings
            .iter()
            .map(|warning| messages::warning_message(&file, warning))
            .collect();
        let flags = ReductionFlags {
            content_removed: response.content_removed,
            version_changed: response.version_changed,
            linearized: config.fast_web_view,
        };

        // Only the status decides failure; reduce error info refines the message
        let reduce_error = response
            .reduce_error
            .as_ref()
            .filter(|info| info.error_code != ReduceErrorCode::Ok);
        let fatal = response.status.failure().map(|error| match reduce_error {
            Some(info) => Error::Reduce(info.clone()),
            None => Error::Remote {
                action: ACTION,
                error: error.clone(),
            },
        });

        let (fatal, remaining_tokens) = match fatal {
            Some(error) => (Some(error), None),
            None => match response.status.remaining_tokens {
                Some(tokens) => (None, Some(tokens)),
                None => (Some(Error::InvalidResponse { action: ACTION }), None),
            },
        };

        Ok(StepOutcome {
            warnings,
            flags,
            fatal,
            remaining_tokens,
            ..Default::default()
        })
    }

    fn ocr(&self, context: &StepContext<'_>, config: &OcrConfig) -> Result<StepOutcome> {
        const ACTION: &str = "OCR";
        let document_id = context.document_id(ACTION)?;
        let source = context.task.source();

        let info = self.client.call(
            |attempt| {
                self.events
                    .emit(|o| o.operation_started(context.worker, source, attempt))
            },
            |api| api.get_info(document_id),
        )?;
        info.status.check("GetInfo")?;
        let page_count = info
            .page_count
            .filter(|&count| count > 0)
            .ok_or(Error::InvalidResponse { action: "GetInfo" })?;

        let ranges = ocr_page_ranges(page_count, self.ocr_page_chunk_length);
        let whole_document = ranges.len() == 1;
        let mut outcome = StepOutcome::default();

        for (index, range) in ranges.iter().enumerate() {
            if index > 0 && (context.is_cancelled)() {
                tracing::debug!(
                    "[worker {}] OCR of {} cancelled before pages {}",
                    context.worker,
                    source.display(),
                    range
                );
                outcome.cancelled = true;
                break;
            }

            let response = self.client.call(
                |attempt| {
                    self.events.emit(|o| {
                        o.chunk_progress(context.worker, source, range, page_count, attempt)
                    })
                },
                |api| api.ocr(document_id, config, (!whole_document).then_some(range)),
            )?;
            response.status.check(ACTION)?;
            outcome.remaining_tokens = Some(remaining_tokens(&response.status, ACTION)?);
        }

        Ok(outcome)
    }

    /// Plain save when `image_config` is `None`
    fn save(
        &self,
        context: &StepContext<'_>,
        image_config: Option<&ImageToPdfConfig>,
    ) -> Result<StepOutcome> {
        let action = if image_config.is_some() {
            "SaveImageAsPDF"
        } else {
            "Save"
        };
        let document_id = context.document_id(action)?;
        let source = context.task.source();

        let response = self.client.call(
            |attempt| {
                self.events
                    .emit(|o| o.download_started(context.worker, source, attempt))
            },
            |api| match image_config {
                Some(config) => api.save_image_as_pdf(document_id, config),
                None => api.save_document(document_id),
            },
        )?;

        response.status.check(action)?;
        let artifact = response
            .decode_data()?
            .ok_or(Error::InvalidResponse { action })?;

        Ok(StepOutcome {
            artifact: Some(artifact),
            remaining_tokens: Some(remaining_tokens(&response.status, action)?),
            flags: ReductionFlags {
                linearized: image_config.is_some_and(|config| config.fast_web_view),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}
