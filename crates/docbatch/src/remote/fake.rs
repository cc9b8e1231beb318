//! Scripted in-memory `DocumentApi` for tests

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::time::Duration;

use base64::Engine;
use flate2::read::GzDecoder;
use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::types::{ImageToPdfConfig, OcrConfig, ReduceConfig};

use super::api::{
    ActionResponse, DocumentApi, ExtensionsResponse, InfoResponse, InputKind, LoadResponse,
    PageRange, ReduceResponse, ResponseStatus, ResultCode, SaveResponse, ServiceLimitsResponse,
    UploadRequest,
};

/// One recorded upload
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub conformance: Option<String>,
    pub password: Option<String>,
}

#[derive(Default)]
struct FakeState {
    calls: HashMap<&'static str, usize>,
    transport_failures: usize,
    uploads: Vec<RecordedUpload>,
    closed: Vec<String>,
    ocr_pages: Vec<Option<String>>,
    load_errors: HashMap<String, ResultCode>,
    next_id: u32,
    tokens: i64,
}

pub struct FakeDocumentApi {
    state: Mutex<FakeState>,
    closed_changed: Condvar,
    page_count: Option<u32>,
    reduce: ReduceResponse,
    artifact: Option<Vec<u8>>,
    omit_file_id: bool,
    limits: ServiceLimitsResponse,
    panic_on: HashSet<String>,
}

impl FakeDocumentApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                tokens: 1000,
                ..Default::default()
            }),
            closed_changed: Condvar::new(),
            page_count: Some(1),
            reduce: ReduceResponse::default(),
            artifact: Some(b"%PDF-1.5 produced".to_vec()),
            omit_file_id: false,
            limits: ServiceLimitsResponse::default(),
            panic_on: HashSet::new(),
        }
    }

    pub fn with_page_count(mut self, pages: Option<u32>) -> Self {
        self.page_count = pages;
        self
    }

    pub fn with_reduce(mut self, response: ReduceResponse) -> Self {
        self.reduce = response;
        self
    }

    pub fn with_artifact(mut self, artifact: Option<Vec<u8>>) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn without_file_id(mut self) -> Self {
        self.omit_file_id = true;
        self
    }

    pub fn with_limits(mut self, threads: u32, timeout: Option<u64>, content: Option<u64>) -> Self {
        self.limits.max_client_threads = Some(threads);
        self.limits.suggested_client_timeout_secs = timeout;
        self.limits.max_allowed_content_length = content;
        self
    }

    /// Loads of `file_name` report `code`
    pub fn with_load_error(self, file_name: &str, code: ResultCode) -> Self {
        self.state.lock().load_errors.insert(file_name.to_string(), code);
        self
    }

    /// Loads of `file_name` panic
    pub fn panicking_on(mut self, file_name: &str) -> Self {
        self.panic_on.insert(file_name.to_string());
        self
    }

    /// The next `count` calls fail at the transport level
    pub fn fail_next_calls(&self, count: usize) {
        self.state.lock().transport_failures = count;
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().uploads.clone()
    }

    pub fn ocr_pages(&self) -> Vec<Option<String>> {
        self.state.lock().ocr_pages.clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.state.lock().closed.clone()
    }

    /// Wait until `document_id` was closed by a detached cleanup thread
    pub fn wait_for_close(&self, document_id: &str, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        let result = self.closed_changed.wait_while_for(
            &mut state,
            |state| !state.closed.iter().any(|id| id == document_id),
            timeout,
        );
        !result.timed_out()
    }

    fn enter(&self, method: &'static str) -> Result<i64> {
        let mut state = self.state.lock();
        *state.calls.entry(method).or_default() += 1;
        if state.transport_failures > 0 {
            state.transport_failures -= 1;
            return Err(Error::HttpStatus {
                status: 502,
                message: format!("{} unavailable", method),
            });
        }
        state.tokens -= 1;
        Ok(state.tokens)
    }

    fn upload(&self, method: &'static str, request: &UploadRequest<'_>) -> Result<LoadResponse> {
        if self.panic_on.contains(request.file_name) {
            panic!("scripted panic for {}", request.file_name);
        }
        let tokens = self.enter(method)?;

        let mut content = Vec::new();
        GzDecoder::new(File::open(request.content)?).read_to_end(&mut content)?;

        let mut state = self.state.lock();
        state.uploads.push(RecordedUpload {
            file_name: request.file_name.to_string(),
            content,
            conformance: request.conformance.map(str::to_string),
            password: request.password.map(str::to_string),
        });
        if let Some(code) = state.load_errors.get(request.file_name) {
            return Ok(LoadResponse {
                status: ResponseStatus::failed(*code),
                file_id: None,
            });
        }
        state.next_id += 1;
        let file_id = format!("doc-{}", state.next_id);

        Ok(LoadResponse {
            status: ResponseStatus::ok(tokens),
            file_id: (!self.omit_file_id).then_some(file_id),
        })
    }

    fn save(&self, method: &'static str) -> Result<SaveResponse> {
        let tokens = self.enter(method)?;
        Ok(SaveResponse {
            status: ResponseStatus::ok(tokens),
            data: self
                .artifact
                .as_ref()
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
        })
    }
}

impl DocumentApi for FakeDocumentApi {
    fn load_document(&self, request: &UploadRequest<'_>) -> Result<LoadResponse> {
        self.upload("load_document", request)
    }

    fn load_image(&self, request: &UploadRequest<'_>) -> Result<LoadResponse> {
        self.upload("load_image", request)
    }

    fn reduce(&self, _document_id: &str, _config: &ReduceConfig) -> Result<ReduceResponse> {
        let tokens = self.enter("reduce")?;
        let mut response = self.reduce.clone();
        if response.status.error.is_none() {
            response.status.remaining_tokens = Some(tokens);
        }
        Ok(response)
    }

    fn get_info(&self, _document_id: &str) -> Result<InfoResponse> {
        let tokens = self.enter("get_info")?;
        Ok(InfoResponse {
            status: ResponseStatus::ok(tokens),
            page_count: self.page_count,
        })
    }

    fn ocr(
        &self,
        _document_id: &str,
        _config: &OcrConfig,
        pages: Option<&PageRange>,
    ) -> Result<ActionResponse> {
        let tokens = self.enter("ocr")?;
        self.state.lock().ocr_pages.push(pages.map(|p| p.to_string()));
        Ok(ActionResponse {
            status: ResponseStatus::ok(tokens),
        })
    }

    fn save_document(&self, _document_id: &str) -> Result<SaveResponse> {
        self.save("save_document")
    }

    fn save_image_as_pdf(
        &self,
        _document_id: &str,
        _config: &ImageToPdfConfig,
    ) -> Result<SaveResponse> {
        self.save("save_image_as_pdf")
    }

    fn close_document(&self, document_id: &str) -> Result<ActionResponse> {
        let mut state = self.state.lock();
        *state.calls.entry("close_document").or_default() += 1;
        state.closed.push(document_id.to_string());
        self.closed_changed.notify_all();
        Ok(ActionResponse::default())
    }

    fn service_limits(&self) -> Result<ServiceLimitsResponse> {
        let tokens = self.enter("service_limits")?;
        let mut response = self.limits.clone();
        response.status = ResponseStatus::ok(tokens);
        Ok(response)
    }

    fn supported_extensions(&self, kind: InputKind) -> Result<ExtensionsResponse> {
        let tokens = self.enter("supported_extensions")?;
        let extensions = match kind {
            InputKind::Pdf => vec![".pdf".to_string()],
            InputKind::Image => vec!["tif".to_string(), "png".to_string(), "jpg".to_string()],
        };
        Ok(ExtensionsResponse {
            status: ResponseStatus::ok(tokens),
            extensions,
        })
    }
}
