//! Remote document service contract: wire types and the `DocumentApi` trait

use std::fmt;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ImageToPdfConfig, OcrConfig, ReduceConfig};

/// Result codes returned by the service.
///
/// Codes added server-side after this client was built land in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    #[serde(rename = "OK")]
    Ok,
    ActionTimedOut,
    EmptyParameter,
    #[serde(rename = "InvalidAPIKey")]
    InvalidApiKey,
    NotEnoughTokens,
    GenericError,
    InvalidParameter,
    OutOfMemory,
    NotImplemented,
    FileNotFound,
    AccessDenied,
    #[serde(rename = "CanNotImportFileToPDF")]
    CanNotImportFileToPdf,
    PdfCanNotBeDecrypted,
    PdfOperationNotAllowed,
    PdfCanNotOpenFile,
    PdfCanNotSaveFile,
    CanNotCreateFile,
    NoDocumentProvided,
    CanNotRemovePage,
    CanNotSwapPages,
    InvalidPageRange,
    #[serde(rename = "CanNotReducePDF")]
    CanNotReducePdf,
    CanNotExportMoreThan2GigabyteFile,
    #[serde(other)]
    Unknown,
}

/// Structured error embedded in an HTTP-success response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub result_code: ResultCode,
    #[serde(default)]
    pub ext_result_message: Option<String>,
    #[serde(default)]
    pub ext_result_status: Option<String>,
    #[serde(default)]
    pub internal_error_id: Option<String>,
}

impl ApiError {
    /// An error block with code `OK` means success
    pub fn is_failure(&self) -> bool {
        self.result_code != ResultCode::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceErrorCode {
    #[serde(rename = "OK")]
    Ok,
    GetPageImagesCount,
    #[serde(rename = "MRCPostOperationsFailure")]
    MrcPostOperationsFailure,
    PageConversionFailure,
    DocumentEncrypted,
    UnexpectedError,
    #[serde(other)]
    Unknown,
}

/// Reduce-specific error with page context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceErrorInfo {
    pub error_code: ReduceErrorCode,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub ext_error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningCode {
    ImageExtractionFailure,
    ColorDetectionFailure,
    ImageResizeFailure,
    ImageCropFailure,
    ImageResolutionObtentionFailure,
    ImageReplacementFailure,
    #[serde(rename = "MRCImageReplacementFailure")]
    MrcImageReplacementFailure,
    PageSelectionFailure,
    ImageObtentionFailure,
    FileSizeReductionFailure,
    BlankPageRemovalFailure,
    #[serde(other)]
    Unknown,
}

/// Non-fatal per-page warning from a reduce call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceWarning {
    pub code: WarningCode,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_image: Option<u32>,
    #[serde(default)]
    pub ext_warning_message: Option<String>,
}

/// Fields carried by every response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    #[serde(default)]
    pub error: Option<ApiError>,
    #[serde(default)]
    pub remaining_tokens: Option<i64>,
}

impl ResponseStatus {
    pub fn ok(remaining_tokens: i64) -> Self {
        Self {
            error: None,
            remaining_tokens: Some(remaining_tokens),
        }
    }

    pub fn failed(result_code: ResultCode) -> Self {
        Self {
            error: Some(ApiError {
                result_code,
                ext_result_message: None,
                ext_result_status: None,
                internal_error_id: None,
            }),
            remaining_tokens: None,
        }
    }

    /// The embedded error, when it denotes a failure
    pub fn failure(&self) -> Option<&ApiError> {
        self.error.as_ref().filter(|error| error.is_failure())
    }

    /// Fail with `Error::Remote` if the response carries a failure
    pub fn check(&self, action: &'static str) -> Result<()> {
        match self.failure() {
            Some(error) => Err(Error::Remote {
                action,
                error: error.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub content_removed: bool,
    #[serde(default)]
    pub version_changed: bool,
    #[serde(default)]
    pub warnings: Vec<ReduceWarning>,
    #[serde(default)]
    pub reduce_error: Option<ReduceErrorInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub page_count: Option<u32>,
}

/// Response of actions with no payload (OCR, close)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    /// Base64-encoded artifact
    #[serde(default)]
    pub data: Option<String>,
}

impl SaveResponse {
    /// Decode the artifact bytes, `None` when the payload is missing
    pub fn decode_data(&self) -> Result<Option<Vec<u8>>> {
        match &self.data {
            Some(data) => base64::engine::general_purpose::STANDARD
                .decode(data)
                .map(Some)
                .map_err(|e| Error::internal(format!("invalid artifact encoding: {}", e))),
            None => Ok(None),
        }
    }
}

/// Server-advertised limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLimitsResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub max_client_threads: Option<u32>,
    #[serde(default)]
    pub suggested_client_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_allowed_content_length: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionsResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Which family of input the service should list extensions for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Pdf,
    Image,
}

impl InputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InputKind::Pdf => "pdf",
            InputKind::Image => "image",
        }
    }
}

/// Inclusive 1-based page range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

impl PageRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub fn page_count(&self) -> u32 {
        self.last + 1 - self.first
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

/// A gzip-spooled upload
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub file_name: &'a str,
    /// Gzip-compressed content on disk
    pub content: &'a Path,
    /// Target conformance, documents only
    pub conformance: Option<&'a str>,
    /// Decryption password, documents only
    pub password: Option<&'a str>,
}

/// Typed access to the remote document service.
///
/// Implementations must be safe for concurrent callers; one instance is shared
/// by every worker of a run.
pub trait DocumentApi: Send + Sync {
    fn load_document(&self, request: &UploadRequest<'_>) -> Result<LoadResponse>;

    fn load_image(&self, request: &UploadRequest<'_>) -> Result<LoadResponse>;

    fn reduce(&self, document_id: &str, config: &ReduceConfig) -> Result<ReduceResponse>;

    fn get_info(&self, document_id: &str) -> Result<InfoResponse>;

    /// OCR the given pages, or the whole document when `pages` is `None`
    fn ocr(
        &self,
        document_id: &str,
        config: &OcrConfig,
        pages: Option<&PageRange>,
    ) -> Result<ActionResponse>;

    fn save_document(&self, document_id: &str) -> Result<SaveResponse>;

    fn save_image_as_pdf(
        &self,
        document_id: &str,
        config: &ImageToPdfConfig,
    ) -> Result<SaveResponse>;

    fn close_document(&self, document_id: &str) -> Result<ActionResponse>;

    fn service_limits(&self) -> Result<ServiceLimitsResponse>;

    fn supported_extensions(&self, kind: InputKind) -> Result<ExtensionsResponse>;
}
