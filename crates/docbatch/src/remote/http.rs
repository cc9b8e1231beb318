//! Blocking HTTP implementation of `DocumentApi`

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{ImageToPdfConfig, OcrConfig, ReduceConfig};

use super::api::{
    ActionResponse, DocumentApi, ExtensionsResponse, InfoResponse, InputKind, LoadResponse,
    PageRange, ReduceResponse, SaveResponse, ServiceLimitsResponse, UploadRequest,
};

#[derive(Serialize)]
struct OcrRequest<'a> {
    config: &'a OcrConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<String>,
}

/// Document service client over HTTPS.
///
/// `reqwest::blocking::Client` pools connections internally and is shared by
/// all workers.
pub struct HttpDocumentApi {
    client: Client,
    base_url: String,
    api_key_header: String,
    api_key: String,
}

impl HttpDocumentApi {
    /// Create a client with the configured per-call timeout
    pub fn new(config: &ApiConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(config, api_key, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(
        config: &ApiConfig,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_header: config.api_key_header.clone(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(self.api_key_header.as_str(), self.api_key.as_str())
    }

    fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.authorized(self.client.get(self.url(path))).send()?;
        Self::read(response)
    }

    fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .authorized(self.client.post(self.url(path)))
            .json(body)
            .send()?;
        Self::read(response)
    }

    fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.authorized(self.client.post(self.url(path))).send()?;
        Self::read(response)
    }

    fn upload(&self, path: &str, request: &UploadRequest<'_>) -> Result<LoadResponse> {
        let content = Part::file(request.content)?
            .file_name(request.file_name.to_string())
            .mime_str("application/gzip")?;

        let mut form = Form::new()
            .text("file_name", request.file_name.to_string())
            .text("content_encoding", "gzip")
            .part("file", content);
        if let Some(conformance) = request.conformance {
            form = form.text("conformance", conformance.to_string());
        }
        if let Some(password) = request.password {
            form = form.text("password", password.to_string());
        }

        let response = self
            .authorized(self.client.post(self.url(path)))
            .multipart(form)
            .send()?;
        Self::read(response)
    }

    fn read<R: DeserializeOwned>(response: Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response.json()?)
    }
}

impl DocumentApi for HttpDocumentApi {
    fn load_document(&self, request: &UploadRequest<'_>) -> Result<LoadResponse> {
        self.upload("/api/documents", request)
    }

    fn load_image(&self, request: &UploadRequest<'_>) -> Result<LoadResponse> {
        self.upload("/api/images", request)
    }

    fn reduce(&self, document_id: &str, config: &ReduceConfig) -> Result<ReduceResponse> {
        self.post_json(&format!("/api/documents/{}/reduce", document_id), config)
    }

    fn get_info(&self, document_id: &str) -> Result<InfoResponse> {
        self.get(&format!("/api/documents/{}/info", document_id))
    }

    fn ocr(
        &self,
        document_id: &str,
        config: &OcrConfig,
        pages: Option<&PageRange>,
    ) -> Result<ActionResponse> {
        let body = OcrRequest {
            config,
            pages: pages.map(|range| range.to_string()),
        };
        self.post_json(&format!("/api/documents/{}/ocr", document_id), &body)
    }

    fn save_document(&self, document_id: &str) -> Result<SaveResponse> {
        self.post_empty(&format!("/api/documents/{}/save", document_id))
    }

    fn save_image_as_pdf(
        &self,
        document_id: &str,
        config: &ImageToPdfConfig,
    ) -> Result<SaveResponse> {
        self.post_json(&format!("/api/images/{}/save-as-pdf", document_id), config)
    }

    fn close_document(&self, document_id: &str) -> Result<ActionResponse> {
        self.post_empty(&format!("/api/documents/{}/close", document_id))
    }

    fn service_limits(&self) -> Result<ServiceLimitsResponse> {
        self.get("/api/admin/limits")
    }

    fn supported_extensions(&self, kind: InputKind) -> Result<ExtensionsResponse> {
        self.get(&format!("/api/admin/extensions/{}", kind.as_str()))
    }
}
