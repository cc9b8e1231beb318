//! Retrying wrapper around a `DocumentApi`

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

use super::api::{DocumentApi, InputKind};
use super::retry::RetryPolicy;

/// Limits the server advertises to clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLimits {
    /// At least 1
    pub max_client_threads: usize,
    pub suggested_client_timeout: Option<Duration>,
    pub max_allowed_content_length: Option<u64>,
}

/// Every remote call of a run goes through this client.
///
/// Cheap to clone; clones share the underlying API instance.
#[derive(Clone)]
pub struct RemoteOperationClient {
    api: Arc<dyn DocumentApi>,
    retry: RetryPolicy,
}

impl RemoteOperationClient {
    pub fn new(api: Arc<dyn DocumentApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run one remote call under the retry policy.
    ///
    /// Embedded error codes in a successful response are not retried here;
    /// callers inspect the returned response.
    pub fn call<T, A, F>(&self, on_attempt: A, mut operation: F) -> Result<T>
    where
        A: FnMut(u32),
        F: FnMut(&dyn DocumentApi) -> Result<T>,
    {
        let api = self.api.as_ref();
        self.retry.run(on_attempt, || operation(api))
    }

    /// Fetch thread, timeout and size limits
    pub fn service_limits(&self) -> Result<ServiceLimits> {
        let response = self.call(|_| {}, |api| api.service_limits())?;
        response.status.check("GetServiceLimits")?;

        Ok(ServiceLimits {
            max_client_threads: response.max_client_threads.unwrap_or(1).max(1) as usize,
            suggested_client_timeout: response
                .suggested_client_timeout_secs
                .map(Duration::from_secs),
            max_allowed_content_length: response.max_allowed_content_length,
        })
    }

    /// Upper-cased extensions the service accepts for `kind`
    pub fn supported_extensions(&self, kind: InputKind) -> Result<Vec<String>> {
        let response = self.call(|_| {}, |api| api.supported_extensions(kind))?;
        response.status.check("GetSupportedExtensions")?;
        if response.extensions.is_empty() {
            return Err(Error::InvalidResponse {
                action: "GetSupportedExtensions",
            });
        }
        Ok(response
            .extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_uppercase())
            .collect())
    }

    /// Close a remote document without waiting.
    ///
    /// Runs on a detached thread; the outcome is logged and discarded.
    pub fn close_document_detached(&self, document_id: String) {
        let api = Arc::clone(&self.api);
        let spawned = std::thread::Builder::new()
            .name("docbatch-close".to_string())
            .spawn(move || match api.close_document(&document_id) {
                Ok(response) => {
                    if let Some(error) = response.status.failure() {
                        tracing::debug!(
                            "Close of {} reported {:?}",
                            document_id,
                            error.result_code
                        );
                    }
                }
                Err(e) => tracing::debug!("Close of {} failed: {}", document_id, e),
            });

        if let Err(e) = spawned {
            tracing::debug!("Could not spawn close thread: {}", e);
        }
    }
}
