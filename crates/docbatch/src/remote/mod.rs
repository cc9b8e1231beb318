//! Remote document service access
//!
//! - `api`: wire types and the `DocumentApi` trait
//! - `http`: blocking reqwest implementation
//! - `client`: retrying wrapper shared by all workers
//! - `retry`: the retry policy itself
//! - `messages`: code to text lookups
//! - `spool`: gzip staging of uploads

pub mod api;
pub mod client;
pub mod http;
pub mod messages;
pub mod retry;
pub mod spool;

#[cfg(test)]
pub(crate) mod fake;

pub use api::{DocumentApi, InputKind, PageRange, UploadRequest};
pub use client::{RemoteOperationClient, ServiceLimits};
pub use http::HttpDocumentApi;
pub use retry::RetryPolicy;
