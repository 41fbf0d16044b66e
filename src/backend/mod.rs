//! Workflow backend: wire types and the HTTP client.

pub mod http;
pub mod wire;

pub use http::HttpBackend;
pub use wire::{
    BackendResponse, ExtractAck, ExtractRequest, ExtraAttachment, ProcessRequest, SubmitRequest,
};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::intake::WorkflowKind;

/// Submission endpoints of a workflow backend.
///
/// `process` and `submit` return the raw response for any HTTP status; only
/// a failure to complete the exchange is an error. `extract` is used for
/// background pre-extraction and resolves straight to the session id.
#[async_trait]
pub trait IntakeBackend: Send + Sync {
    async fn extract(
        &self,
        workflow: WorkflowKind,
        request: &ExtractRequest,
    ) -> Result<ExtractAck, TransportError>;

    async fn process(
        &self,
        workflow: WorkflowKind,
        request: &ProcessRequest,
    ) -> Result<BackendResponse, TransportError>;

    async fn submit(
        &self,
        workflow: WorkflowKind,
        request: &SubmitRequest,
    ) -> Result<BackendResponse, TransportError>;
}
