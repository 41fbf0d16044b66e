//! Request and response bodies of the workflow backend.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::intake::FieldSet;
use crate::mail::{AttachmentRef, EmailMetadata};

/// Multipart `/extract` payload: primary document, extras, and metadata.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub filename: String,
    pub content: Vec<u8>,
    /// Extra attachments as `(name, bytes)`.
    pub extras: Vec<(String, Vec<u8>)>,
    pub metadata: EmailMetadata,
}

/// `/extract` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractAck {
    pub session_id: String,
}

/// `/process` body: confirm an existing extraction session.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest {
    pub session_id: String,
    pub email_fields: FieldSet,
    /// Rendered form document, base64.
    pub form_pdf: String,
}

/// `/submit` body: full submission when no session exists.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub filename: String,
    pub attachment_base64: String,
    pub email_metadata: EmailMetadata,
    pub email_fields: FieldSet,
    pub extra_attachments: Vec<ExtraAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraAttachment {
    pub name: String,
    #[serde(rename = "contentBytes")]
    pub content_bytes: String,
}

impl ExtraAttachment {
    /// `None` for attachments whose content was never retrieved.
    pub fn from_attachment(att: &AttachmentRef) -> Option<Self> {
        att.bytes.as_ref().map(|bytes| Self {
            name: att.name.clone(),
            content_bytes: encode(bytes),
        })
    }
}

/// Raw response of a submission endpoint. Classification happens elsewhere.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub endpoint: String,
    pub status: u16,
    /// Parsed body, `None` when the body was not JSON.
    pub body: Option<serde_json::Value>,
    pub raw: String,
}

impl BackendResponse {
    /// Build a response from a status and raw body text.
    pub fn new(endpoint: impl Into<String>, status: u16, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            endpoint: endpoint.into(),
            status,
            body: serde_json::from_str(&raw).ok(),
            raw,
        }
    }

    /// Build a response from a JSON value.
    pub fn json(endpoint: impl Into<String>, status: u16, body: serde_json::Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            status,
            raw: body.to_string(),
            body: Some(body),
        }
    }
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
