//! Email snapshot capture.
//!
//! A snapshot is taken once per activation. Every host read may fail; a
//! failed field degrades to a placeholder and a failed attachment records
//! its error, so capture itself never fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::host::{AttachmentInfo, MailHost};
use crate::error::HostAccessError;

pub const SUBJECT_UNAVAILABLE: &str = "Subject unavailable";
pub const BODY_UNAVAILABLE: &str = "Body unavailable";
pub const UNKNOWN_SENDER: &str = "Unknown";

/// One attachment of the captured email.
///
/// `bytes` is `None` exactly when retrieval failed, in which case `error`
/// holds the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub bytes: Option<Vec<u8>>,
    pub error: Option<String>,
}

impl AttachmentRef {
    /// An attachment whose content was retrieved.
    pub fn with_bytes(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            size_bytes: bytes.len() as u64,
            name,
            content_type: content_type.into(),
            bytes: Some(bytes),
            error: None,
        }
    }

    /// An attachment whose content could not be retrieved.
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            content_type: String::new(),
            size_bytes: 0,
            bytes: None,
            error: Some(error.into()),
        }
    }

    fn from_result(info: AttachmentInfo, content: Result<Vec<u8>, HostAccessError>) -> Self {
        match content {
            Ok(bytes) => Self {
                id: info.id,
                name: info.name,
                content_type: info.content_type,
                size_bytes: info.size_bytes,
                bytes: Some(bytes),
                error: None,
            },
            Err(e) => Self {
                id: info.id,
                name: info.name,
                content_type: info.content_type,
                size_bytes: info.size_bytes,
                bytes: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Normalized, immutable view of the current email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSnapshot {
    pub subject: String,
    pub sender: String,
    /// Host-reported receive time, if the host exposed one.
    pub received_at: Option<DateTime<Utc>>,
    /// When this snapshot was taken.
    pub captured_at: DateTime<Utc>,
    pub body: String,
    pub user_email: String,
    pub item_id: String,
    pub internet_message_id: String,
    pub conversation_id: String,
    pub attachments: Vec<AttachmentRef>,
}

impl EmailSnapshot {
    /// Receive time, falling back to the capture time.
    pub fn effective_received_at(&self) -> DateTime<Utc> {
        self.received_at.unwrap_or(self.captured_at)
    }

    /// Wire metadata describing this email.
    pub fn metadata(&self) -> EmailMetadata {
        EmailMetadata {
            subject: self.subject.clone(),
            from: self.sender.clone(),
            received_date_time: self.effective_received_at().to_rfc3339(),
            body: self.body.clone(),
            user_email: self.user_email.clone(),
            triggered_at: self.captured_at.to_rfc3339(),
            id: self.item_id.clone(),
            item_id: self.item_id.clone(),
            internet_message_id: self.internet_message_id.clone(),
            conversation_id: self.conversation_id.clone(),
        }
    }
}

/// `email_metadata` as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMetadata {
    pub subject: String,
    pub from: String,
    pub received_date_time: String,
    pub body: String,
    pub user_email: String,
    pub triggered_at: String,
    pub id: String,
    pub item_id: String,
    pub internet_message_id: String,
    pub conversation_id: String,
}

/// Capture a snapshot of the host's current mail item.
pub async fn capture(host: &dyn MailHost) -> EmailSnapshot {
    let captured_at = Utc::now();

    let subject = degrade("subject", host.subject().await, SUBJECT_UNAVAILABLE.to_string());
    let body = degrade("body", host.body_text().await, BODY_UNAVAILABLE.to_string());
    let sender = degrade("sender", host.sender().await, UNKNOWN_SENDER.to_string());
    let received_at = degrade("received_at", host.received_at().await, None);
    let user_email = degrade("user_email", host.user_email().await, String::new());
    let item_id = degrade("item_id", host.item_id().await, String::new());
    let internet_message_id = degrade(
        "internet_message_id",
        host.internet_message_id().await,
        String::new(),
    );
    let conversation_id = degrade("conversation_id", host.conversation_id().await, String::new());

    let listed = degrade("attachments", host.attachments().await, Vec::new());
    let mut attachments = Vec::with_capacity(listed.len());
    for info in listed {
        let content = host.attachment_content(&info.id).await;
        match &content {
            Ok(bytes) => debug!(name = %info.name, size = bytes.len(), "Retrieved attachment"),
            Err(e) => warn!(name = %info.name, error = %e, "Failed to retrieve attachment"),
        }
        attachments.push(AttachmentRef::from_result(info, content));
    }

    EmailSnapshot {
        subject,
        sender,
        received_at,
        captured_at,
        body,
        user_email,
        item_id,
        internet_message_id,
        conversation_id,
        attachments,
    }
}

fn degrade<T>(field: &str, result: Result<T, HostAccessError>, placeholder: T) -> T {
    result.unwrap_or_else(|e| {
        warn!(field, error = %e, "Host read failed, using placeholder");
        placeholder
    })
}
