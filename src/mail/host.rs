//! Host mail-item capability surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::HostAccessError;

/// Attachment metadata as listed by the host, before content retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// Host-assigned attachment id.
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Read access to the mail item the add-in was opened on.
///
/// Every read is asynchronous and fallible; implementations wrap whatever
/// callback or blocking API the host offers.
#[async_trait]
pub trait MailHost: Send + Sync {
    async fn subject(&self) -> Result<String, HostAccessError>;

    async fn body_text(&self) -> Result<String, HostAccessError>;

    /// Sender email address, or display name when no address is known.
    async fn sender(&self) -> Result<String, HostAccessError>;

    async fn received_at(&self) -> Result<Option<DateTime<Utc>>, HostAccessError>;

    /// Address of the mailbox owner.
    async fn user_email(&self) -> Result<String, HostAccessError>;

    async fn item_id(&self) -> Result<String, HostAccessError>;

    async fn internet_message_id(&self) -> Result<String, HostAccessError>;

    async fn conversation_id(&self) -> Result<String, HostAccessError>;

    /// Attachments in host order.
    async fn attachments(&self) -> Result<Vec<AttachmentInfo>, HostAccessError>;

    /// Raw content of one attachment.
    async fn attachment_content(&self, id: &str) -> Result<Vec<u8>, HostAccessError>;
}
