//! `MailHost` backed by an RFC 5322 message file.
//!
//! Lets the CLI run the intake flow against a saved `.eml` instead of a
//! live mail client.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};

use super::host::{AttachmentInfo, MailHost};
use crate::error::HostAccessError;

#[derive(Debug, Clone)]
struct ParsedAttachment {
    info: AttachmentInfo,
    bytes: Vec<u8>,
}

/// A mail item parsed from raw message bytes.
#[derive(Debug, Clone)]
pub struct EmlMailItem {
    subject: Option<String>,
    body: Option<String>,
    sender: Option<String>,
    received_at: Option<DateTime<Utc>>,
    message_id: Option<String>,
    user_email: String,
    attachments: Vec<ParsedAttachment>,
}

impl EmlMailItem {
    /// Parse a message. `user_email` stands in for the mailbox owner.
    pub fn parse(raw: &[u8], user_email: impl Into<String>) -> Result<Self, HostAccessError> {
        let parsed = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| HostAccessError::Parse("not an RFC 5322 message".into()))?;

        let sender = parsed.from().and_then(|addr| addr.first()).and_then(|a| {
            a.address()
                .or_else(|| a.name())
                .map(|s| s.to_string())
        });

        let body = parsed
            .body_text(0)
            .map(|t| t.to_string())
            .or_else(|| parsed.body_html(0).map(|h| strip_tags(h.as_ref())));

        let received_at = parsed.date().and_then(|d| {
            chrono::NaiveDate::from_ymd_opt(d.year as i32, u32::from(d.month), u32::from(d.day))
                .and_then(|date| {
                    date.and_hms_opt(u32::from(d.hour), u32::from(d.minute), u32::from(d.second))
                })
                .map(|naive| {
                    let offset_secs = i64::from(d.tz_hour) * 3600 + i64::from(d.tz_minute) * 60;
                    let offset_secs = if d.tz_before_gmt { offset_secs } else { -offset_secs };
                    naive.and_utc() + chrono::Duration::seconds(offset_secs)
                })
        });

        let attachments = parsed
            .attachments()
            .enumerate()
            .map(|(idx, part)| {
                let name = MimeHeaders::attachment_name(part)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("attachment-{}", idx + 1));
                let content_type = MimeHeaders::content_type(part)
                    .map(|ct| match ct.subtype() {
                        Some(sub) => format!("{}/{}", ct.ctype(), sub),
                        None => ct.ctype().to_string(),
                    })
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = part.contents().to_vec();
                ParsedAttachment {
                    info: AttachmentInfo {
                        id: format!("att-{idx}"),
                        name,
                        content_type,
                        size_bytes: bytes.len() as u64,
                    },
                    bytes,
                }
            })
            .collect();

        Ok(Self {
            subject: parsed.subject().map(|s| s.to_string()),
            body,
            sender,
            received_at,
            message_id: parsed.message_id().map(|s| s.to_string()),
            user_email: user_email.into(),
            attachments,
        })
    }

    /// Read and parse a message file.
    pub async fn open(path: &Path, user_email: impl Into<String>) -> Result<Self, HostAccessError> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            HostAccessError::Parse(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&raw, user_email)
    }
}

fn missing(field: &str) -> HostAccessError {
    HostAccessError::FieldUnavailable {
        field: field.to_string(),
        reason: "header not present".to_string(),
    }
}

/// Drop HTML tags and collapse whitespace.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl MailHost for EmlMailItem {
    async fn subject(&self) -> Result<String, HostAccessError> {
        self.subject.clone().ok_or_else(|| missing("subject"))
    }

    async fn body_text(&self) -> Result<String, HostAccessError> {
        self.body.clone().ok_or_else(|| missing("body"))
    }

    async fn sender(&self) -> Result<String, HostAccessError> {
        self.sender.clone().ok_or_else(|| missing("from"))
    }

    async fn received_at(&self) -> Result<Option<DateTime<Utc>>, HostAccessError> {
        Ok(self.received_at)
    }

    async fn user_email(&self) -> Result<String, HostAccessError> {
        Ok(self.user_email.clone())
    }

    async fn item_id(&self) -> Result<String, HostAccessError> {
        // A file has no host item id; the Message-ID is the closest stable key.
        self.message_id.clone().ok_or_else(|| missing("message-id"))
    }

    async fn internet_message_id(&self) -> Result<String, HostAccessError> {
        self.message_id.clone().ok_or_else(|| missing("message-id"))
    }

    async fn conversation_id(&self) -> Result<String, HostAccessError> {
        Ok(String::new())
    }

    async fn attachments(&self) -> Result<Vec<AttachmentInfo>, HostAccessError> {
        Ok(self.attachments.iter().map(|a| a.info.clone()).collect())
    }

    async fn attachment_content(&self, id: &str) -> Result<Vec<u8>, HostAccessError> {
        self.attachments
            .iter()
            .find(|a| a.info.id == id)
            .map(|a| a.bytes.clone())
            .ok_or_else(|| HostAccessError::AttachmentUnavailable {
                name: id.to_string(),
                reason: "no such attachment".to_string(),
            })
    }
}
