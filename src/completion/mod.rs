//! Completion notification for asynchronous backend processing.
//!
//! A [`CompletionChannel`] resolves one backend session to exactly one
//! [`TerminalResult`]. It listens on the push (SSE) endpoint first and
//! falls back to polling the status endpoint when push fails.

pub mod channel;
pub mod sse;

pub use channel::CompletionChannel;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Stream of status payloads from a push subscription.
pub type StatusStream = BoxStream<'static, Result<StatusPayload, ChannelError>>;

/// Status document delivered by both the stream and the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusPayload {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }

    /// Parse an event or response body.
    pub fn parse(raw: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(raw).map_err(|e| ChannelError::InvalidPayload(e.to_string()))
    }

    /// The terminal result this payload represents, if any.
    pub fn terminal(&self) -> Option<TerminalResult> {
        match self.status.as_str() {
            "done" => Some(TerminalResult::Done),
            "error" => Some(TerminalResult::Error {
                message: self
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }),
            _ => None,
        }
    }
}

/// Final outcome of an asynchronous backend operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalResult {
    Done,
    /// Backend reported failure.
    Error { message: String },
    /// Polling gave up without seeing a terminal status.
    TimedOut { attempts: u32 },
}

/// Push and pull access to a backend session's status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Open the push subscription for a session.
    async fn subscribe(&self, session_id: &str) -> Result<StatusStream, ChannelError>;

    /// Fetch the current status once.
    async fn poll(&self, session_id: &str) -> Result<StatusPayload, ChannelError>;
}
