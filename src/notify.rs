//! Host notifications.
//!
//! The host shows notices keyed by id. [`NoticeBoard`] keeps at most one of
//! ours visible: every previously shown key is removed before a new notice
//! is added.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::HostAccessError;

/// Notice key for in-flight work.
pub const PROGRESS_KEY: &str = "progress";
/// Notice key for a completed submission.
pub const COMPLETE_KEY: &str = "processComplete";
/// Notice key for a failed submission.
pub const ERROR_KEY: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Progress,
    Informational,
    Error,
}

/// A native notification shown by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    /// Stays visible until removed.
    pub persistent: bool,
}

impl Notice {
    pub fn progress(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Progress,
            message: message.into(),
            persistent: false,
        }
    }

    pub fn informational(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Informational,
            message: message.into(),
            persistent: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            persistent: false,
        }
    }
}

/// Host notification surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn add(&self, key: &str, notice: &Notice) -> Result<(), HostAccessError>;

    async fn remove(&self, key: &str) -> Result<(), HostAccessError>;
}

/// Tracks which notices are visible and replaces them one at a time.
pub struct NoticeBoard {
    notifier: Arc<dyn Notifier>,
    shown: Mutex<Vec<String>>,
}

impl NoticeBoard {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Remove every notice shown so far, then show `notice` under `key`.
    pub async fn show(&self, key: &str, notice: Notice) {
        let mut shown = self.shown.lock().await;
        self.remove_all(&mut shown).await;
        match self.notifier.add(key, &notice).await {
            Ok(()) => shown.push(key.to_string()),
            Err(e) => warn!(key, error = %e, "Failed to add notice"),
        }
    }

    /// Keys whose removal fails stay tracked and are retried next time.
    async fn remove_all(&self, shown: &mut Vec<String>) {
        let mut kept = Vec::new();
        for old in shown.drain(..) {
            if let Err(e) = self.notifier.remove(&old).await {
                warn!(key = %old, error = %e, "Failed to remove notice");
                kept.push(old);
            }
        }
        *shown = kept;
    }

    /// Keys currently believed visible.
    #[cfg(test)]
    pub(crate) async fn visible(&self) -> Vec<String> {
        self.shown.lock().await.clone()
    }
}

/// Notifier for headless runs: notices go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn add(&self, key: &str, notice: &Notice) -> Result<(), HostAccessError> {
        match notice.kind {
            NoticeKind::Error => error!(key, message = %notice.message, "Notice"),
            _ => info!(key, kind = ?notice.kind, message = %notice.message, "Notice"),
        }
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<(), HostAccessError> {
        Ok(())
    }
}
