//! Push-preferred, poll-fallback completion channel.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::{StatusSource, TerminalResult};
use crate::config::CompletionConfig;
use crate::error::ChannelError;

/// One logical channel delivering a single terminal result for a session.
///
/// The caller sees the same channel whether push or polling produced the
/// result. Dropping or closing the channel cancels the background task.
pub struct CompletionChannel {
    session_id: String,
    results: ReceiverStream<TerminalResult>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    closed: bool,
}

impl CompletionChannel {
    /// Start resolving `session_id` in the background.
    pub fn open(
        source: Arc<dyn StatusSource>,
        session_id: impl Into<String>,
        config: CompletionConfig,
    ) -> Self {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::channel(1);
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let task_session = session_id.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = cancel_rx => {
                    debug!(session_id = %task_session, "Completion channel cancelled");
                }
                result = resolve(source.as_ref(), &task_session, config) => {
                    info!(session_id = %task_session, result = ?result, "Completion channel resolved");
                    let _ = tx.send(result).await;
                }
            }
        });

        Self {
            session_id,
            results: ReceiverStream::new(rx),
            cancel: Some(cancel_tx),
            task,
            closed: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Wait for the terminal result. `None` once delivered or after `close`.
    pub async fn recv(&mut self) -> Option<TerminalResult> {
        if self.closed {
            return None;
        }
        self.results.next().await
    }

    /// Stop listening. No further results are delivered.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.results.close();
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Stream for CompletionChannel {
    type Item = TerminalResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.closed {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.results).poll_next(cx)
    }
}

/// Resolve a session: push first, then polling.
async fn resolve(source: &dyn StatusSource, session_id: &str, config: CompletionConfig) -> TerminalResult {
    match listen(source, session_id).await {
        Ok(result) => return result,
        Err(e) => {
            warn!(session_id, error = %e, "Push channel failed, falling back to polling");
        }
    }
    poll_until_terminal(source, session_id, config).await
}

/// Listen on the push subscription until a terminal event arrives.
///
/// The subscription is dropped on return, which unsubscribes it.
async fn listen(source: &dyn StatusSource, session_id: &str) -> Result<TerminalResult, ChannelError> {
    let mut stream = source.subscribe(session_id).await?;
    while let Some(item) = stream.next().await {
        let payload = item?;
        match payload.terminal() {
            Some(result) => return Ok(result),
            None => debug!(session_id, status = %payload.status, "Ignoring non-terminal push event"),
        }
    }
    Err(ChannelError::Stream {
        url: session_id.to_string(),
        reason: "stream ended without a terminal event".to_string(),
    })
}

async fn poll_until_terminal(
    source: &dyn StatusSource,
    session_id: &str,
    config: CompletionConfig,
) -> TerminalResult {
    let started = Instant::now();

    for attempt in 1..=config.max_poll_attempts {
        tokio::time::sleep(config.poll_interval).await;

        match source.poll(session_id).await {
            Ok(payload) => match payload.terminal() {
                Some(result) => return result,
                None => debug!(session_id, attempt, status = %payload.status, "Still processing"),
            },
            Err(e) => warn!(session_id, attempt, error = %e, "Status poll failed"),
        }
    }

    warn!(
        session_id,
        attempts = config.max_poll_attempts,
        elapsed = ?started.elapsed(),
        "Giving up on completion status"
    );
    TerminalResult::TimedOut {
        attempts: config.max_poll_attempts,
    }
}
