//! Scripted collaborators shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;

use crate::backend::{
    BackendResponse, ExtractAck, ExtractRequest, IntakeBackend, ProcessRequest, SubmitRequest,
};
use crate::completion::{StatusPayload, StatusSource, StatusStream};
use crate::error::{ChannelError, HostAccessError, RenderError, TransportError};
use crate::intake::{FieldSet, WorkflowKind};
use crate::mail::{AttachmentRef, EmailSnapshot};
use crate::notify::{Notice, Notifier};
use crate::render::FormRenderer;

// ── Snapshot ────────────────────────────────────────────────────────

/// Underwriting-style email with the given attachments.
pub(crate) fn snapshot(attachments: Vec<AttachmentRef>) -> EmailSnapshot {
    EmailSnapshot {
        subject: "Policy No: AB123456".into(),
        sender: "broker@example.com".into(),
        received_at: None,
        captured_at: "2026-02-16T14:05:00Z".parse().unwrap(),
        body: "see attached".into(),
        user_email: "me@example.com".into(),
        item_id: "item-1".into(),
        internet_message_id: "<m1@example.com>".into(),
        conversation_id: "conv-1".into(),
        attachments,
    }
}

// ── Status source ───────────────────────────────────────────────────

/// What a push subscription does.
#[derive(Debug, Clone)]
pub(crate) enum PushScript {
    /// `subscribe` itself fails.
    ConnectError,
    /// Stream yields these items then ends. `Err` items are stream errors.
    Events(Vec<Result<StatusPayload, String>>),
    /// Stream never yields.
    Pending,
}

pub(crate) struct ScriptedStatus {
    push: PushScript,
    polls: Mutex<VecDeque<Result<StatusPayload, String>>>,
    pub subscribed: Mutex<Vec<String>>,
    pub poll_count: AtomicUsize,
}

impl ScriptedStatus {
    /// Polls beyond the script report `processing`.
    pub fn new(push: PushScript, polls: Vec<Result<StatusPayload, String>>) -> Self {
        Self {
            push,
            polls: Mutex::new(polls.into()),
            subscribed: Mutex::new(Vec::new()),
            poll_count: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn subscribe(&self, session_id: &str) -> Result<StatusStream, ChannelError> {
        self.subscribed.lock().unwrap().push(session_id.to_string());
        match self.push.clone() {
            PushScript::ConnectError => Err(ChannelError::Connect {
                url: format!("scripted/{session_id}"),
                reason: "connection refused".into(),
            }),
            PushScript::Events(items) => Ok(futures::stream::iter(items.into_iter().map(|r| {
                r.map_err(|reason| ChannelError::Stream {
                    url: "scripted".into(),
                    reason,
                })
            }))
            .boxed()),
            PushScript::Pending => Ok(futures::stream::pending().boxed()),
        }
    }

    async fn poll(&self, _session_id: &str) -> Result<StatusPayload, ChannelError> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        match self.polls.lock().unwrap().pop_front() {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(reason)) => Err(ChannelError::Connect {
                url: "scripted".into(),
                reason,
            }),
            None => Ok(StatusPayload::new("processing")),
        }
    }
}

// ── Backend ─────────────────────────────────────────────────────────

/// Backend answering `process`/`submit` from a queue and recording every call.
pub(crate) struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<BackendResponse, String>>>,
    extract_result: Option<String>,
    pub calls: Mutex<Vec<String>>,
    pub processed: Mutex<Vec<ProcessRequest>>,
    pub submitted: Mutex<Vec<SubmitRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Result<BackendResponse, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            extract_result: None,
            calls: Mutex::new(Vec::new()),
            processed: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Make `extract` acknowledge with this session id.
    pub fn with_extract_session(mut self, session_id: &str) -> Self {
        self.extract_result = Some(session_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, endpoint: &str) -> Result<BackendResponse, TransportError> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(reason)) => Err(TransportError::Request {
                endpoint: endpoint.to_string(),
                reason,
            }),
            None => panic!("unexpected call to {endpoint}"),
        }
    }
}

#[async_trait]
impl IntakeBackend for ScriptedBackend {
    async fn extract(
        &self,
        _workflow: WorkflowKind,
        _request: &ExtractRequest,
    ) -> Result<ExtractAck, TransportError> {
        self.calls.lock().unwrap().push("extract".into());
        match &self.extract_result {
            Some(id) => Ok(ExtractAck {
                session_id: id.clone(),
            }),
            None => Err(TransportError::Status {
                endpoint: "extract".into(),
                status: 500,
                body: "boom".into(),
            }),
        }
    }

    async fn process(
        &self,
        _workflow: WorkflowKind,
        request: &ProcessRequest,
    ) -> Result<BackendResponse, TransportError> {
        self.processed.lock().unwrap().push(request.clone());
        self.next("process")
    }

    async fn submit(
        &self,
        _workflow: WorkflowKind,
        request: &SubmitRequest,
    ) -> Result<BackendResponse, TransportError> {
        self.submitted.lock().unwrap().push(request.clone());
        self.next("submit")
    }
}

// ── Notifier ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NoticeOp {
    Add(String),
    Remove(String),
}

/// Notifier that records operations and tracks what is visible.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub ops: Mutex<Vec<NoticeOp>>,
    pub visible: Mutex<Vec<(String, Notice)>>,
    /// Number of upcoming `remove` calls that fail.
    pub failing_removes: AtomicUsize,
}

impl RecordingNotifier {
    pub fn fail_next_removes(&self, n: usize) {
        self.failing_removes.store(n, Ordering::SeqCst);
    }

    pub fn visible_keys(&self) -> Vec<String> {
        self.visible().into_iter().map(|(k, _)| k).collect()
    }

    pub fn ops(&self) -> Vec<NoticeOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn visible(&self) -> Vec<(String, Notice)> {
        self.visible.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn add(&self, key: &str, notice: &Notice) -> Result<(), HostAccessError> {
        self.ops.lock().unwrap().push(NoticeOp::Add(key.to_string()));
        self.visible
            .lock()
            .unwrap()
            .push((key.to_string(), notice.clone()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), HostAccessError> {
        let failing = self
            .failing_removes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(HostAccessError::ItemUnavailable);
        }
        self.ops.lock().unwrap().push(NoticeOp::Remove(key.to_string()));
        self.visible.lock().unwrap().retain(|(k, _)| k != key);
        Ok(())
    }
}

// ── Renderer ────────────────────────────────────────────────────────

pub(crate) struct StubRenderer;

impl FormRenderer for StubRenderer {
    fn render(&self, fields: &FieldSet) -> Result<Vec<u8>, RenderError> {
        Ok(format!("form:{}", fields.policy_number).into_bytes())
    }
}
