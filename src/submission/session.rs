//! Per-email submission session.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::{StateTransition, SubmissionState};
use crate::backend::wire::{ExtraAttachment, ExtractRequest, SubmitRequest, encode};
use crate::error::SubmissionError;
use crate::intake::{self, FieldEdits, FieldSet, WorkflowKind};
use crate::mail::{AttachmentRef, EmailMetadata, EmailSnapshot};

/// Backend session id shared with the background extraction task.
///
/// Set at most once; the first writer wins.
pub type SessionSlot = Arc<OnceLock<String>>;

const MAX_TRANSITIONS: usize = 50;

/// Everything needed to submit one email, plus its lifecycle.
#[derive(Debug)]
pub struct SubmissionSession {
    key: Uuid,
    session_id: SessionSlot,
    workflow: WorkflowKind,
    fields: FieldSet,
    primary: AttachmentRef,
    extras: Vec<AttachmentRef>,
    metadata: EmailMetadata,
    state: SubmissionState,
    transitions: Vec<StateTransition>,
}

impl SubmissionSession {
    /// Build an idle session: classify, pick the primary, derive fields.
    pub fn from_snapshot(snapshot: &EmailSnapshot) -> Result<Self, SubmissionError> {
        let workflow = intake::classify(&snapshot.attachments);
        let primary_idx = intake::select_primary(workflow, &snapshot.attachments)
            .ok_or(SubmissionError::NoPrimaryAttachment)?;
        let primary = snapshot.attachments[primary_idx].clone();
        let extras = intake::extra_attachments(primary_idx, &snapshot.attachments);

        let key = Uuid::new_v4();
        info!(
            session = %key,
            workflow = %workflow,
            primary = %primary.name,
            extras = extras.len(),
            "Submission session created"
        );

        Ok(Self {
            key,
            session_id: Arc::new(OnceLock::new()),
            workflow,
            fields: intake::extract(snapshot),
            primary,
            extras,
            metadata: snapshot.metadata(),
            state: SubmissionState::Idle,
            transitions: Vec::new(),
        })
    }

    /// Client-side identity, independent of the backend session id.
    pub fn key(&self) -> Uuid {
        self.key
    }

    pub fn workflow(&self) -> WorkflowKind {
        self.workflow
    }

    pub fn primary(&self) -> &AttachmentRef {
        &self.primary
    }

    pub fn extras(&self) -> &[AttachmentRef] {
        &self.extras
    }

    pub fn metadata(&self) -> &EmailMetadata {
        &self.metadata
    }

    /// Backend session id, once known.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.get().map(String::as_str)
    }

    /// Shared handle to the session id cell.
    pub fn slot(&self) -> SessionSlot {
        Arc::clone(&self.session_id)
    }

    /// Record the backend session id. Returns the id actually held, which
    /// differs from `id` when one was already set.
    pub fn record_session_id(&self, id: &str) -> &str {
        let held = self.session_id.get_or_init(|| id.to_string());
        if held != id {
            warn!(session = %self.key, held = %held, reported = %id, "Session id already set, keeping the first");
        }
        held
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Apply user edits to the form fields.
    pub fn edit(&mut self, edits: FieldEdits) {
        self.fields.apply(edits);
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Move to `to`, rejecting transitions the state machine forbids.
    pub fn transition(
        &mut self,
        to: SubmissionState,
        reason: Option<String>,
    ) -> Result<(), SubmissionError> {
        if !self.state.can_transition_to(to) {
            return Err(SubmissionError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }

        info!(session = %self.key, from = %self.state, to = %to, reason = ?reason, "Submission state change");
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            timestamp: Utc::now(),
            reason,
        });
        if self.transitions.len() > MAX_TRANSITIONS {
            let drain_count = self.transitions.len() - MAX_TRANSITIONS;
            self.transitions.drain(..drain_count);
        }
        self.state = to;
        Ok(())
    }

    /// Extraction payload, `None` when the primary has no content.
    ///
    /// Image extras are not uploaded for extraction.
    pub fn extract_request(&self) -> Option<ExtractRequest> {
        let content = self.primary.bytes.clone()?;
        Some(ExtractRequest {
            filename: self.primary.name.clone(),
            content,
            extras: self
                .extras
                .iter()
                .filter(|a| {
                    let image = intake::is_image(&a.name);
                    if image {
                        debug!(session = %self.key, name = %a.name, "Skipping image attachment for extraction");
                    }
                    !image
                })
                .filter_map(|a| a.bytes.clone().map(|b| (a.name.clone(), b)))
                .collect(),
            metadata: self.metadata.clone(),
        })
    }

    /// Full `/submit` payload.
    pub fn submit_request(&self) -> Result<SubmitRequest, SubmissionError> {
        let bytes = self
            .primary
            .bytes
            .as_ref()
            .ok_or_else(|| SubmissionError::PrimaryUnavailable {
                name: self.primary.name.clone(),
                reason: self
                    .primary
                    .error
                    .clone()
                    .unwrap_or_else(|| "content not retrieved".to_string()),
            })?;

        Ok(SubmitRequest {
            filename: self.primary.name.clone(),
            attachment_base64: encode(bytes),
            email_metadata: self.metadata.clone(),
            email_fields: self.fields.clone(),
            extra_attachments: self
                .extras
                .iter()
                .filter_map(ExtraAttachment::from_attachment)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::snapshot;

    fn pdf(name: &str) -> AttachmentRef {
        AttachmentRef::with_bytes(name, "application/pdf", b"%PDF".to_vec())
    }

    #[test]
    fn test_no_attachments_is_rejected() {
        let err = SubmissionSession::from_snapshot(&snapshot(vec![])).unwrap_err();
        assert!(matches!(err, SubmissionError::NoPrimaryAttachment));
    }

    #[test]
    fn test_session_starts_idle_with_derived_fields() {
        let session =
            SubmissionSession::from_snapshot(&snapshot(vec![pdf("notes.pdf"), pdf("ACORD_125.pdf")]))
                .unwrap();
        assert_eq!(session.state(), SubmissionState::Idle);
        assert_eq!(session.workflow(), WorkflowKind::Underwriting);
        assert_eq!(session.primary().name, "ACORD_125.pdf");
        assert_eq!(session.extras().len(), 1);
        assert_eq!(session.fields().policy_number, "AB123456");
        assert!(session.session_id().is_none());
    }

    #[test]
    fn test_session_id_is_set_once() {
        let session = SubmissionSession::from_snapshot(&snapshot(vec![pdf("acord.pdf")])).unwrap();
        assert_eq!(session.record_session_id("S1"), "S1");
        assert_eq!(session.record_session_id("S2"), "S1");
        assert_eq!(session.session_id(), Some("S1"));

        let slot = session.slot();
        assert_eq!(slot.get().map(String::as_str), Some("S1"));
    }

    #[test]
    fn test_invalid_transition_keeps_state() {
        let mut session = SubmissionSession::from_snapshot(&snapshot(vec![pdf("acord.pdf")])).unwrap();
        let err = session.transition(SubmissionState::Done, None).unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidTransition { .. }));
        assert_eq!(session.state(), SubmissionState::Idle);
        assert!(session.transitions().is_empty());
    }

    #[test]
    fn test_transitions_are_recorded() {
        let mut session = SubmissionSession::from_snapshot(&snapshot(vec![pdf("acord.pdf")])).unwrap();
        session.transition(SubmissionState::Submitting, None).unwrap();
        session
            .transition(SubmissionState::Failed, Some("boom".into()))
            .unwrap();
        session.transition(SubmissionState::Submitting, None).unwrap();

        let t = session.transitions();
        assert_eq!(t.len(), 3);
        assert_eq!(t[1].to, SubmissionState::Failed);
        assert_eq!(t[1].reason.as_deref(), Some("boom"));
    }

    #[test]
    fn test_submit_request_requires_primary_bytes() {
        let session = SubmissionSession::from_snapshot(&snapshot(vec![AttachmentRef::failed(
            "acord_125.pdf",
            "network",
        )]))
        .unwrap();
        assert!(session.extract_request().is_none());
        let err = session.submit_request().unwrap_err();
        match err {
            SubmissionError::PrimaryUnavailable { name, reason } => {
                assert_eq!(name, "acord_125.pdf");
                assert_eq!(reason, "network");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_submit_request_carries_edits_and_extras() {
        let mut session = SubmissionSession::from_snapshot(&snapshot(vec![
            pdf("acord_125.pdf"),
            AttachmentRef::with_bytes("loss_run.docx", "application/msword", b"hi".to_vec()),
            AttachmentRef::with_bytes("logo.png", "image/png", b"png".to_vec()),
        ]))
        .unwrap();
        session.edit(FieldEdits {
            comment: Some("rush".into()),
            ..Default::default()
        });

        let request = session.submit_request().unwrap();
        assert_eq!(request.filename, "acord_125.pdf");
        assert_eq!(request.attachment_base64, "JVBERg==");
        assert_eq!(request.email_fields.comment, "rush");
        let names: Vec<&str> = request
            .extra_attachments
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["loss_run.docx", "logo.png"]);
        assert_eq!(request.extra_attachments[0].content_bytes, "aGk=");
        assert_eq!(request.email_metadata.item_id, "item-1");

        let extract = session.extract_request().unwrap();
        assert_eq!(extract.extras, vec![("loss_run.docx".to_string(), b"hi".to_vec())]);
    }
}
