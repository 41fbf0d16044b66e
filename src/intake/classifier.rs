//! Workflow classification from attachment names.
//!
//! Rules run over attachments in host order and the first match wins:
//! - `C<digit>…` (case-insensitive) → Claims
//! - `acord…` (case-insensitive) → Underwriting
//! - nothing matches → Underwriting

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mail::AttachmentRef;

static CLAIMS_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^c\d").unwrap());

const UNDERWRITING_PREFIX: &str = "acord";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "ico"];

/// Backend pipeline an email is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Claims,
    Underwriting,
}

impl WorkflowKind {
    /// Path prefix of this workflow's submission API.
    pub fn api_prefix(&self) -> &'static str {
        match self {
            Self::Claims => "/claims-api",
            Self::Underwriting => "/api",
        }
    }

    /// Whether an attachment name follows this workflow's naming convention.
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            Self::Claims => CLAIMS_NAME.is_match(name),
            Self::Underwriting => name.to_lowercase().starts_with(UNDERWRITING_PREFIX),
        }
    }

    /// Name of the destination shown to the user.
    pub fn center_name(&self) -> &'static str {
        match self {
            Self::Claims => "Claims Center",
            Self::Underwriting => "Policy Center",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Claims => "claims",
            Self::Underwriting => "underwriting",
        };
        write!(f, "{s}")
    }
}

/// Pick the workflow for an email from its attachment names.
pub fn classify(attachments: &[AttachmentRef]) -> WorkflowKind {
    for att in attachments {
        if WorkflowKind::Claims.matches_name(&att.name) {
            debug!(name = %att.name, "Claims workflow detected");
            return WorkflowKind::Claims;
        }
        if WorkflowKind::Underwriting.matches_name(&att.name) {
            debug!(name = %att.name, "Underwriting workflow detected");
            return WorkflowKind::Underwriting;
        }
    }
    debug!("No workflow marker in attachment names, defaulting to underwriting");
    WorkflowKind::Underwriting
}

/// Index of the primary document: the first attachment following the
/// workflow's naming convention, else the first attachment.
pub fn select_primary(workflow: WorkflowKind, attachments: &[AttachmentRef]) -> Option<usize> {
    if attachments.is_empty() {
        return None;
    }
    attachments
        .iter()
        .position(|a| workflow.matches_name(&a.name))
        .or(Some(0))
}

/// Attachments that travel alongside the primary: every other one whose
/// content was retrieved.
pub fn extra_attachments(primary: usize, attachments: &[AttachmentRef]) -> Vec<AttachmentRef> {
    attachments
        .iter()
        .enumerate()
        .filter(|(idx, att)| *idx != primary && att.bytes.is_some())
        .map(|(_, att)| att.clone())
        .collect()
}

/// Image file by extension. Images are left out of the extraction upload.
pub fn is_image(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(names: &[&str]) -> Vec<AttachmentRef> {
        names
            .iter()
            .map(|n| AttachmentRef::with_bytes(*n, "application/pdf", b"x".to_vec()))
            .collect()
    }

    #[test]
    fn empty_list_defaults_to_underwriting() {
        assert_eq!(classify(&[]), WorkflowKind::Underwriting);
    }

    #[test]
    fn claims_name_detected() {
        assert_eq!(classify(&named(&["C1_loss.pdf"])), WorkflowKind::Claims);
        assert_eq!(classify(&named(&["c42-notice.pdf"])), WorkflowKind::Claims);
    }

    #[test]
    fn c_without_digit_is_not_claims() {
        assert_eq!(classify(&named(&["claim.pdf"])), WorkflowKind::Underwriting);
    }

    #[test]
    fn first_match_in_order_wins() {
        assert_eq!(
            classify(&named(&["notes.txt", "ACORD_125.pdf", "C1.pdf"])),
            WorkflowKind::Underwriting
        );
        assert_eq!(
            classify(&named(&["notes.txt", "C1.pdf", "acord_125.pdf"])),
            WorkflowKind::Claims
        );
    }

    #[test]
    fn unmatched_names_default_to_underwriting() {
        assert_eq!(classify(&named(&["x.pdf", "y.docx"])), WorkflowKind::Underwriting);
    }

    #[test]
    fn primary_prefers_acord_name() {
        let atts = named(&["x.pdf", "acord_form.pdf", "y.docx"]);
        let idx = select_primary(WorkflowKind::Underwriting, &atts).unwrap();
        assert_eq!(atts[idx].name, "acord_form.pdf");
    }

    #[test]
    fn primary_falls_back_to_first() {
        let atts = named(&["x.pdf", "y.docx"]);
        let idx = select_primary(WorkflowKind::Underwriting, &atts).unwrap();
        assert_eq!(atts[idx].name, "x.pdf");
    }

    #[test]
    fn primary_for_claims_uses_claims_convention() {
        let atts = named(&["cover.pdf", "C7_fnol.pdf"]);
        let idx = select_primary(WorkflowKind::Claims, &atts).unwrap();
        assert_eq!(atts[idx].name, "C7_fnol.pdf");
    }

    #[test]
    fn primary_none_without_attachments() {
        assert!(select_primary(WorkflowKind::Claims, &[]).is_none());
    }

    #[test]
    fn extras_skip_primary_and_failed() {
        let mut atts = named(&["acord_125.pdf", "logo.PNG", "loss_run.docx"]);
        atts.push(AttachmentRef::failed("schedule.xlsx", "timeout"));

        let extras = extra_attachments(0, &atts);
        let names: Vec<&str> = extras.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["logo.PNG", "loss_run.docx"]);
    }

    #[test]
    fn image_detection_by_extension() {
        assert!(is_image("logo.PNG"));
        assert!(is_image("scan.jpeg"));
        assert!(!is_image("loss_run.docx"));
        assert!(!is_image("png"));
    }

    #[test]
    fn api_prefix_per_workflow() {
        assert_eq!(WorkflowKind::Claims.api_prefix(), "/claims-api");
        assert_eq!(WorkflowKind::Underwriting.api_prefix(), "/api");
    }
}
