//! Workflow selection and form field derivation.

pub mod classifier;
pub mod fields;

pub use classifier::{WorkflowKind, classify, extra_attachments, is_image, select_primary};
pub use fields::{FieldEdits, FieldSet, extract};
