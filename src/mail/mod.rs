//! Mail host access and snapshot capture.

pub mod eml;
pub mod host;
pub mod snapshot;

pub use eml::EmlMailItem;
pub use host::{AttachmentInfo, MailHost};
pub use snapshot::{AttachmentRef, EmailMetadata, EmailSnapshot, capture};
