//! Error types for intake-assist.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Host access error: {0}")]
    HostAccess(#[from] HostAccessError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Completion channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures reading the host mail item.
///
/// These never abort snapshot capture; the affected field degrades to a
/// placeholder and the affected attachment records the reason.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostAccessError {
    #[error("Mail item is not available")]
    ItemUnavailable,

    #[error("Field {field} unavailable: {reason}")]
    FieldUnavailable { field: String, reason: String },

    #[error("Attachment {name} unavailable: {reason}")]
    AttachmentUnavailable { name: String, reason: String },

    #[error("Failed to parse message: {0}")]
    Parse(String),
}

/// Failures talking to the workflow backend during submission.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("Request to {endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedBody { endpoint: String, reason: String },

    #[error("Backend reported processing for {endpoint} without a session id")]
    MissingSession { endpoint: String },
}

/// Push/poll transport failures inside a completion channel.
///
/// The channel consumes these: a push failure triggers the polling
/// fallback, a poll failure is retried on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Stream from {url} failed: {reason}")]
    Stream { url: String, reason: String },

    #[error("Status request to {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid status payload: {0}")]
    InvalidPayload(String),
}

/// Submission-level errors.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Submission already in state {from}, cannot transition to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No attachment found in email")]
    NoPrimaryAttachment,

    #[error("Primary attachment {name} has no content: {reason}")]
    PrimaryUnavailable { name: String, reason: String },

    #[error("Form rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Form document rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
