//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;
use crate::intake::WorkflowKind;

/// Header that suppresses the tunnelling proxy's interstitial warning page.
pub const TUNNEL_SKIP_HEADER: (&str, &str) = ("ngrok-skip-browser-warning", "true");

/// Default interval between completion status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default ceiling on status polls (~15 minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 450;

/// Backend endpoints and completion-channel tuning, built from environment variables.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Base URL of the claims backend.
    pub claims_base_url: String,
    /// Base URL of the underwriting backend. Also hosts the stream/status endpoints.
    pub underwriting_base_url: String,
    /// Completion-channel polling behaviour.
    pub completion: CompletionConfig,
    /// Per-request timeout for submission calls.
    pub request_timeout: Duration,
}

/// Polling fallback tuning for a completion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionConfig {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl IntakeConfig {
    /// Build a config with default tuning for the given backends.
    pub fn new(claims_base_url: impl Into<String>, underwriting_base_url: impl Into<String>) -> Self {
        Self {
            claims_base_url: trim_base(claims_base_url.into()),
            underwriting_base_url: trim_base(underwriting_base_url.into()),
            completion: CompletionConfig::default(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Build config from environment variables.
    ///
    /// `INTAKE_CLAIMS_API_URL` and `INTAKE_UNDERWRITING_API_URL` are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(None, None)
    }

    /// Like [`IntakeConfig::from_env`], but explicit URLs win over the environment.
    pub fn resolve(
        claims_base_url: Option<String>,
        underwriting_base_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let claims = match claims_base_url {
            Some(url) => url,
            None => required_var("INTAKE_CLAIMS_API_URL")?,
        };
        let underwriting = match underwriting_base_url {
            Some(url) => url,
            None => required_var("INTAKE_UNDERWRITING_API_URL")?,
        };

        Self::new(claims, underwriting).with_env_tuning()
    }

    /// Apply the optional tuning variables on top of `self`.
    pub fn with_env_tuning(mut self) -> Result<Self, ConfigError> {
        if let Some(ms) = parsed_var::<u64>("INTAKE_POLL_INTERVAL_MS")? {
            self.completion.poll_interval = Duration::from_millis(ms);
        }
        if let Some(max) = parsed_var::<u32>("INTAKE_POLL_MAX_ATTEMPTS")? {
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "INTAKE_POLL_MAX_ATTEMPTS".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            self.completion.max_poll_attempts = max;
        }
        if let Some(secs) = parsed_var::<u64>("INTAKE_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout = Duration::from_secs(secs);
        }

        Ok(self)
    }

    /// Base URL serving the given workflow.
    pub fn base_url(&self, workflow: WorkflowKind) -> &str {
        match workflow {
            WorkflowKind::Claims => &self.claims_base_url,
            WorkflowKind::Underwriting => &self.underwriting_base_url,
        }
    }

    /// Full URL of a submission endpoint (`extract`, `process`, `submit`).
    pub fn endpoint(&self, workflow: WorkflowKind, name: &str) -> String {
        format!("{}{}/{name}", self.base_url(workflow), workflow.api_prefix())
    }

    /// SSE endpoint for a session.
    pub fn stream_url(&self, session_id: &str) -> String {
        format!("{}/api/stream/{session_id}", self.underwriting_base_url)
    }

    /// Polling endpoint for a session.
    pub fn status_url(&self, session_id: &str) -> String {
        format!("{}/api/status/{session_id}", self.underwriting_base_url)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn required_var(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed_var<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
