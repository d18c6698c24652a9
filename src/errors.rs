//! Typed error hierarchy for the authorization flow.
//!
//! Two top-level enums cover the two failure surfaces:
//! - `AttemptError`: why a single service attempt did not reach success.
//!   These are always recovered into the service's `Error` status.
//! - `FlowError`: infrastructure failures around the flow (callback channel,
//!   configuration, launcher setup, runner lifetime).

use std::path::PathBuf;

use thiserror::Error;

use crate::service::ServiceId;

/// User-facing grouping of attempt failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No authorization target for the service; needs caller reconfiguration.
    ConfigurationError,
    /// The authorization window was closed before completing.
    UserAbandoned,
    /// The authorization window could not be opened.
    BlockedByBrowser,
    /// The provider reported a failure through the callback channel.
    ProviderReported,
}

impl ErrorCategory {
    /// Short phrase for prompts and summaries.
    pub fn describe(self) -> &'static str {
        match self {
            ErrorCategory::ConfigurationError => "not configured",
            ErrorCategory::UserAbandoned => "window closed",
            ErrorCategory::BlockedByBrowser => "window blocked",
            ErrorCategory::ProviderReported => "provider error",
        }
    }
}

/// Terminal failure of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("No authorization target configured")]
    NoTargetConfigured,

    #[error("Authorization window was blocked")]
    PopupBlocked,

    #[error("Authorization window was closed before completion")]
    WindowClosed,

    #[error("Provider reported an error: {0}")]
    ProviderReported(String),
}

impl AttemptError {
    /// Stable short code surfaced as the service's error message.
    ///
    /// Provider errors surface the provider's own text verbatim.
    pub fn code(&self) -> &str {
        match self {
            AttemptError::NoTargetConfigured => "no_target_configured",
            AttemptError::PopupBlocked => "popup_blocked",
            AttemptError::WindowClosed => "window_closed",
            AttemptError::ProviderReported(message) => message,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AttemptError::NoTargetConfigured => ErrorCategory::ConfigurationError,
            AttemptError::PopupBlocked => ErrorCategory::BlockedByBrowser,
            AttemptError::WindowClosed => ErrorCategory::UserAbandoned,
            AttemptError::ProviderReported(_) => ErrorCategory::ProviderReported,
        }
    }

    /// Whether a user-driven retry can succeed without reconfiguring the caller.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::NoTargetConfigured)
    }
}

/// Errors from the flow infrastructure (never from a service attempt).
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Failed to bind callback server on {addr}: {source}")]
    CallbackBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid launcher command: {0}")]
    InvalidCommand(String),

    #[error("Unknown service '{0}'")]
    UnknownService(ServiceId),

    #[error("Service '{0}' appears more than once in the flow")]
    DuplicateService(ServiceId),

    #[error("Flow runner is no longer running")]
    RunnerGone,
}
