use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::AttemptError;

/// Lifecycle status of one service within a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    #[default]
    Pending,
    Authorizing,
    Success,
    Error,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::Authorizing => "authorizing",
            AttemptStatus::Success => "success",
            AttemptStatus::Error => "error",
        }
    }

    /// `Success` is the only state a service never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Success)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AttemptStatus::Pending),
            "authorizing" => Ok(AttemptStatus::Authorizing),
            "success" => Ok(AttemptStatus::Success),
            "error" => Ok(AttemptStatus::Error),
            other => Err(format!("unknown attempt status '{}'", other)),
        }
    }
}

/// Mutable per-service state, owned by the flow controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptState {
    pub(crate) status: AttemptStatus,
    pub(crate) error: Option<AttemptError>,
}

impl AttemptState {
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn error(&self) -> Option<&AttemptError> {
        self.error.as_ref()
    }

    /// The user-facing error message, if the service is in `Error`.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(AttemptError::code)
    }
}

/// Position in the ordered service list plus the single-flight guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowCursor {
    pub(crate) index: usize,
    pub(crate) guard: bool,
}

impl FlowCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    /// True while an attempt is in flight.
    pub fn guard(&self) -> bool {
        self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            AttemptStatus::Pending,
            AttemptStatus::Authorizing,
            AttemptStatus::Success,
            AttemptStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<AttemptStatus>(), Ok(status));
        }
        assert!("done".parse::<AttemptStatus>().is_err());
    }

    #[test]
    fn only_success_is_terminal() {
        assert!(AttemptStatus::Success.is_terminal());
        assert!(!AttemptStatus::Error.is_terminal());
        assert!(!AttemptStatus::Pending.is_terminal());
        assert!(!AttemptStatus::Authorizing.is_terminal());
    }

    #[test]
    fn error_message_uses_error_code() {
        let state = AttemptState {
            status: AttemptStatus::Error,
            error: Some(AttemptError::WindowClosed),
        };
        assert_eq!(state.error_message(), Some("window_closed"));
        assert_eq!(AttemptState::default().error_message(), None);
    }
}
