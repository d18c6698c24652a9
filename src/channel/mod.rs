//! Cross-context channel between authorization windows and the flow.
//!
//! Windows report completion as a [`CompletionMessage`]. Messages are
//! published on a [`MessageBus`]; each attempt holds its own [`Listener`]
//! for exactly as long as it is waiting, so a listener can never outlive
//! the attempt that registered it.
//!
//! - [`callback`]: local HTTP server that turns provider redirects and
//!   posted JSON into bus messages

pub mod callback;

pub use callback::CallbackServer;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::AttemptError;
use crate::service::ServiceId;

const BUS_CAPACITY: usize = 64;

/// Provider text used when an error message arrives without one.
const UNSPECIFIED_PROVIDER_ERROR: &str = "authorization_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionKind {
    #[serde(rename = "oauth_success", alias = "success")]
    Success,
    #[serde(rename = "oauth_error", alias = "error")]
    Error,
}

/// Completion report from an authorization window.
///
/// Wire shape: `{ "type": "oauth_success" | "oauth_error", "service": "<id>", "error"?: "<text>" }`.
/// `kind` is accepted in place of `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    #[serde(rename = "type", alias = "kind")]
    pub kind: CompletionKind,
    #[serde(rename = "service", alias = "serviceId")]
    pub service_id: ServiceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionMessage {
    pub fn success(service: impl Into<ServiceId>) -> Self {
        Self {
            kind: CompletionKind::Success,
            service_id: service.into(),
            error: None,
        }
    }

    pub fn error(service: impl Into<ServiceId>, error: impl Into<String>) -> Self {
        Self {
            kind: CompletionKind::Error,
            service_id: service.into(),
            error: Some(error.into()),
        }
    }

    /// Interpret an arbitrary JSON payload. Any other shape yields `None`.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!(error = %e, "Ignoring payload that is not a completion message");
                None
            }
        }
    }

    /// The attempt result this message stands for.
    pub fn into_result(self) -> Result<(), AttemptError> {
        match self.kind {
            CompletionKind::Success => Ok(()),
            CompletionKind::Error => Err(AttemptError::ProviderReported(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| UNSPECIFIED_PROVIDER_ERROR.to_string()),
            )),
        }
    }
}

/// Broadcast bus carrying completion messages to the active listener.
#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<CompletionMessage>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Deliver a message to every registered listener.
    ///
    /// Returns how many listeners received it; zero when no attempt is waiting.
    pub fn publish(&self, message: CompletionMessage) -> usize {
        match self.sender.send(message) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(message)) => {
                debug!(service = %message.service_id, "No listener for completion message");
                0
            }
        }
    }

    /// Register a listener slot. Dropping the listener frees the slot.
    pub fn subscribe(&self) -> Listener {
        Listener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One registered listener on the bus.
#[derive(Debug)]
pub struct Listener {
    receiver: broadcast::Receiver<CompletionMessage>,
}

impl Listener {
    /// Wait for the next message addressed to `service`.
    ///
    /// Messages for other services are skipped. Returns `None` once the bus is gone.
    pub async fn next_for(&mut self, service: &ServiceId) -> Option<CompletionMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if &message.service_id == service => return Some(message),
                Ok(message) => {
                    debug!(
                        expected = %service,
                        received = %message.service_id,
                        "Ignoring completion message for another service"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "Completion listener lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_success_message_with_type_field() {
        let message = CompletionMessage::from_json(json!({
            "type": "oauth_success",
            "service": "github"
        }))
        .unwrap();
        assert_eq!(message, CompletionMessage::success("github"));
    }

    #[test]
    fn parses_error_message_with_kind_field() {
        let message = CompletionMessage::from_json(json!({
            "kind": "oauth_error",
            "service": "jira",
            "error": "access_denied"
        }))
        .unwrap();
        assert_eq!(message.kind, CompletionKind::Error);
        assert_eq!(message.error.as_deref(), Some("access_denied"));
    }

    #[test]
    fn other_shapes_are_ignored() {
        assert!(CompletionMessage::from_json(json!({"type": "resize", "service": "a"})).is_none());
        assert!(CompletionMessage::from_json(json!({"type": "oauth_success"})).is_none());
        assert!(CompletionMessage::from_json(json!("oauth_success")).is_none());
    }

    #[test]
    fn error_without_text_gets_placeholder() {
        let message = CompletionMessage {
            kind: CompletionKind::Error,
            service_id: ServiceId::from("slack"),
            error: Some("  ".to_string()),
        };
        assert_eq!(
            message.into_result(),
            Err(AttemptError::ProviderReported("authorization_failed".into()))
        );
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_value(CompletionMessage::error("asana", "expired")).unwrap();
        assert_eq!(
            json,
            json!({"type": "oauth_error", "service": "asana", "error": "expired"})
        );
    }

    #[test]
    fn publish_without_listener_reports_zero() {
        let bus = MessageBus::new();
        assert_eq!(bus.publish(CompletionMessage::success("a")), 0);
    }

    #[tokio::test]
    async fn listener_skips_messages_for_other_services() {
        let bus = MessageBus::new();
        let mut listener = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);

        bus.publish(CompletionMessage::success("other"));
        bus.publish(CompletionMessage::error("mine", "denied"));

        let message = listener.next_for(&ServiceId::from("mine")).await.unwrap();
        assert_eq!(message.error.as_deref(), Some("denied"));

        drop(listener);
        assert_eq!(bus.listener_count(), 0);
    }
}
