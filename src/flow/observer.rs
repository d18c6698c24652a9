//! Host callbacks: the only points where the flow touches display code.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::state::AttemptStatus;
use crate::errors::AttemptError;
use crate::service::ServiceId;

/// Receives status, progress and completion notifications from a flow.
///
/// Callbacks run on the flow's event loop and must not block. Short local
/// writes such as `JournalObserver`'s appends are the upper bound; anything
/// slower belongs behind a `ChannelObserver`.
pub trait FlowObserver: Send + Sync {
    fn service_status_changed(
        &self,
        service: &ServiceId,
        status: AttemptStatus,
        error: Option<&AttemptError>,
    );

    fn progress(&self, resolved: usize, total: usize);

    /// Fired exactly once per flow.
    fn flow_complete(&self);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FlowObserver for NoopObserver {
    fn service_status_changed(&self, _: &ServiceId, _: AttemptStatus, _: Option<&AttemptError>) {}

    fn progress(&self, _: usize, _: usize) {}

    fn flow_complete(&self) {}
}

/// Fans every notification out to several observers in order.
#[derive(Default, Clone)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn FlowObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn FlowObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl FlowObserver for CompositeObserver {
    fn service_status_changed(
        &self,
        service: &ServiceId,
        status: AttemptStatus,
        error: Option<&AttemptError>,
    ) {
        for observer in &self.observers {
            observer.service_status_changed(service, status, error);
        }
    }

    fn progress(&self, resolved: usize, total: usize) {
        for observer in &self.observers {
            observer.progress(resolved, total);
        }
    }

    fn flow_complete(&self) {
        for observer in &self.observers {
            observer.flow_complete();
        }
    }
}

/// A host notification as a value, for hosts that react off the flow's loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    StatusChanged {
        service: ServiceId,
        status: AttemptStatus,
        error: Option<AttemptError>,
    },
    Progress {
        resolved: usize,
        total: usize,
    },
    Complete,
}

/// Forwards every notification as a [`FlowEvent`] over an unbounded channel.
///
/// Sends after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<FlowEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FlowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FlowObserver for ChannelObserver {
    fn service_status_changed(
        &self,
        service: &ServiceId,
        status: AttemptStatus,
        error: Option<&AttemptError>,
    ) {
        let _ = self.tx.send(FlowEvent::StatusChanged {
            service: service.clone(),
            status,
            error: error.cloned(),
        });
    }

    fn progress(&self, resolved: usize, total: usize) {
        let _ = self.tx.send(FlowEvent::Progress { resolved, total });
    }

    fn flow_complete(&self) {
        let _ = self.tx.send(FlowEvent::Complete);
    }
}


#[cfg(test)]
mod tests {
    use super::recording::{Notice, RecordingObserver};
    use super::*;

    #[test]
    fn composite_forwards_to_every_observer_in_order() {
        let first = Arc::new(RecordingObserver::default());
        let second = Arc::new(RecordingObserver::default());
        let composite = CompositeObserver::new()
            .with(first.clone())
            .with(second.clone());

        composite.service_status_changed(
            &ServiceId::from("slack"),
            AttemptStatus::Error,
            Some(&AttemptError::PopupBlocked),
        );
        composite.progress(1, 3);
        composite.flow_complete();

        let expected = vec![
            Notice::Status(
                "slack".to_string(),
                AttemptStatus::Error,
                Some("popup_blocked".to_string()),
            ),
            Notice::Progress(1, 3),
            Notice::Complete,
        ];
        assert_eq!(first.notices(), expected);
        assert_eq!(second.notices(), expected);
    }

    #[test]
    fn channel_observer_forwards_events_until_receiver_drops() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.service_status_changed(
            &ServiceId::from("jira"),
            AttemptStatus::Error,
            Some(&AttemptError::WindowClosed),
        );
        observer.flow_complete();

        assert_eq!(
            rx.try_recv().unwrap(),
            FlowEvent::StatusChanged {
                service: ServiceId::from("jira"),
                status: AttemptStatus::Error,
                error: Some(AttemptError::WindowClosed),
            }
        );
        assert_eq!(rx.try_recv().unwrap(), FlowEvent::Complete);

        drop(rx);
        observer.progress(1, 1);
    }
}
