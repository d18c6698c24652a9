//! One authorization attempt for one service.
//!
//! An attempt resolves the login target, opens a window on it, then waits for
//! whichever comes first: a completion message for this service on the bus,
//! the liveness poll noticing the window was closed, or the optional abandon
//! timeout for windows whose closure cannot be observed. Exactly one of them
//! resolves the attempt. The listener is registered before the window opens so
//! a provider that redirects straight to the callback is not missed. The
//! listener and the poll timer are owned by the attempt future, so dropping
//! the future (cancel, skip) tears both down and closes the window.

pub mod target;

pub use target::{StaticTargetResolver, TargetResolver, build_target_url};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, info, warn};

use crate::channel::MessageBus;
use crate::errors::AttemptError;
use crate::service::ServiceEntry;
use crate::surface::{SurfaceGeometry, SurfaceLauncher};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest liveness poll period accepted by `with_poll_interval`.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Terminal result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error(AttemptError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<Result<(), AttemptError>> for Outcome {
    fn from(result: Result<(), AttemptError>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(error) => Outcome::Error(error),
        }
    }
}

pub struct AttemptManager {
    resolver: Arc<dyn TargetResolver>,
    launcher: Arc<dyn SurfaceLauncher>,
    bus: MessageBus,
    user_id: String,
    geometry: SurfaceGeometry,
    poll_interval: Duration,
    attempt_timeout: Option<Duration>,
}

impl AttemptManager {
    pub fn new(
        resolver: Arc<dyn TargetResolver>,
        launcher: Arc<dyn SurfaceLauncher>,
        bus: MessageBus,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            launcher,
            bus,
            user_id: user_id.into(),
            geometry: SurfaceGeometry::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            attempt_timeout: None,
        }
    }

    pub fn with_geometry(mut self, geometry: SurfaceGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Periods below `MIN_POLL_INTERVAL` are raised to it.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Give up on a window after `timeout` and report it as closed.
    /// `None` waits until a message arrives or the window is seen closed.
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    pub async fn attempt(&self, service: &ServiceEntry) -> Outcome {
        let Some(base_url) = self.resolver.resolve(service) else {
            warn!(service = %service.id(), "No authorization target configured");
            return Outcome::Error(AttemptError::NoTargetConfigured);
        };
        let url = match build_target_url(&base_url, &self.user_id, service.id()) {
            Ok(url) => url,
            Err(error) => return Outcome::Error(error),
        };

        let mut listener = self.bus.subscribe();
        let mut surface = match self.launcher.open(&url, self.geometry).await {
            Ok(Some(surface)) => surface,
            Ok(None) => {
                warn!(service = %service.id(), "Authorization window was blocked");
                return Outcome::Error(AttemptError::PopupBlocked);
            }
            Err(e) => {
                warn!(service = %service.id(), error = %e, "Failed to open authorization window");
                return Outcome::Error(AttemptError::PopupBlocked);
            }
        };
        if surface.is_closed() {
            warn!(service = %service.id(), "Authorization window closed as soon as it opened");
            drop(listener);
            surface.close().await;
            return Outcome::Error(AttemptError::PopupBlocked);
        }

        info!(service = %service.id(), "Waiting for authorization");
        let mut poll = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let abandon = async {
            match self.attempt_timeout {
                Some(timeout) => sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(abandon);

        let outcome = loop {
            tokio::select! {
                message = listener.next_for(service.id()) => {
                    break match message {
                        Some(message) => {
                            debug!(service = %service.id(), kind = ?message.kind, "Completion message received");
                            Outcome::from(message.into_result())
                        }
                        None => Outcome::Error(AttemptError::WindowClosed),
                    };
                }
                _ = &mut abandon => {
                    info!(service = %service.id(), "No completion before the attempt timeout");
                    break Outcome::Error(AttemptError::WindowClosed);
                }
                _ = poll.tick() => {
                    if surface.is_closed() {
                        info!(service = %service.id(), "Authorization window closed before completion");
                        break Outcome::Error(AttemptError::WindowClosed);
                    }
                }
            }
        };

        drop(listener);
        drop(poll);
        surface.close().await;
        outcome
    }
}
