//! Event loop that owns a [`FlowController`] and executes its attempts.
//!
//! The runner is the single serialization point of a flow: attempt outcomes and
//! user commands are applied one at a time on one task, in arrival order.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::controller::{AttemptId, AttemptTicket, FlowController, Rejection};
use super::observer::FlowObserver;
use super::projection::FlowProjection;
use crate::attempt::{AttemptManager, Outcome};
use crate::errors::{AttemptError, FlowError};
use crate::service::{ServiceEntry, ServiceId};

/// Pause between a success and the next window opening.
pub const DEFAULT_AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowCommand {
    Retry(ServiceId),
    Skip(ServiceId),
    SkipRemaining,
    Cancel,
}

/// Sends user commands to a running flow.
#[derive(Debug, Clone)]
pub struct FlowHandle {
    tx: mpsc::UnboundedSender<FlowCommand>,
}

impl FlowHandle {
    pub fn retry(&self, service: impl Into<ServiceId>) -> Result<(), FlowError> {
        self.send(FlowCommand::Retry(service.into()))
    }

    pub fn skip(&self, service: impl Into<ServiceId>) -> Result<(), FlowError> {
        self.send(FlowCommand::Skip(service.into()))
    }

    pub fn skip_remaining(&self) -> Result<(), FlowError> {
        self.send(FlowCommand::SkipRemaining)
    }

    pub fn cancel(&self) -> Result<(), FlowError> {
        self.send(FlowCommand::Cancel)
    }

    pub fn send(&self, command: FlowCommand) -> Result<(), FlowError> {
        self.tx.send(command).map_err(|_| FlowError::RunnerGone)
    }
}

/// Final state of a flow run.
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub run_id: Uuid,
    pub projection: FlowProjection,
    /// Ended by `cancel()` or by dropping every handle while paused.
    pub cancelled: bool,
}

impl FlowReport {
    /// Every service reached `Success`.
    pub fn all_authorized(&self) -> bool {
        !self.cancelled && self.projection.succeeded().count() == self.projection.total
    }
}

struct InFlight {
    attempt_id: AttemptId,
    service: ServiceId,
    task: JoinHandle<Outcome>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct FlowRunner {
    controller: FlowController,
    attempts: Arc<AttemptManager>,
    commands: mpsc::UnboundedReceiver<FlowCommand>,
    auto_advance_delay: Duration,
    in_flight: Option<InFlight>,
}

impl FlowRunner {
    pub fn new(attempts: Arc<AttemptManager>, observer: Arc<dyn FlowObserver>) -> (Self, FlowHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let runner = Self {
            controller: FlowController::new(observer),
            attempts,
            commands,
            auto_advance_delay: DEFAULT_AUTO_ADVANCE_DELAY,
            in_flight: None,
        };
        (runner, FlowHandle { tx })
    }

    pub fn with_auto_advance_delay(mut self, delay: Duration) -> Self {
        self.auto_advance_delay = delay;
        self
    }

    /// Run the flow over `services` until it completes or is cancelled.
    pub async fn run(self, services: Vec<ServiceEntry>) -> Result<FlowReport, FlowError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("flow", %run_id);
        self.event_loop(run_id, services).instrument(span).await
    }

    async fn event_loop(
        mut self,
        run_id: Uuid,
        services: Vec<ServiceEntry>,
    ) -> Result<FlowReport, FlowError> {
        match self.controller.start(services) {
            Ok(ticket) => self.launch(ticket, Duration::ZERO),
            Err(Rejection::DuplicateService(id)) => return Err(FlowError::DuplicateService(id)),
            Err(rejection) => warn!(%rejection, "Flow start rejected"),
        }

        let mut commands_open = true;
        let cancelled = loop {
            if self.controller.has_finished() {
                break false;
            }
            if !commands_open && self.in_flight.is_none() {
                info!("Flow paused with no command handle left");
                break true;
            }

            tokio::select! {
                (attempt_id, joined) = join_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    self.settle_attempt(attempt_id, joined);
                }
                command = self.commands.recv(), if commands_open => match command {
                    Some(FlowCommand::Cancel) => {
                        info!("Flow cancelled");
                        break true;
                    }
                    Some(FlowCommand::Retry(service)) => {
                        let result = self.controller.retry(&service);
                        self.apply(result);
                    }
                    Some(FlowCommand::Skip(service)) => {
                        let result = self.controller.skip(&service);
                        self.apply(result);
                    }
                    Some(FlowCommand::SkipRemaining) => {
                        let result = self.controller.skip_remaining();
                        self.apply(result);
                    }
                    None => commands_open = false,
                },
            }
        };

        self.in_flight = None;
        let projection = self.controller.projection();
        info!(
            resolved = projection.resolved,
            total = projection.total,
            cancelled,
            "Flow finished"
        );
        Ok(FlowReport {
            run_id,
            projection,
            cancelled,
        })
    }

    fn settle_attempt(&mut self, attempt_id: AttemptId, joined: Result<Outcome, JoinError>) {
        let outcome = joined.unwrap_or_else(|e| {
            warn!(attempt_id, error = %e, "Attempt task ended abnormally");
            Outcome::Error(AttemptError::WindowClosed)
        });
        let delay = if outcome.is_success() {
            self.auto_advance_delay
        } else {
            Duration::ZERO
        };

        match self.controller.advance(attempt_id, outcome) {
            Ok(ticket) => self.launch(ticket, delay),
            Err(rejection) => debug!(%rejection, "Attempt outcome ignored"),
        }
    }

    fn apply(&mut self, result: Result<Option<AttemptTicket>, Rejection>) {
        self.abandon_stale_attempt();
        match result {
            Ok(ticket) => self.launch(ticket, Duration::ZERO),
            Err(rejection) => info!(%rejection, "Command ignored"),
        }
    }

    /// Abort the running attempt if the controller no longer considers it in flight.
    fn abandon_stale_attempt(&mut self) {
        if let Some(in_flight) = &self.in_flight
            && Some(in_flight.attempt_id) != self.controller.in_flight()
        {
            debug!(
                attempt_id = in_flight.attempt_id,
                service = %in_flight.service,
                "Abandoning attempt"
            );
            self.in_flight = None;
        }
    }

    fn launch(&mut self, ticket: Option<AttemptTicket>, delay: Duration) {
        let Some(ticket) = ticket else {
            return;
        };

        let attempts = self.attempts.clone();
        let service = ticket.service;
        let service_id = service.id().clone();
        debug!(attempt_id = ticket.attempt_id, service = %service_id, ?delay, "Scheduling attempt");

        let task = tokio::spawn(
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempts.attempt(&service).await
            }
            .in_current_span(),
        );

        self.in_flight = Some(InFlight {
            attempt_id: ticket.attempt_id,
            service: service_id,
            task,
        });
    }
}

async fn join_in_flight(in_flight: &mut Option<InFlight>) -> (AttemptId, Result<Outcome, JoinError>) {
    match in_flight {
        Some(in_flight) => (in_flight.attempt_id, (&mut in_flight.task).await),
        None => std::future::pending().await,
    }
}
