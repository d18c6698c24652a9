//! Sequencing state machine for a multi-service authorization flow.
//!
//! The controller owns the ordered service list, per-service state and the
//! cursor. It never performs I/O: every transition that needs an attempt
//! returns an [`AttemptTicket`] for the caller to execute, and the outcome is
//! fed back through [`FlowController::advance`].
//!
//! Invariants:
//! - at most one service is `Authorizing` at any instant (the cursor guard);
//! - a service never leaves `Success`;
//! - `flow_complete` fires exactly once per `start`.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::observer::FlowObserver;
use super::projection::FlowProjection;
use super::state::{AttemptState, AttemptStatus, FlowCursor};
use crate::attempt::Outcome;
use crate::errors::AttemptError;
use crate::service::{ServiceEntry, ServiceId};

/// Monotonic identifier of one attempt. Outcomes tagged with an older id are stale.
pub type AttemptId = u64;

/// Instruction to run one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTicket {
    pub attempt_id: AttemptId,
    pub service: ServiceEntry,
}

/// Why a controller operation was ignored. Never fatal to the flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("An attempt is already in flight")]
    GuardHeld,

    #[error("Service '{0}' is not part of this flow")]
    UnknownService(ServiceId),

    #[error("Service '{service}' is {status}; only failed services can be retried")]
    NotInError {
        service: ServiceId,
        status: AttemptStatus,
    },

    #[error("Service '{0}' already succeeded")]
    AlreadySucceeded(ServiceId),

    #[error("Flow already completed")]
    FlowComplete,

    #[error("Attempt {0} is not the attempt in flight")]
    StaleAttempt(AttemptId),

    #[error("Service '{0}' appears more than once")]
    DuplicateService(ServiceId),
}

pub struct FlowController {
    services: Vec<ServiceEntry>,
    states: Vec<AttemptState>,
    skipped: Vec<bool>,
    cursor: FlowCursor,
    in_flight: Option<AttemptId>,
    last_attempt_id: AttemptId,
    started: bool,
    completed: bool,
    observer: Arc<dyn FlowObserver>,
}

impl FlowController {
    pub fn new(observer: Arc<dyn FlowObserver>) -> Self {
        Self {
            services: Vec::new(),
            states: Vec::new(),
            skipped: Vec::new(),
            cursor: FlowCursor::default(),
            in_flight: None,
            last_attempt_id: 0,
            started: false,
            completed: false,
            observer,
        }
    }

    /// Reset every entry to `Pending` and begin with the first service.
    ///
    /// An empty list completes immediately.
    pub fn start(
        &mut self,
        services: Vec<ServiceEntry>,
    ) -> Result<Option<AttemptTicket>, Rejection> {
        if self.cursor.guard {
            warn!("Ignoring start: an attempt is already in flight");
            return Err(Rejection::GuardHeld);
        }

        let mut seen = HashSet::new();
        for entry in &services {
            if !seen.insert(entry.id()) {
                return Err(Rejection::DuplicateService(entry.id().clone()));
            }
        }

        self.states = vec![AttemptState::default(); services.len()];
        self.skipped = vec![false; services.len()];
        self.services = services;
        self.cursor = FlowCursor::default();
        self.in_flight = None;
        self.started = true;
        self.completed = false;

        info!(services = self.services.len(), "Starting authorization flow");
        for entry in &self.services {
            self.observer
                .service_status_changed(entry.id(), AttemptStatus::Pending, None);
        }
        self.emit_progress();

        Ok(self.drive())
    }

    /// Apply the terminal outcome of the attempt in flight.
    pub fn advance(
        &mut self,
        attempt_id: AttemptId,
        outcome: Outcome,
    ) -> Result<Option<AttemptTicket>, Rejection> {
        if self.in_flight != Some(attempt_id) {
            debug!(attempt_id, "Ignoring outcome of stale attempt");
            return Err(Rejection::StaleAttempt(attempt_id));
        }

        let index = self.cursor.index;
        self.in_flight = None;
        self.cursor.guard = false;

        match outcome {
            Outcome::Success => {
                info!(service = %self.services[index].id(), "Service authorized");
                self.set_status(index, AttemptStatus::Success, None);
                self.cursor.index += 1;
            }
            Outcome::Error(error) => {
                warn!(
                    service = %self.services[index].id(),
                    error = %error.code(),
                    "Authorization attempt failed"
                );
                self.set_status(index, AttemptStatus::Error, Some(error));
            }
        }

        Ok(self.drive())
    }

    /// Re-run a failed service. Only valid while it is in `Error`.
    pub fn retry(&mut self, service: &ServiceId) -> Result<Option<AttemptTicket>, Rejection> {
        let index = self.index_of(service)?;
        if self.completed {
            return Err(Rejection::FlowComplete);
        }
        if self.cursor.guard {
            warn!(service = %service, "Ignoring retry: an attempt is already in flight");
            return Err(Rejection::GuardHeld);
        }

        let status = self.states[index].status;
        if status != AttemptStatus::Error {
            info!(service = %service, status = %status, "Ignoring retry of service not in error");
            return Err(Rejection::NotInError {
                service: service.clone(),
                status,
            });
        }

        info!(service = %service, "Retrying service");
        self.skipped[index] = false;
        self.cursor.index = index;
        self.set_status(index, AttemptStatus::Pending, None);

        Ok(self.drive())
    }

    /// Move past a service without it reaching `Success`.
    ///
    /// Skipping the service in flight abandons that attempt: its status goes
    /// back to `Pending` and its eventual outcome is stale.
    pub fn skip(&mut self, service: &ServiceId) -> Result<Option<AttemptTicket>, Rejection> {
        let index = self.index_of(service)?;
        if self.completed {
            return Err(Rejection::FlowComplete);
        }
        if self.states[index].status.is_terminal() {
            return Err(Rejection::AlreadySucceeded(service.clone()));
        }

        self.skip_index(index);
        Ok(self.drive())
    }

    /// Skip every service that has not succeeded, in list order.
    pub fn skip_remaining(&mut self) -> Result<Option<AttemptTicket>, Rejection> {
        if self.completed {
            return Err(Rejection::FlowComplete);
        }

        for index in 0..self.services.len() {
            if !self.states[index].status.is_terminal() && !self.skipped[index] {
                self.skip_index(index);
            }
        }
        Ok(self.drive())
    }

    pub fn services(&self) -> &[ServiceEntry] {
        &self.services
    }

    pub fn state(&self, service: &ServiceId) -> Option<&AttemptState> {
        self.position(service).map(|index| &self.states[index])
    }

    pub fn is_skipped(&self, service: &ServiceId) -> bool {
        self.position(service)
            .map(|index| self.skipped[index])
            .unwrap_or(false)
    }

    pub fn cursor(&self) -> FlowCursor {
        self.cursor
    }

    /// Id of the attempt currently holding the guard.
    pub fn in_flight(&self) -> Option<AttemptId> {
        self.in_flight
    }

    /// Cursor has passed the last entry.
    pub fn is_complete(&self) -> bool {
        self.started && self.cursor.index >= self.services.len()
    }

    /// `flow_complete` has been emitted.
    pub fn has_finished(&self) -> bool {
        self.completed
    }

    /// Waiting for a retry or skip of a failed service.
    pub fn is_paused(&self) -> bool {
        self.started && !self.completed && !self.cursor.guard
    }

    pub fn projection(&self) -> FlowProjection {
        FlowProjection::derive(&self.services, &self.states, &self.skipped, self.cursor)
    }

    fn index_of(&self, service: &ServiceId) -> Result<usize, Rejection> {
        self.position(service)
            .ok_or_else(|| Rejection::UnknownService(service.clone()))
    }

    fn position(&self, service: &ServiceId) -> Option<usize> {
        self.services.iter().position(|entry| entry.id() == service)
    }

    fn skip_index(&mut self, index: usize) {
        info!(service = %self.services[index].id(), "Skipping service");
        self.skipped[index] = true;

        if self.states[index].status == AttemptStatus::Authorizing {
            self.in_flight = None;
            self.cursor.guard = false;
            self.set_status(index, AttemptStatus::Pending, None);
        } else {
            self.emit_progress();
        }

        if index == self.cursor.index {
            self.cursor.index += 1;
        }
    }

    /// Walk the cursor forward until an attempt is needed, a failed service
    /// blocks progress, or the list is exhausted.
    fn drive(&mut self) -> Option<AttemptTicket> {
        if self.cursor.guard || self.completed || !self.started {
            return None;
        }

        while self.cursor.index < self.services.len() {
            let index = self.cursor.index;

            if self.skipped[index] || self.states[index].status == AttemptStatus::Success {
                self.cursor.index += 1;
                continue;
            }

            if !self.services[index].requires_external_auth() {
                debug!(service = %self.services[index].id(), "No external authorization required");
                self.set_status(index, AttemptStatus::Success, None);
                self.cursor.index += 1;
                continue;
            }

            if self.states[index].status == AttemptStatus::Error {
                debug!(service = %self.services[index].id(), "Flow paused on failed service");
                return None;
            }

            self.last_attempt_id += 1;
            let attempt_id = self.last_attempt_id;
            self.in_flight = Some(attempt_id);
            self.cursor.guard = true;
            self.set_status(index, AttemptStatus::Authorizing, None);

            return Some(AttemptTicket {
                attempt_id,
                service: self.services[index].clone(),
            });
        }

        self.finish();
        None
    }

    fn finish(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        let projection = self.projection();
        info!(
            resolved = projection.resolved,
            total = projection.total,
            "Authorization flow complete"
        );
        self.observer.flow_complete();
    }

    fn set_status(&mut self, index: usize, status: AttemptStatus, error: Option<AttemptError>) {
        let state = &mut self.states[index];
        state.status = status;
        state.error = error;
        self.observer.service_status_changed(
            self.services[index].id(),
            status,
            self.states[index].error.as_ref(),
        );
        self.emit_progress();
    }

    fn emit_progress(&self) {
        let projection = self.projection();
        self.observer.progress(projection.resolved, projection.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::observer::recording::RecordingObserver;

    fn controller() -> (FlowController, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (FlowController::new(observer.clone()), observer)
    }

    fn entry(id: &str) -> ServiceEntry {
        ServiceEntry::new(id, id.to_uppercase())
    }

    fn id(value: &str) -> ServiceId {
        ServiceId::from(value)
    }

    fn authorizing_count(ctrl: &FlowController) -> usize {
        ctrl.services()
            .iter()
            .filter(|e| ctrl.state(e.id()).unwrap().status() == AttemptStatus::Authorizing)
            .count()
    }

    #[test]
    fn empty_list_completes_immediately() {
        let (mut ctrl, observer) = controller();
        let ticket = ctrl.start(Vec::new()).unwrap();
        assert!(ticket.is_none());
        assert!(ctrl.is_complete());
        assert!(ctrl.has_finished());
        assert_eq!(observer.completions(), 1);
    }

    #[test]
    fn start_issues_ticket_for_first_service() {
        let (mut ctrl, observer) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        assert_eq!(ticket.service.id(), &id("a"));
        assert_eq!(ticket.attempt_id, 1);
        assert!(ctrl.cursor().guard());
        assert_eq!(ctrl.state(&id("a")).unwrap().status(), AttemptStatus::Authorizing);
        assert_eq!(ctrl.state(&id("b")).unwrap().status(), AttemptStatus::Pending);
        assert_eq!(observer.last_progress(), Some((0, 2)));
    }

    #[test]
    fn start_rejects_duplicate_ids() {
        let (mut ctrl, _) = controller();
        let result = ctrl.start(vec![entry("a"), entry("a")]);
        assert_eq!(result, Err(Rejection::DuplicateService(id("a"))));
    }

    #[test]
    fn services_without_external_auth_resolve_without_attempt() {
        let (mut ctrl, observer) = controller();
        let services = vec![
            entry("a"),
            ServiceEntry::new("b", "B").with_external_auth(false),
        ];
        let ticket = ctrl.start(services).unwrap().unwrap();
        assert_eq!(ticket.service.id(), &id("a"));

        let next = ctrl.advance(ticket.attempt_id, Outcome::Success).unwrap();
        assert!(next.is_none());
        assert_eq!(ctrl.state(&id("b")).unwrap().status(), AttemptStatus::Success);
        assert_eq!(observer.statuses_for("b"), vec![AttemptStatus::Pending, AttemptStatus::Success]);
        assert_eq!(observer.completions(), 1);
        assert_eq!(observer.last_progress(), Some((2, 2)));
    }

    #[test]
    fn leading_no_auth_services_are_passed_on_start() {
        let (mut ctrl, _) = controller();
        let services = vec![
            ServiceEntry::new("cloudabis", "CloudABIS").with_external_auth(false),
            entry("github"),
        ];
        let ticket = ctrl.start(services).unwrap().unwrap();
        assert_eq!(ticket.service.id(), &id("github"));
        assert_eq!(ctrl.cursor().index(), 1);
    }

    #[test]
    fn success_advances_to_next_service() {
        let (mut ctrl, _) = controller();
        let first = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        let second = ctrl.advance(first.attempt_id, Outcome::Success).unwrap().unwrap();
        assert_eq!(second.service.id(), &id("b"));
        assert_eq!(second.attempt_id, 2);
        assert_eq!(authorizing_count(&ctrl), 1);
    }

    #[test]
    fn error_pauses_flow_on_failed_service() {
        let (mut ctrl, observer) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        let next = ctrl
            .advance(ticket.attempt_id, Outcome::Error(AttemptError::WindowClosed))
            .unwrap();
        assert!(next.is_none());
        assert!(ctrl.is_paused());
        assert!(!ctrl.cursor().guard());
        assert_eq!(ctrl.cursor().index(), 0);
        let state = ctrl.state(&id("a")).unwrap();
        assert_eq!(state.status(), AttemptStatus::Error);
        assert_eq!(state.error_message(), Some("window_closed"));
        assert_eq!(observer.completions(), 0);
    }

    #[test]
    fn stale_outcome_is_ignored() {
        let (mut ctrl, _) = controller();
        let ticket = ctrl.start(vec![entry("a")]).unwrap().unwrap();
        let result = ctrl.advance(ticket.attempt_id + 7, Outcome::Success);
        assert_eq!(result, Err(Rejection::StaleAttempt(ticket.attempt_id + 7)));
        assert_eq!(ctrl.state(&id("a")).unwrap().status(), AttemptStatus::Authorizing);
    }

    #[test]
    fn second_resolution_of_same_attempt_is_a_no_op() {
        let (mut ctrl, observer) = controller();
        let ticket = ctrl.start(vec![entry("a")]).unwrap().unwrap();
        ctrl.advance(ticket.attempt_id, Outcome::Success).unwrap();
        let late = ctrl.advance(
            ticket.attempt_id,
            Outcome::Error(AttemptError::ProviderReported("denied".into())),
        );
        assert!(late.is_err());
        assert_eq!(ctrl.state(&id("a")).unwrap().status(), AttemptStatus::Success);
        assert_eq!(observer.completions(), 1);
    }

    #[test]
    fn retry_on_non_error_service_is_no_op() {
        let (mut ctrl, _) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        ctrl.advance(ticket.attempt_id, Outcome::Success).unwrap();
        let cursor_before = ctrl.cursor();

        // "a" succeeded, "b" is authorizing with the guard held.
        assert_eq!(ctrl.retry(&id("b")), Err(Rejection::GuardHeld));
        assert_eq!(ctrl.cursor(), cursor_before);
        assert_eq!(ctrl.state(&id("b")).unwrap().status(), AttemptStatus::Authorizing);
    }

    #[test]
    fn retry_on_pending_service_reports_status() {
        let (mut ctrl, _) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        ctrl.advance(ticket.attempt_id, Outcome::Error(AttemptError::PopupBlocked))
            .unwrap();
        let cursor_before = ctrl.cursor();

        let result = ctrl.retry(&id("b"));
        assert_eq!(
            result,
            Err(Rejection::NotInError {
                service: id("b"),
                status: AttemptStatus::Pending
            })
        );
        assert_eq!(ctrl.cursor(), cursor_before);
        assert_eq!(ctrl.state(&id("b")).unwrap().status(), AttemptStatus::Pending);
    }

    #[test]
    fn retry_unknown_service_is_rejected() {
        let (mut ctrl, _) = controller();
        ctrl.start(vec![entry("a")]).unwrap();
        assert_eq!(
            ctrl.retry(&id("zzz")),
            Err(Rejection::UnknownService(id("zzz")))
        );
    }

    #[test]
    fn retry_after_error_reissues_attempt_and_clears_error() {
        let (mut ctrl, observer) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        ctrl.advance(ticket.attempt_id, Outcome::Error(AttemptError::WindowClosed))
            .unwrap();

        let retried = ctrl.retry(&id("a")).unwrap().unwrap();
        assert_eq!(retried.service.id(), &id("a"));
        assert!(retried.attempt_id > ticket.attempt_id);
        assert_eq!(ctrl.state(&id("a")).unwrap().error_message(), None);

        let next = ctrl.advance(retried.attempt_id, Outcome::Success).unwrap().unwrap();
        assert_eq!(next.service.id(), &id("b"));
        assert_eq!(
            observer.statuses_for("a"),
            vec![
                AttemptStatus::Pending,
                AttemptStatus::Authorizing,
                AttemptStatus::Error,
                AttemptStatus::Pending,
                AttemptStatus::Authorizing,
                AttemptStatus::Success,
            ]
        );
    }

    #[test]
    fn skip_failed_service_advances_cursor_and_keeps_status() {
        let (mut ctrl, observer) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        ctrl.advance(ticket.attempt_id, Outcome::Error(AttemptError::PopupBlocked))
            .unwrap();

        let next = ctrl.skip(&id("a")).unwrap().unwrap();
        assert_eq!(next.service.id(), &id("b"));
        assert_eq!(ctrl.cursor().index(), 1);
        assert_eq!(ctrl.state(&id("a")).unwrap().status(), AttemptStatus::Error);
        assert!(ctrl.is_skipped(&id("a")));
        assert_eq!(observer.last_progress(), Some((1, 2)));
    }

    #[test]
    fn skipping_every_service_reaches_completion_once() {
        let (mut ctrl, observer) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        ctrl.advance(ticket.attempt_id, Outcome::Error(AttemptError::WindowClosed))
            .unwrap();
        let next = ctrl.skip(&id("a")).unwrap().unwrap();
        ctrl.advance(next.attempt_id, Outcome::Error(AttemptError::WindowClosed))
            .unwrap();
        assert!(ctrl.skip(&id("b")).unwrap().is_none());

        assert!(ctrl.is_complete());
        assert_eq!(observer.completions(), 1);
        assert_eq!(ctrl.skip(&id("b")), Err(Rejection::FlowComplete));
        assert_eq!(ctrl.retry(&id("a")), Err(Rejection::FlowComplete));
        assert_eq!(observer.completions(), 1);
    }

    #[test]
    fn skip_in_flight_service_abandons_attempt() {
        let (mut ctrl, _) = controller();
        let first = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();

        let next = ctrl.skip(&id("a")).unwrap().unwrap();
        assert_eq!(next.service.id(), &id("b"));
        assert_eq!(ctrl.state(&id("a")).unwrap().status(), AttemptStatus::Pending);
        assert_eq!(authorizing_count(&ctrl), 1);

        // Late outcome of the abandoned attempt changes nothing.
        assert!(ctrl.advance(first.attempt_id, Outcome::Success).is_err());
        assert_eq!(ctrl.state(&id("a")).unwrap().status(), AttemptStatus::Pending);
        assert_eq!(ctrl.in_flight(), Some(next.attempt_id));
    }

    #[test]
    fn skip_ahead_of_cursor_is_honoured_later() {
        let (mut ctrl, observer) = controller();
        let first = ctrl
            .start(vec![entry("a"), entry("b"), entry("c")])
            .unwrap()
            .unwrap();
        assert!(ctrl.skip(&id("b")).unwrap().is_none());
        assert_eq!(ctrl.cursor().index(), 0);

        let next = ctrl.advance(first.attempt_id, Outcome::Success).unwrap().unwrap();
        assert_eq!(next.service.id(), &id("c"));
        assert_eq!(observer.statuses_for("b"), vec![AttemptStatus::Pending]);
    }

    #[test]
    fn skip_succeeded_service_is_rejected() {
        let (mut ctrl, _) = controller();
        let ticket = ctrl.start(vec![entry("a"), entry("b")]).unwrap().unwrap();
        ctrl.advance(ticket.attempt_id, Outcome::Success).unwrap();
        assert_eq!(ctrl.skip(&id("a")), Err(Rejection::AlreadySucceeded(id("a"))));
    }

    #[test]
    fn retry_of_skipped_service_rewinds_cursor() {
        let (mut ctrl, _) = controller();
        let a = ctrl
            .start(vec![entry("a"), entry("b"), entry("c")])
            .unwrap()
            .unwrap();
        ctrl.advance(a.attempt_id, Outcome::Error(AttemptError::WindowClosed))
            .unwrap();
        let b = ctrl.skip(&id("a")).unwrap().unwrap();
        ctrl.advance(b.attempt_id, Outcome::Error(AttemptError::PopupBlocked))
            .unwrap();

        let again = ctrl.retry(&id("a")).unwrap().unwrap();
        assert_eq!(again.service.id(), &id("a"));
        assert_eq!(ctrl.cursor().index(), 0);
        assert!(!ctrl.is_skipped(&id("a")));

        // After "a" succeeds the flow stops again at "b", still failed.
        assert!(ctrl.advance(again.attempt_id, Outcome::Success).unwrap().is_none());
        assert_eq!(ctrl.cursor().index(), 1);
        assert!(ctrl.is_paused());
    }

    #[test]
    fn skip_remaining_completes_flow_with_unresolved_services() {
        let (mut ctrl, observer) = controller();
        let a = ctrl
            .start(vec![entry("a"), entry("b"), entry("c")])
            .unwrap()
            .unwrap();
        let b = ctrl.advance(a.attempt_id, Outcome::Success).unwrap().unwrap();

        assert!(ctrl.skip_remaining().unwrap().is_none());
        assert!(ctrl.is_complete());
        assert_eq!(observer.completions(), 1);
        assert_eq!(ctrl.state(&id("b")).unwrap().status(), AttemptStatus::Pending);
        assert_eq!(ctrl.state(&id("c")).unwrap().status(), AttemptStatus::Pending);
        assert!(ctrl.advance(b.attempt_id, Outcome::Success).is_err());
        assert_eq!(observer.last_progress(), Some((3, 3)));
    }

    #[test]
    fn start_rejected_while_attempt_in_flight() {
        let (mut ctrl, _) = controller();
        ctrl.start(vec![entry("a")]).unwrap();
        assert_eq!(ctrl.start(vec![entry("b")]), Err(Rejection::GuardHeld));
        assert_eq!(ctrl.services().len(), 1);
    }

    #[test]
    fn single_flight_holds_across_a_full_run() {
        let (mut ctrl, _) = controller();
        let services: Vec<_> = ["a", "b", "c", "d"].into_iter().map(entry).collect();
        let mut ticket = ctrl.start(services).unwrap();
        let mut round = 0;
        while let Some(current) = ticket {
            assert_eq!(authorizing_count(&ctrl), 1);
            round += 1;
            ticket = if round % 2 == 0 {
                ctrl.advance(current.attempt_id, Outcome::Error(AttemptError::WindowClosed))
                    .unwrap();
                assert_eq!(authorizing_count(&ctrl), 0);
                ctrl.skip(current.service.id()).unwrap()
            } else {
                ctrl.advance(current.attempt_id, Outcome::Success).unwrap()
            };
        }
        assert!(ctrl.has_finished());
    }
}
