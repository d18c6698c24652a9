//! Read-only view of a flow for display code.
//!
//! Derived from controller state on demand; holds no lifecycle logic.

use serde::Serialize;

use super::state::{AttemptState, AttemptStatus, FlowCursor};
use crate::service::{ServiceEntry, ServiceId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceView {
    pub id: ServiceId,
    pub display_name: String,
    pub status: AttemptStatus,
    pub error: Option<String>,
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowProjection {
    pub services: Vec<ServiceView>,
    /// Succeeded plus skipped services.
    pub resolved: usize,
    pub total: usize,
    pub is_complete: bool,
}

impl FlowProjection {
    pub fn derive(
        services: &[ServiceEntry],
        states: &[AttemptState],
        skipped: &[bool],
        cursor: FlowCursor,
    ) -> Self {
        let views: Vec<ServiceView> = services
            .iter()
            .zip(states)
            .zip(skipped)
            .map(|((entry, state), &skipped)| ServiceView {
                id: entry.id().clone(),
                display_name: entry.display_name().to_string(),
                status: state.status(),
                error: state.error_message().map(str::to_string),
                skipped,
            })
            .collect();

        let resolved = views
            .iter()
            .filter(|v| v.status == AttemptStatus::Success || v.skipped)
            .count();

        Self {
            resolved,
            total: views.len(),
            is_complete: cursor.index() >= views.len(),
            services: views,
        }
    }

    /// Fraction of services resolved, in `0.0..=1.0`. An empty flow is fully resolved.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.resolved as f64 / self.total as f64
        }
    }

    pub fn service(&self, id: &ServiceId) -> Option<&ServiceView> {
        self.services.iter().find(|v| &v.id == id)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ServiceView> {
        self.services
            .iter()
            .filter(|v| v.status == AttemptStatus::Success)
    }

    /// Services that ended the flow without succeeding.
    pub fn unresolved(&self) -> impl Iterator<Item = &ServiceView> {
        self.services
            .iter()
            .filter(|v| v.status != AttemptStatus::Success)
    }
}
