//! Authorization target resolution.

use reqwest::Url;
use std::collections::HashMap;
use tracing::warn;

use crate::errors::AttemptError;
use crate::service::{ServiceEntry, ServiceId};

/// Supplies the per-service login endpoint. `None` means no target is configured.
pub trait TargetResolver: Send + Sync {
    fn resolve(&self, service: &ServiceEntry) -> Option<String>;
}

impl<F> TargetResolver for F
where
    F: Fn(&ServiceEntry) -> Option<String> + Send + Sync,
{
    fn resolve(&self, service: &ServiceEntry) -> Option<String> {
        self(service)
    }
}

/// Fixed map of service id to login endpoint.
#[derive(Debug, Clone, Default)]
pub struct StaticTargetResolver {
    targets: HashMap<ServiceId, String>,
}

impl StaticTargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, service: impl Into<ServiceId>, base_url: impl Into<String>) -> Self {
        self.insert(service, base_url);
        self
    }

    pub fn insert(&mut self, service: impl Into<ServiceId>, base_url: impl Into<String>) {
        self.targets.insert(service.into(), base_url.into());
    }
}

impl TargetResolver for StaticTargetResolver {
    fn resolve(&self, service: &ServiceEntry) -> Option<String> {
        self.targets
            .get(service.id())
            .filter(|url| !url.trim().is_empty())
            .cloned()
    }
}

/// Append `user_id` and `state=<service id>` to the login endpoint.
///
/// `state` only correlates the completion message back to the window; it
/// carries no authority.
pub fn build_target_url(
    base_url: &str,
    user_id: &str,
    service: &ServiceId,
) -> Result<Url, AttemptError> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| {
        warn!(service = %service, base_url, error = %e, "Login endpoint is not a valid URL");
        AttemptError::NoTargetConfigured
    })?;
    url.query_pairs_mut()
        .append_pair("user_id", user_id)
        .append_pair("state", service.as_str());
    Ok(url)
}
