//! Service identity and per-flow service entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of an external service within one flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ServiceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for ServiceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ServiceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One service selected for a flow. Immutable once the flow starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    id: ServiceId,
    display_name: String,
    requires_external_auth: bool,
}

impl ServiceEntry {
    /// Create an entry that needs an external authorization handshake.
    pub fn new(id: impl Into<ServiceId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            requires_external_auth: true,
        }
    }

    /// Set whether the service needs the external handshake at all.
    pub fn with_external_auth(mut self, required: bool) -> Self {
        self.requires_external_auth = required;
        self
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn requires_external_auth(&self) -> bool {
        self.requires_external_auth
    }
}
