//! Append-only record of service outcomes across runs.
//!
//! Line format: `service|status|detail|rfc3339-timestamp`. `detail` is empty
//! for successes and holds the error code otherwise.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::errors::AttemptError;
use crate::flow::{AttemptStatus, FlowObserver};
use crate::service::ServiceId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub service: String,
    pub status: AttemptStatus,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl JournalEntry {
    fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != 4 {
            return None;
        }
        Some(Self {
            service: parts[0].to_string(),
            status: parts[1].parse().ok()?,
            detail: Some(parts[2]).filter(|d| !d.is_empty()).map(str::to_string),
            timestamp: DateTime::parse_from_rfc3339(parts[3])
                .ok()?
                .with_timezone(&Utc),
        })
    }
}

pub struct Journal {
    state_file: PathBuf,
}

impl Journal {
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.state_file
    }

    pub fn record(&self, service: &str, status: AttemptStatus, detail: Option<&str>) -> Result<()> {
        let entry = format!(
            "{}|{}|{}|{}\n",
            sanitize(service),
            status,
            detail.map(sanitize).unwrap_or_default(),
            Utc::now().to_rfc3339()
        );

        if let Some(parent) = self.state_file.parent() {
            fs::create_dir_all(parent).context("Failed to create journal directory")?;
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.state_file)
            .context("Failed to open journal")?
            .write_all(entry.as_bytes())
            .context("Failed to write journal entry")?;

        Ok(())
    }

    /// All readable entries, oldest first. Malformed lines are skipped.
    pub fn entries(&self) -> Result<Vec<JournalEntry>> {
        if !self.state_file.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.state_file).context("Failed to read journal")?;
        Ok(content.lines().filter_map(JournalEntry::parse).collect())
    }

    /// Most recent entry per service, in order of first appearance.
    pub fn latest(&self) -> Result<Vec<JournalEntry>> {
        let mut latest: Vec<JournalEntry> = Vec::new();
        for entry in self.entries()? {
            match latest.iter_mut().find(|e| e.service == entry.service) {
                Some(existing) => *existing = entry,
                None => latest.push(entry),
            }
        }
        Ok(latest)
    }

    /// Services whose latest entry is a success.
    pub fn connected(&self) -> Result<Vec<String>> {
        Ok(self
            .latest()?
            .into_iter()
            .filter(|e| e.status == AttemptStatus::Success)
            .map(|e| e.service)
            .collect())
    }

    pub fn reset(&self) -> Result<()> {
        if self.state_file.exists() {
            fs::remove_file(&self.state_file).context("Failed to remove journal")?;
        }
        Ok(())
    }
}

fn sanitize(value: &str) -> String {
    value.replace(['|', '\n', '\r'], " ")
}

/// Writes every terminal status change to a [`Journal`].
pub struct JournalObserver {
    journal: Journal,
}

impl JournalObserver {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl FlowObserver for JournalObserver {
    fn service_status_changed(
        &self,
        service: &ServiceId,
        status: AttemptStatus,
        error: Option<&AttemptError>,
    ) {
        if !matches!(status, AttemptStatus::Success | AttemptStatus::Error) {
            return;
        }
        if let Err(e) = self
            .journal
            .record(service.as_str(), status, error.map(AttemptError::code))
        {
            warn!(service = %service, error = %e, "Failed to journal service outcome");
        }
    }

    fn progress(&self, _: usize, _: usize) {}

    fn flow_complete(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_and_read_back() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join(".authflow").join("state"));

        journal.record("github", AttemptStatus::Success, None).unwrap();
        journal
            .record("slack", AttemptStatus::Error, Some("window_closed"))
            .unwrap();

        let entries = journal.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].service, "github");
        assert_eq!(entries[0].detail, None);
        assert_eq!(entries[1].status, AttemptStatus::Error);
        assert_eq!(entries[1].detail.as_deref(), Some("window_closed"));
    }

    #[test]
    fn test_latest_keeps_most_recent_per_service() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("state"));

        journal
            .record("slack", AttemptStatus::Error, Some("popup_blocked"))
            .unwrap();
        journal.record("jira", AttemptStatus::Success, None).unwrap();
        journal.record("slack", AttemptStatus::Success, None).unwrap();

        let latest = journal.latest().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].service, "slack");
        assert_eq!(latest[0].status, AttemptStatus::Success);
        assert_eq!(journal.connected().unwrap(), vec!["slack", "jira"]);
    }

    #[test]
    fn test_provider_text_cannot_break_line_format() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("state"));
        journal
            .record("asana", AttemptStatus::Error, Some("bad|state\nvalue"))
            .unwrap();

        let entries = journal.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detail.as_deref(), Some("bad state value"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");
        fs::write(
            &path,
            "garbage\ngithub|success||2026-01-02T03:04:05+00:00\nx|unknown||2026-01-02T03:04:05+00:00\n",
        )
        .unwrap();

        let entries = Journal::new(path).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].service, "github");
    }

    #[test]
    fn test_missing_journal_is_empty_and_reset_is_idempotent() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("state"));
        assert!(journal.entries().unwrap().is_empty());
        journal.reset().unwrap();

        journal.record("a", AttemptStatus::Success, None).unwrap();
        journal.reset().unwrap();
        assert!(journal.entries().unwrap().is_empty());
    }

    #[test]
    fn test_observer_records_only_terminal_statuses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");
        let observer = JournalObserver::new(Journal::new(path.clone()));
        let id = ServiceId::from("google");

        observer.service_status_changed(&id, AttemptStatus::Pending, None);
        observer.service_status_changed(&id, AttemptStatus::Authorizing, None);
        observer.service_status_changed(
            &id,
            AttemptStatus::Error,
            Some(&AttemptError::ProviderReported("access_denied".into())),
        );
        observer.service_status_changed(&id, AttemptStatus::Success, None);

        let entries = Journal::new(path).entries().unwrap();
        let statuses: Vec<_> = entries.iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![AttemptStatus::Error, AttemptStatus::Success]);
        assert_eq!(entries[0].detail.as_deref(), Some("access_denied"));
    }
}
