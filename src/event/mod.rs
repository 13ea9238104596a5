//! Lifecycle event model consumed by all providers.
//!
//! Events are produced elsewhere (a reconciliation controller) and are
//! read-only once handed to a provider. Metadata is a flat string map;
//! a couple of keys are reserved and carry routing instructions for the
//! commit-status provider.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key holding the VCS revision an event refers to.
pub const REVISION_KEY: &str = "revision";

/// Metadata key carrying a commit-status routing instruction.
pub const COMMIT_STATUS_KEY: &str = "commitStatus";

/// Value of [`COMMIT_STATUS_KEY`] requesting an update of a previously
/// posted status instead of the creation of a new one.
pub const COMMIT_STATUS_UPDATE_VALUE: &str = "update";

/// Event severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// Identity of the object an event is about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

/// A single lifecycle event to be delivered as one outbound request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub severity: Severity,
    pub involved_object: ObjectRef,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub timestamp: jiff::Timestamp,
}

impl Event {
    /// Returns the metadata value for `key`, if present.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Returns true when the metadata holds exactly `value` under `key`.
    pub fn has_metadata(&self, key: &str, value: &str) -> bool {
        self.metadata_value(key) == Some(value)
    }

    /// Extracts the bare hash from the `revision` metadata entry.
    ///
    /// Revisions arrive in a few shapes: a bare hash, `<branch>/<hash>`,
    /// or `<branch>@sha1:<hash>`. The trailing hash component is returned
    /// in all cases.
    pub fn revision_hash(&self) -> Option<&str> {
        let rev = self.metadata_value(REVISION_KEY)?;
        let rev = rev.rsplit('/').next().unwrap_or(rev);
        let rev = rev.rsplit(':').next().unwrap_or(rev);
        if rev.is_empty() { None } else { Some(rev) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with_revision(rev: &str) -> Event {
        Event {
            severity: Severity::Info,
            involved_object: ObjectRef::default(),
            message: String::new(),
            metadata: HashMap::from([(REVISION_KEY.to_string(), rev.to_string())]),
            timestamp: jiff::Timestamp::now(),
        }
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Info).unwrap(), "\"info\"");
        assert_eq!(
            serde_json::to_string(&Severity::Error).unwrap(),
            "\"error\""
        );
    }

    #[test]
    fn test_revision_hash_bare() {
        let event = event_with_revision("79f81d");
        assert_eq!(event.revision_hash(), Some("79f81d"));
    }

    #[test]
    fn test_revision_hash_branch_slash() {
        let event = event_with_revision("main/79f81d");
        assert_eq!(event.revision_hash(), Some("79f81d"));
    }

    #[test]
    fn test_revision_hash_named_digest() {
        let event = event_with_revision("main@sha1:79f81d");
        assert_eq!(event.revision_hash(), Some("79f81d"));
    }

    #[test]
    fn test_revision_hash_missing() {
        let mut event = event_with_revision("x");
        event.metadata.clear();
        assert_eq!(event.revision_hash(), None);
    }

    #[test]
    fn test_has_metadata() {
        let mut event = event_with_revision("x");
        event.metadata.insert(
            COMMIT_STATUS_KEY.to_string(),
            COMMIT_STATUS_UPDATE_VALUE.to_string(),
        );
        assert!(event.has_metadata(COMMIT_STATUS_KEY, COMMIT_STATUS_UPDATE_VALUE));
        assert!(!event.has_metadata(COMMIT_STATUS_KEY, "create"));
    }
}
