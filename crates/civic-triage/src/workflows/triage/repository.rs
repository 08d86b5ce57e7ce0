use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{IssueId, IssueReport, IssueStatus};

/// Storage abstraction so the lifecycle controller can be exercised in isolation.
///
/// `replace` is a compare-and-swap: it must only succeed while the stored record still
/// carries `expected_version`, and the check and write must happen atomically per issue.
pub trait IssueRepository: Send + Sync {
    fn insert(&self, issue: IssueReport) -> Result<IssueReport, RepositoryError>;
    fn fetch(&self, id: &IssueId) -> Result<Option<IssueReport>, RepositoryError>;
    fn replace(
        &self,
        issue: IssueReport,
        expected_version: u64,
    ) -> Result<IssueReport, RepositoryError>;
    /// Every stored issue, in no particular order.
    fn list(&self) -> Result<Vec<IssueReport>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    VersionMismatch { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound status-change hook (e.g. WhatsApp or e-mail adapters). Delivery is the
/// adapter's concern.
pub trait StatusNotifier: Send + Sync {
    fn notify(&self, notice: StatusNotice) -> Result<(), NotifyError>;
}

/// Payload describing one lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub template: String,
    pub issue_id: IssueId,
    pub from: IssueStatus,
    pub to: IssueStatus,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
