use civic_triage::workflows::triage::{
    IssueId, IssueReport, IssueRepository, NotifyError, RepositoryError, StatusNotice,
    StatusNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local issue store. `replace` is a compare-and-swap on the record version.
#[derive(Default, Clone)]
pub(crate) struct InMemoryIssueRepository {
    records: Arc<Mutex<HashMap<IssueId, IssueReport>>>,
}

impl IssueRepository for InMemoryIssueRepository {
    fn insert(&self, issue: IssueReport) -> Result<IssueReport, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&issue.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(issue.id.clone(), issue.clone());
        Ok(issue)
    }

    fn fetch(&self, id: &IssueId) -> Result<Option<IssueReport>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn replace(
        &self,
        issue: IssueReport,
        expected_version: u64,
    ) -> Result<IssueReport, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let found = match guard.get(&issue.id) {
            Some(stored) => stored.version,
            None => return Err(RepositoryError::NotFound),
        };
        if found != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                found,
            });
        }
        guard.insert(issue.id.clone(), issue.clone());
        Ok(issue)
    }

    fn list(&self) -> Result<Vec<IssueReport>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Writes status notices to the log instead of a messaging gateway.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingStatusNotifier;

impl StatusNotifier for TracingStatusNotifier {
    fn notify(&self, notice: StatusNotice) -> Result<(), NotifyError> {
        info!(
            template = %notice.template,
            issue_id = %notice.issue_id,
            from = %notice.from,
            to = %notice.to,
            details = ?notice.details,
            "status notice"
        );
        Ok(())
    }
}
