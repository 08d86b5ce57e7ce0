use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{CompletionEvidence, IssueId, IssueReport, IssueStatus, PriorityAssessment};
use super::repository::{IssueRepository, RepositoryError, StatusNotice, StatusNotifier};

impl IssueStatus {
    /// Resolved, rejected and closed issues accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            IssueStatus::Resolved | IssueStatus::Rejected | IssueStatus::Closed
        )
    }

    pub const fn can_transition_to(self, target: IssueStatus) -> bool {
        use IssueStatus::*;
        match (self, target) {
            (Reported, Acknowledged)
            | (Reported, Assigned)
            | (Acknowledged, Assigned)
            | (Acknowledged, InProgress)
            | (Assigned, InProgress)
            | (InProgress, Resolved) => true,
            (from, Rejected | Closed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl IssueReport {
    /// Attach the triage result. An issue is analyzed exactly once.
    pub fn attach_assessment(
        &mut self,
        assessment: PriorityAssessment,
    ) -> Result<(), LifecycleError> {
        if self.assessment.is_some() {
            return Err(LifecycleError::AlreadyAnalyzed(self.id.clone()));
        }
        self.assessment = Some(assessment);
        Ok(())
    }
}

/// Errors surfaced to admin and technician actions.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot move issue from {from} to {to}")]
    InvalidTransition { from: IssueStatus, to: IssueStatus },
    #[error("issue state changed: expected {expected}, found {actual}")]
    StaleState {
        expected: IssueStatus,
        actual: IssueStatus,
    },
    #[error("issue {0} already carries a priority assessment")]
    AlreadyAnalyzed(IssueId),
    #[error("issue {0} has not been analyzed")]
    Unassessed(IssueId),
    #[error("completion evidence requires a resolved issue (currently {status})")]
    NotResolved { status: IssueStatus },
    #[error("completion evidence already submitted for issue {0}")]
    EvidenceAlreadySubmitted(IssueId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// State machine guarding every status change of a reported issue.
pub struct IssueLifecycle<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
}

impl<R, N> IssueLifecycle<R, N>
where
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Persist a freshly reported issue together with its one-time assessment.
    pub fn open(
        &self,
        mut issue: IssueReport,
        assessment: PriorityAssessment,
    ) -> Result<IssueReport, LifecycleError> {
        issue.attach_assessment(assessment)?;
        let stored = self.repository.insert(issue)?;
        info!(
            issue_id = %stored.id,
            priority = stored.priority(),
            "issue reported"
        );
        Ok(stored)
    }

    /// Move an issue to `target`, provided it is still in `expected` when written.
    pub fn transition(
        &self,
        id: &IssueId,
        target: IssueStatus,
        expected: IssueStatus,
    ) -> Result<IssueReport, LifecycleError> {
        let issue = self.load_for_transition(id, target, expected)?;
        let stored = self.commit(issue, target)?;
        self.announce("issue_status_changed", &stored, expected);
        Ok(stored)
    }

    /// Record the technician and move the issue to `assigned`.
    pub fn assign(
        &self,
        id: &IssueId,
        technician_id: &str,
        expected: IssueStatus,
    ) -> Result<IssueReport, LifecycleError> {
        let mut issue = self.load_for_transition(id, IssueStatus::Assigned, expected)?;
        issue.assignee = Some(technician_id.trim().to_string());
        let stored = self.commit(issue, IssueStatus::Assigned)?;
        self.announce("issue_assigned", &stored, expected);
        Ok(stored)
    }

    /// Attach technician evidence to a resolved issue. The status does not change.
    pub fn submit_completion(
        &self,
        id: &IssueId,
        evidence: CompletionEvidence,
    ) -> Result<IssueReport, LifecycleError> {
        let mut issue = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if issue.status != IssueStatus::Resolved {
            return Err(LifecycleError::NotResolved {
                status: issue.status,
            });
        }
        if issue.completion.is_some() {
            return Err(LifecycleError::EvidenceAlreadySubmitted(issue.id));
        }

        issue.completion = Some(evidence);
        let stored = self.commit(issue, IssueStatus::Resolved)?;
        self.announce("issue_completion_submitted", &stored, IssueStatus::Resolved);
        Ok(stored)
    }

    fn load_for_transition(
        &self,
        id: &IssueId,
        target: IssueStatus,
        expected: IssueStatus,
    ) -> Result<IssueReport, LifecycleError> {
        let issue = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if issue.assessment.is_none() {
            return Err(LifecycleError::Unassessed(issue.id));
        }
        if issue.status != expected {
            return Err(LifecycleError::StaleState {
                expected,
                actual: issue.status,
            });
        }
        if !issue.status.can_transition_to(target) {
            return Err(LifecycleError::InvalidTransition {
                from: issue.status,
                to: target,
            });
        }

        Ok(issue)
    }

    fn commit(
        &self,
        mut issue: IssueReport,
        target: IssueStatus,
    ) -> Result<IssueReport, LifecycleError> {
        let expected_status = issue.status;
        let expected_version = issue.version;
        let id = issue.id.clone();

        issue.status = target;
        issue.version = expected_version + 1;
        issue.updated_at = Utc::now();

        match self.repository.replace(issue, expected_version) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::VersionMismatch { .. }) => {
                let actual = self
                    .repository
                    .fetch(&id)?
                    .map(|current| current.status)
                    .unwrap_or(expected_status);
                warn!(issue_id = %id, %expected_status, %actual, "lost concurrent update");
                Err(LifecycleError::StaleState {
                    expected: expected_status,
                    actual,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    fn announce(&self, template: &str, issue: &IssueReport, from: IssueStatus) {
        let mut details = BTreeMap::new();
        if let Some(priority) = issue.priority() {
            details.insert("priority".to_string(), priority.to_string());
        }
        if let Some(assignee) = &issue.assignee {
            details.insert("assignee".to_string(), assignee.clone());
        }
        details.insert("title".to_string(), issue.title.clone());

        let notice = StatusNotice {
            template: template.to_string(),
            issue_id: issue.id.clone(),
            from,
            to: issue.status,
            details,
        };

        info!(issue_id = %issue.id, %from, to = %issue.status, template, "issue updated");
        if let Err(err) = self.notifier.notify(notice) {
            warn!(issue_id = %issue.id, error = %err, "status notification failed");
        }
    }
}
