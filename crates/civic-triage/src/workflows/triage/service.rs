use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::analyzer::CivicIssueAnalyzer;
use super::domain::{
    CompletionEvidence, IssueId, IssueReport, IssueStatus, IssueSubmission, PhotoArtifact,
};
use super::lifecycle::{IssueLifecycle, LifecycleError};
use super::model::ScoringModel;
use super::repository::{IssueRepository, RepositoryError, StatusNotifier};

/// Service composing the analyzer, lifecycle controller, and repository.
pub struct IssueTriageService<M, R, N> {
    analyzer: Arc<CivicIssueAnalyzer<M>>,
    repository: Arc<R>,
    lifecycle: IssueLifecycle<R, N>,
}

static ISSUE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_issue_id() -> IssueId {
    let id = ISSUE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    IssueId(format!("issue-{id:06}"))
}

/// Technician-submitted completion payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionSubmission {
    pub technician_id: String,
    pub notes: String,
    #[serde(default)]
    pub photos: Vec<PhotoArtifact>,
}

impl<M, R, N> IssueTriageService<M, R, N>
where
    M: ScoringModel + 'static,
    R: IssueRepository + 'static,
    N: StatusNotifier + 'static,
{
    pub fn new(analyzer: Arc<CivicIssueAnalyzer<M>>, repository: Arc<R>, notifier: Arc<N>) -> Self {
        let lifecycle = IssueLifecycle::new(repository.clone(), notifier);
        Self {
            analyzer,
            repository,
            lifecycle,
        }
    }

    /// Validate, score, and persist a new citizen report.
    pub async fn submit(
        &self,
        submission: IssueSubmission,
    ) -> Result<IssueReport, TriageServiceError> {
        validate_submission(&submission)?;

        let photos = self.normalized_photos(&submission.photos);
        if photos.is_empty() {
            return Err(TriageServiceError::MissingPhotos);
        }

        let assessment = self
            .analyzer
            .analyze_issue(
                submission.title.trim(),
                submission.description.trim(),
                &submission.category,
                &photos,
                &submission.location,
            )
            .await;

        let issue = IssueReport::new(next_issue_id(), submission, photos);
        Ok(self.lifecycle.open(issue, assessment)?)
    }

    /// Fetch an issue for API responses.
    pub fn get(&self, id: &IssueId) -> Result<IssueReport, TriageServiceError> {
        let issue = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(issue)
    }

    /// Issues ordered for the admin dashboard: highest priority first, then oldest.
    pub fn queue(&self, limit: usize) -> Result<Vec<IssueReport>, TriageServiceError> {
        let mut issues = self.repository.list()?;
        issues.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        issues.truncate(limit);
        Ok(issues)
    }

    pub fn transition(
        &self,
        id: &IssueId,
        target: IssueStatus,
        expected: IssueStatus,
    ) -> Result<IssueReport, TriageServiceError> {
        Ok(self.lifecycle.transition(id, target, expected)?)
    }

    pub fn assign(
        &self,
        id: &IssueId,
        technician_id: &str,
        expected: IssueStatus,
    ) -> Result<IssueReport, TriageServiceError> {
        if technician_id.trim().is_empty() {
            return Err(TriageServiceError::MissingField("technician_id"));
        }
        Ok(self.lifecycle.assign(id, technician_id, expected)?)
    }

    pub fn submit_completion(
        &self,
        id: &IssueId,
        submission: CompletionSubmission,
    ) -> Result<IssueReport, TriageServiceError> {
        if submission.technician_id.trim().is_empty() {
            return Err(TriageServiceError::MissingField("technician_id"));
        }

        let evidence = CompletionEvidence {
            technician_id: submission.technician_id.trim().to_string(),
            notes: submission.notes,
            photos: self.normalized_photos(&submission.photos),
            submitted_at: Utc::now(),
        };
        Ok(self.lifecycle.submit_completion(id, evidence)?)
    }

    fn normalized_photos(&self, photos: &[PhotoArtifact]) -> Vec<PhotoArtifact> {
        self.analyzer
            .media_policy()
            .normalize(photos)
            .into_iter()
            .cloned()
            .collect()
    }
}

fn validate_submission(submission: &IssueSubmission) -> Result<(), TriageServiceError> {
    if submission.title.trim().is_empty() {
        return Err(TriageServiceError::MissingField("title"));
    }
    if submission.description.trim().is_empty() {
        return Err(TriageServiceError::MissingField("description"));
    }
    if submission.photos.is_empty() {
        return Err(TriageServiceError::MissingPhotos);
    }
    Ok(())
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum TriageServiceError {
    #[error("`{0}` is required")]
    MissingField(&'static str),
    #[error("at least one photo is required")]
    MissingPhotos,
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
