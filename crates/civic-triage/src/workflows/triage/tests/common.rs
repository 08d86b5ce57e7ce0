use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::triage::analyzer::CivicIssueAnalyzer;
use crate::workflows::triage::domain::{
    IssueId, IssueReport, IssueSubmission, Location, PhotoArtifact,
};
use crate::workflows::triage::model::{ModelError, ScoringModel};
use crate::workflows::triage::repository::{
    IssueRepository, NotifyError, RepositoryError, StatusNotice, StatusNotifier,
};
use crate::workflows::triage::service::IssueTriageService;

pub(super) const MODEL_RESPONSE: &str = r#"Assessment follows.
```json
{
  "priority": 9,
  "priorityReason": "Open manhole on a busy footpath",
  "severityFactors": [
    {"factor": "Safety Impact", "impact": "Pedestrians can fall in", "score": 10},
    {"factor": "Urgency", "impact": "Needs action today", "score": 9}
  ],
  "confidence": 0.92
}
```"#;

pub(super) fn location() -> Location {
    Location {
        metropolitan_city: "Pune".to_string(),
        area: "Kothrud".to_string(),
        exact_address: "Lane 4, Paud Road".to_string(),
    }
}

pub(super) fn photo(name: &str) -> PhotoArtifact {
    PhotoArtifact::new("image/jpeg", name, vec![0xFF, 0xD8, 0xFF, 0xE0])
}

pub(super) fn submission() -> IssueSubmission {
    IssueSubmission {
        title: "Open manhole".to_string(),
        description: "Cover missing outside the bus stop, blocked with a branch".to_string(),
        category: "sewage-overflow".to_string(),
        location: location(),
        photos: vec![photo("manhole-1.jpg"), photo("manhole-2.jpg")],
    }
}

/// Model double returning a fixed reply and recording what it was sent.
pub(super) struct ScriptedModel {
    reply: Result<String, ModelError>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedModel {
    pub(super) fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(error: ModelError) -> Self {
        Self {
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl ScoringModel for ScriptedModel {
    async fn generate(
        &self,
        prompt: &str,
        images: &[&PhotoArtifact],
    ) -> Result<String, ModelError> {
        let filenames = images.iter().map(|image| image.filename.clone()).collect();
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((prompt.to_string(), filenames));
        self.reply.clone()
    }
}

/// Model double that never answers in time.
pub(super) struct StalledModel;

#[async_trait]
impl ScoringModel for StalledModel {
    async fn generate(
        &self,
        _prompt: &str,
        _images: &[&PhotoArtifact],
    ) -> Result<String, ModelError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(MODEL_RESPONSE.to_string())
    }
}

/// Model double whose adapter panics mid-request.
pub(super) struct PanickingModel;

#[async_trait]
impl ScoringModel for PanickingModel {
    async fn generate(
        &self,
        _prompt: &str,
        _images: &[&PhotoArtifact],
    ) -> Result<String, ModelError> {
        panic!("sdk bug: unexpected response envelope");
    }
}

pub(super) fn analyzer<M: ScoringModel + 'static>(model: Arc<M>) -> CivicIssueAnalyzer<M> {
    CivicIssueAnalyzer::new(model, Duration::from_millis(200))
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<IssueId, IssueReport>>,
}

impl IssueRepository for MemoryRepository {
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
        let stored = guard.get(&issue.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                found: stored.version,
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

pub(super) struct UnavailableRepository;

impl IssueRepository for UnavailableRepository {
    fn insert(&self, _issue: IssueReport) -> Result<IssueReport, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn fetch(&self, _id: &IssueId) -> Result<Option<IssueReport>, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn replace(
        &self,
        _issue: IssueReport,
        _expected_version: u64,
    ) -> Result<IssueReport, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn list(&self) -> Result<Vec<IssueReport>, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    notices: Mutex<Vec<StatusNotice>>,
}

impl StatusNotifier for MemoryNotifier {
    fn notify(&self, notice: StatusNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

impl MemoryNotifier {
    pub(super) fn notices(&self) -> Vec<StatusNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

pub(super) struct FailingNotifier;

impl StatusNotifier for FailingNotifier {
    fn notify(&self, _notice: StatusNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("whatsapp gateway down".to_string()))
    }
}

pub(super) type TestService = IssueTriageService<ScriptedModel, MemoryRepository, MemoryNotifier>;

pub(super) fn build_service(
    model: ScriptedModel,
) -> (TestService, Arc<MemoryRepository>, Arc<MemoryNotifier>) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = IssueTriageService::new(
        Arc::new(analyzer(Arc::new(model))),
        repository.clone(),
        notifier.clone(),
    );
    (service, repository, notifier)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
