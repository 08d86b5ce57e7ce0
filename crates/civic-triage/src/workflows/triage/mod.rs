//! Civic issue triage: photo normalization, model-assisted priority scoring with a
//! rule-based fallback, and the lifecycle state machine that tracks each report.

pub mod analyzer;
pub mod domain;
pub mod fallback;
pub mod gemini;
pub mod lifecycle;
pub mod media;
pub mod model;
pub mod prompt;
pub mod repository;
pub mod router;
pub mod service;
pub mod validator;

#[cfg(test)]
mod tests;

pub use analyzer::{CivicIssueAnalyzer, TriageFailure};
pub use domain::{
    AssessmentSource, CompletionEvidence, IssueCategory, IssueId, IssueReport, IssueStatus,
    IssueSubmission, IssueView, Location, PhotoArtifact, PriorityAssessment, SeverityFactor,
};
pub use fallback::score_by_rules;
pub use gemini::{AnalyzerError, GeminiClient};
pub use lifecycle::{IssueLifecycle, LifecycleError};
pub use media::{normalize, MediaPolicy};
pub use model::{ModelError, ScoringModel};
pub use prompt::build_prompt;
pub use repository::{
    IssueRepository, NotifyError, RepositoryError, StatusNotice, StatusNotifier,
};
pub use router::issue_router;
pub use service::{CompletionSubmission, IssueTriageService, TriageServiceError};
pub use validator::{parse_assessment, MalformedResponse};
