use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{info, warn};

use super::domain::{Location, PhotoArtifact, PriorityAssessment};
use super::fallback::score_by_rules;
use super::media::MediaPolicy;
use super::model::{ModelError, ScoringModel};
use super::prompt::build_prompt;
use super::validator::{parse_assessment, MalformedResponse};
use crate::config::TriageConfig;

/// Why the model path did not yield an assessment.
#[derive(Debug, thiserror::Error)]
pub enum TriageFailure {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),
    #[error("scoring model did not answer within {0:?}")]
    Timeout(Duration),
    #[error("model path panicked: {0}")]
    Panicked(String),
}

impl TriageFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            TriageFailure::Model(ModelError::Unavailable(_)) => "model_unavailable",
            TriageFailure::Model(ModelError::RequestFailed(_)) => "model_request_failed",
            TriageFailure::Malformed(_) => "malformed_response",
            TriageFailure::Timeout(_) => "timeout",
            TriageFailure::Panicked(_) => "model_panicked",
        }
    }
}

/// Scores civic issues with the generative model and falls back to the rule table.
pub struct CivicIssueAnalyzer<M> {
    model: Arc<M>,
    media: MediaPolicy,
    timeout: Duration,
}

impl<M> CivicIssueAnalyzer<M>
where
    M: ScoringModel + 'static,
{
    pub fn new(model: Arc<M>, timeout: Duration) -> Self {
        Self {
            model,
            media: MediaPolicy::default(),
            timeout,
        }
    }

    pub fn from_config(model: Arc<M>, config: &TriageConfig) -> Self {
        Self::new(model, config.timeout)
    }

    pub fn with_media_policy(mut self, media: MediaPolicy) -> Self {
        self.media = media;
        self
    }

    pub fn media_policy(&self) -> MediaPolicy {
        self.media
    }

    /// Produce an assessment for a new issue. Never fails: any model-path failure is
    /// logged by kind and replaced with the rule-based result.
    pub async fn analyze_issue(
        &self,
        title: &str,
        description: &str,
        category: &str,
        photos: &[PhotoArtifact],
        location: &Location,
    ) -> PriorityAssessment {
        match self
            .score_with_model(title, description, category, photos, location)
            .await
        {
            Ok(assessment) => {
                info!(
                    priority = assessment.priority,
                    confidence = assessment.confidence,
                    "issue scored by model"
                );
                assessment
            }
            Err(failure) => {
                warn!(kind = failure.kind(), error = %failure, "model scoring failed, using rules");
                score_by_rules(title, description, category)
            }
        }
    }

    /// The AI path alone, surfacing the failure instead of substituting the fallback.
    pub async fn score_with_model(
        &self,
        title: &str,
        description: &str,
        category: &str,
        photos: &[PhotoArtifact],
        location: &Location,
    ) -> Result<PriorityAssessment, TriageFailure> {
        let attempt = async {
            let images = self.media.normalize(photos);
            let prompt = build_prompt(title, description, category, location);

            let raw = tokio::time::timeout(self.timeout, self.model.generate(&prompt, &images))
                .await
                .map_err(|_| TriageFailure::Timeout(self.timeout))??;

            Ok::<_, TriageFailure>(parse_assessment(&raw)?)
        };

        // A panicking model adapter or validator must still end in the rule-based path.
        match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(TriageFailure::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
