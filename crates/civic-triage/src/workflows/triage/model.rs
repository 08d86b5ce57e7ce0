use async_trait::async_trait;

use super::domain::PhotoArtifact;

/// Transport-level failures from the generative model provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("scoring model unavailable: {0}")]
    Unavailable(String),
    #[error("scoring model request failed: {0}")]
    RequestFailed(String),
}

/// Multi-modal text generation used by the AI scoring path.
///
/// Implementations perform a single request; retry and fallback policy belongs to the
/// analyzer.
#[async_trait]
pub trait ScoringModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        images: &[&PhotoArtifact],
    ) -> Result<String, ModelError>;
}
