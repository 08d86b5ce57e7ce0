use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::PhotoArtifact;
use super::model::{ModelError, ScoringModel};
use crate::config::TriageConfig;

const ERROR_BODY_EXCERPT: usize = 200;

/// Errors raised while wiring the analyzer at startup.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("GEMINI_API_KEY is not configured; the issue analyzer cannot start")]
    MissingCredential,
    #[error("failed to build model HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// `generateContent` client for Gemini multi-modal models.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn from_config(config: &TriageConfig) -> Result<Self, AnalyzerError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(AnalyzerError::MissingCredential)?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: generate_content_url(&config.base_url, &config.model),
            api_key,
        })
    }
}

fn generate_content_url(base_url: &str, model: &str) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model.trim()
    )
}

#[async_trait]
impl ScoringModel for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        images: &[&PhotoArtifact],
    ) -> Result<String, ModelError> {
        let request = GenerateContentRequest::new(prompt, images);
        debug!(images = images.len(), "submitting issue to scoring model");

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| ModelError::RequestFailed(format!("unreadable response: {err}")))?;

        payload.into_text().ok_or_else(|| {
            ModelError::RequestFailed("response contained no candidate text".to_string())
        })
    }
}

fn classify_transport_error(err: reqwest::Error) -> ModelError {
    if err.is_connect() || err.is_timeout() {
        ModelError::Unavailable(err.to_string())
    } else {
        ModelError::RequestFailed(err.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> ModelError {
    let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
    let detail = format!("{status}: {excerpt}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ModelError::Unavailable(detail)
    } else {
        ModelError::RequestFailed(detail)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn new(prompt: &str, images: &[&PhotoArtifact]) -> Self {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::Text {
            text: prompt.to_string(),
        });
        parts.extend(images.iter().map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.trim().to_string(),
                data: STANDARD.encode(&image.data),
            },
        }));

        Self {
            contents: vec![Content { parts }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn refuses_to_build_without_credential() {
        let config = TriageConfig::default();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(AnalyzerError::MissingCredential)
        ));
    }

    #[test]
    fn builds_generate_content_url() {
        assert_eq!(
            generate_content_url("https://example.test/", "gemini-1.5-flash"),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn request_carries_prompt_and_inline_images() {
        let photo = PhotoArtifact::new("image/jpeg", "pothole.jpg", vec![1, 2, 3]);
        let request = GenerateContentRequest::new("score this", &[&photo]);
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "parts": [
                        {"text": "score this"},
                        {"inline_data": {"mime_type": "image/jpeg", "data": "AQID"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn joins_candidate_text_parts() {
        let payload: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"priority\": "}, {"text": "5}"}]}}]
        }))
        .expect("parses");
        assert_eq!(payload.into_text().as_deref(), Some("{\"priority\": 5}"));

        let empty: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).expect("parses");
        assert!(empty.into_text().is_none());
    }

    #[test]
    fn quota_and_server_errors_mark_model_unavailable() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "quota"),
            ModelError::Unavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            ModelError::Unavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "bad key"),
            ModelError::RequestFailed(_)
        ));
    }
}
