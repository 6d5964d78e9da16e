use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::parser::parse_model_output;
use super::prompt::{build_worker_prompt, PromptConfig};
use super::OllamaError;
use crate::models::{Classification, FeatureRecord, WorkerResult};
use crate::pipeline::{
    Classifier, CollaboratorError, GenerationInput, OutputGenerator, VisionExtractor,
};

/// Models used by the layers that don't take a model id per call.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaModels {
    /// Feature extraction (layer 1).
    pub student: String,
    /// Output generation (layer 5).
    pub worker: String,
}

impl Default for OllamaModels {
    fn default() -> Self {
        Self {
            student: "gemma3n:e2b".to_string(),
            worker: "gemma3n:e2b".to_string(),
        }
    }
}

/// Ollama HTTP client for local inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
    models: OllamaModels,
    prompts: PromptConfig,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        connect_timeout_secs: u64,
        models: OllamaModels,
        prompts: PromptConfig,
    ) -> Result<Self, OllamaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| OllamaError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
            models,
            prompts,
        })
    }

    /// Default Ollama instance at localhost:11434.
    pub fn default_local() -> Result<Self, OllamaError> {
        Self::new(
            "http://localhost:11434",
            30,
            5,
            OllamaModels::default(),
            PromptConfig::default(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/tags: verify Ollama is running and list loaded models.
    pub async fn health_check(&self) -> Result<Vec<String>, OllamaError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::HttpClient(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// POST /api/chat with JSON output format. Returns the message content.
    pub async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
        images: Option<Vec<String>>,
    ) -> Result<String, OllamaError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                    images: None,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                    images,
                },
            ],
            format: "json",
            stream: false,
        };

        tracing::debug!(model, prompt_chars = user.len(), "Ollama chat request");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OllamaError::Timeout(self.timeout_secs)
            } else {
                OllamaError::MalformedResponse(e.to_string())
            }
        })?;
        Ok(parsed.message.content)
    }

    fn map_send_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            OllamaError::Timeout(self.timeout_secs)
        } else {
            OllamaError::HttpClient(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    format: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    content: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[async_trait]
impl VisionExtractor for OllamaClient {
    async fn extract(
        &self,
        text: &str,
        image_base64: Option<&str>,
    ) -> Result<FeatureRecord, CollaboratorError> {
        let images = image_base64.map(|img| vec![img.to_string()]);
        let content = self
            .chat(&self.models.student, &self.prompts.feature_extraction, text, images)
            .await?;
        Ok(parse_model_output(&content)?)
    }
}

#[async_trait]
impl Classifier for OllamaClient {
    async fn classify(
        &self,
        features: &FeatureRecord,
        model_id: &str,
    ) -> Result<Classification, CollaboratorError> {
        let user = serde_json::to_string(features).map_err(OllamaError::from)?;
        let content = self
            .chat(model_id, &self.prompts.classification, &user, None)
            .await?;
        Ok(parse_model_output(&content)?)
    }
}

#[async_trait]
impl OutputGenerator for OllamaClient {
    async fn generate(&self, input: &GenerationInput) -> Result<WorkerResult, CollaboratorError> {
        let user = build_worker_prompt(input).map_err(OllamaError::from)?;
        let content = self
            .chat(&self.models.worker, &self.prompts.worker, &user, None)
            .await?;
        Ok(parse_model_output(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OllamaClient::new(
            "http://localhost:11434/",
            60,
            5,
            OllamaModels::default(),
            PromptConfig::default(),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.timeout_secs, 60);
    }

    #[test]
    fn default_local_uses_standard_port() {
        let client = OllamaClient::default_local().unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.models.student, "gemma3n:e2b");
    }

    #[test]
    fn chat_request_serializes_images_on_user_message_only() {
        let body = OllamaChatRequest {
            model: "gemma3n:e2b",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                    images: None,
                },
                ChatMessage {
                    role: "user",
                    content: "boss",
                    images: Some(vec!["aGVsbG8=".into()]),
                },
            ],
            format: "json",
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert!(json["messages"][0].get("images").is_none());
        assert_eq!(json["messages"][1]["images"][0], "aGVsbG8=");
    }

    #[test]
    fn tags_response_tolerates_missing_models() {
        let parsed: OllamaTagsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.models.is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        // Port 9 (discard) is closed on test machines; connect fails fast.
        let client = OllamaClient::new(
            "http://127.0.0.1:9",
            2,
            1,
            OllamaModels::default(),
            PromptConfig::default(),
        )
        .unwrap();
        let err = VisionExtractor::extract(&client, "boss", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }
}
