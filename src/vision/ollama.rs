//! Ollama vision backend.
//!
//! Talks to a local-network Ollama instance via its generate API. Local
//! models are slow, hence the generous timeout.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::backend::{VisionBackend, VisionError, VISION_PROMPT};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

pub struct OllamaVision {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaVision {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl VisionBackend for OllamaVision {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn describe(&self, image: &[u8], _media_type: &str) -> Result<String, VisionError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt: VISION_PROMPT,
            images: vec![BASE64.encode(image)],
            stream: false,
        };

        debug!(model = %self.model, image_bytes = image.len(), "Sending generate request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| VisionError::Upstream {
                backend: "ollama",
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Upstream {
                backend: "ollama",
                message: format!("status {}: {}", status, body),
            });
        }

        let generated: GenerateResponse =
            response.json().await.map_err(|e| VisionError::Upstream {
                backend: "ollama",
                message: format!("invalid response: {}", e),
            })?;

        Ok(generated.response)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_removal() {
        let backend = OllamaVision::new("http://localhost:11434/", "llava");
        assert_eq!(backend.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_response_tolerates_missing_field() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.response, "");
    }
}
