//! Vision backend trait, errors and backend selection.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::anthropic::AnthropicVision;
use super::ollama::OllamaVision;
use super::openai::OpenAiVision;
use super::parse::parse_book_list;
use super::types::DetectedBook;

/// Fixed instruction sent with every shelf photograph.
pub const VISION_PROMPT: &str = "Examine this bookshelf image carefully. \
List every book title and author name you can read on the spines. \
Return ONLY a valid JSON array - no other text, no markdown, no explanation. \
Format: [{\"title\": \"Book Title\", \"author\": \"Author Name\"}, ...] \
Use null for author when unreadable.";

#[derive(Debug, Error)]
pub enum VisionError {
    /// No backend configured. Fatal to a scan request, never retried.
    #[error("no vision backend configured: set ANTHROPIC_API_KEY, OPENAI_API_KEY or use_ollama")]
    NotConfigured,
    /// Network or service failure talking to a backend. Not retried.
    #[error("{backend} vision request failed: {message}")]
    Upstream {
        backend: &'static str,
        message: String,
    },
}

/// Trait for vision model backends.
///
/// A backend accepts image bytes plus a media type and returns the model's
/// raw text. Parsing happens downstream, so adding a backend requires no
/// change to parsing or ingestion logic.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn describe(&self, image: &[u8], media_type: &str) -> Result<String, VisionError>;
}

/// Settings that decide which backend runs. Resolved by `config`.
#[derive(Debug, Clone, Default)]
pub struct VisionSettings {
    pub use_ollama: bool,
    pub ollama_url: String,
    pub ollama_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

/// Extracts book candidates from shelf photographs through the selected
/// backend.
pub struct VisionExtractor {
    backend: Box<dyn VisionBackend>,
}

impl VisionExtractor {
    /// Select a backend by configuration precedence: the local Ollama flag
    /// wins, then an Anthropic key, then an OpenAI key.
    pub fn from_settings(settings: &VisionSettings) -> Result<Self, VisionError> {
        let backend: Box<dyn VisionBackend> = if settings.use_ollama {
            Box::new(OllamaVision::new(
                settings.ollama_url.clone(),
                settings.ollama_model.clone(),
            ))
        } else if let Some(key) = settings.anthropic_api_key.clone() {
            Box::new(AnthropicVision::new(key, settings.anthropic_model.clone()))
        } else if let Some(key) = settings.openai_api_key.clone() {
            Box::new(OpenAiVision::new(key, settings.openai_model.clone()))
        } else {
            return Err(VisionError::NotConfigured);
        };
        info!("Vision backend: {}", backend.name());
        Ok(Self { backend })
    }

    pub fn with_backend(backend: Box<dyn VisionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run the backend and parse its output into candidates.
    pub async fn extract(
        &self,
        image: &[u8],
        media_type: &str,
    ) -> Result<Vec<DetectedBook>, VisionError> {
        let text = self.backend.describe(image, media_type).await?;
        Ok(parse_book_list(&text))
    }
}
