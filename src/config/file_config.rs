use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub upload_dir: Option<String>,
    pub port: Option<u16>,
    pub frontend_dir_path: Option<String>,
    /// Minimum interval between upstream calls in a batch, milliseconds.
    pub pace_ms: Option<u64>,

    // Feature configs
    pub vision: Option<VisionConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct VisionConfig {
    pub use_ollama: Option<bool>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub anthropic_model: Option<String>,
    pub openai_model: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
