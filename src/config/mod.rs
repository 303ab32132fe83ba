mod file_config;

pub use file_config::{FileConfig, VisionConfig};

use crate::vision::VisionSettings;
use anyhow::Result;
use std::path::PathBuf;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llava";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    pub pace_ms: u64,
    pub use_ollama: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    pub pace_ms: u64,
    pub vision: VisionSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present; API keys come
    /// from the environment.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.db_path.clone());
        let upload_dir = file
            .upload_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.upload_dir.clone());
        let port = file.port.unwrap_or(cli.port);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let pace_ms = file.pace_ms.unwrap_or(cli.pace_ms);

        let vision_file = file.vision.unwrap_or_default();
        let vision = VisionSettings {
            use_ollama: vision_file.use_ollama.unwrap_or(cli.use_ollama),
            ollama_url: vision_file
                .ollama_url
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: vision_file
                .ollama_model
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            anthropic_api_key: non_empty_env("ANTHROPIC_API_KEY"),
            anthropic_model: vision_file
                .anthropic_model
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            openai_model: vision_file
                .openai_model
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        };

        Ok(Self {
            db_path,
            upload_dir,
            port,
            frontend_dir_path,
            pace_ms,
            vision,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
