//! Vision backend abstraction layer.
//!
//! Turns a bookshelf photograph into `{title, author}` candidates via one of
//! several interchangeable model backends (Ollama, Anthropic, OpenAI).

mod anthropic;
mod backend;
mod ollama;
mod openai;
mod parse;
mod types;

pub use anthropic::AnthropicVision;
pub use backend::{VisionBackend, VisionError, VisionExtractor, VisionSettings, VISION_PROMPT};
pub use ollama::OllamaVision;
pub use openai::OpenAiVision;
pub use parse::parse_book_list;
pub use types::DetectedBook;
