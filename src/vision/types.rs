//! Common types for vision extraction.

use serde::{Deserialize, Serialize};

/// A book candidate read off a shelf photograph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedBook {
    pub title: String,
    /// `None` when the spine's author was illegible.
    pub author: Option<String>,
}
