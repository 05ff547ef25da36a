use crate::error::{Error, Result};

pub mod conversation;
pub mod gemini;
pub mod memory;
pub mod prompt;
pub mod vision;
pub mod worker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub image: Option<ImageData>,
    pub temperature: f32,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            temperature,
        }
    }
}

/// A connected client for one model.
pub trait ChatModel: Send {
    fn generate(&self, request: &GenerateRequest) -> Result<String>;
}

/// Opens a fresh [`ChatModel`] per request.
pub trait ModelBackend: Send + Sync {
    fn open(&self, api_key: &str, model: &str) -> Box<dyn ChatModel>;
}

/// Picks the key typed into the sidebar, falling back to the environment.
///
/// Blank values count as absent.
pub fn resolve_api_key(field: &str, env: Option<&str>) -> Result<String> {
    [Some(field), env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingApiKey)
}
