use crate::error::Result;
use crate::llm::{ChatModel, GenerateRequest, ModelBackend};

/// Offline backend: every reply echoes the last line of the prompt.
pub struct EchoBackend;

impl ModelBackend for EchoBackend {
    fn open(&self, _api_key: &str, model: &str) -> Box<dyn ChatModel> {
        Box::new(EchoModel {
            model: model.to_string(),
        })
    }
}

pub struct EchoModel {
    model: String,
}

impl ChatModel for EchoModel {
    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        if request.prompt.contains("comma-separated list") {
            return Ok("NONE".to_string());
        }
        if let Some(image) = &request.image {
            return Ok(format!(
                "[{}] {} image, {} bytes",
                self.model,
                image.mime_type,
                image.bytes.len()
            ));
        }
        let last = request
            .prompt
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix("Human: "))
            .unwrap_or(&request.prompt);
        Ok(format!("[{}] {}", self.model, last))
    }
}
