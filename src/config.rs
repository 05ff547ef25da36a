use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::llm::{gemini, memory, vision};

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store_path: PathBuf,
    pub api_key_env: String,
    pub base_url: String,
    pub temperature: f32,
    pub chat: ChatOptions,
    pub vision: VisionOptions,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    pub models: Vec<String>,
    pub memory_window: usize,
    pub entity_memory: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            memory_window: 0,
            entity_memory: true,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct VisionOptions {
    pub models: Vec<String>,
    pub caption_prompt: String,
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("config file `{}` not found", path.display()))?;
        let mut settings: Settings = toml::from_str(&content)
            .with_context(|| format!("config file `{}` is invalid", path.display()))?;
        settings.fill_default_value();
        Ok(settings)
    }

    pub fn fill_default_value(&mut self) {
        if self.store_path.as_os_str().is_empty() {
            self.store_path = PathBuf::from("user_sessions.json");
        }
        if self.api_key_env.is_empty() {
            self.api_key_env = "GOOGLE_API_KEY".to_string();
        }
        if self.base_url.is_empty() {
            self.base_url = gemini::BASE_URL.to_string();
        }
        if self.chat.models.is_empty() {
            self.chat.models = models(&[
                "gemini-1.5-flash",
                "gemini-1.5-flash-8b",
                "gemini-1.5-pro",
            ]);
        }
        if self.chat.memory_window == 0 {
            self.chat.memory_window = memory::DEFAULT_WINDOW;
        }
        if self.vision.models.is_empty() {
            self.vision.models = models(&["gemini-1.5-flash", "gemini-1.5-flash-8b"]);
        }
        if self.vision.caption_prompt.is_empty() {
            self.vision.caption_prompt = vision::DEFAULT_CAPTION_PROMPT.to_string();
        }
    }

    pub fn env_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gets_defaults() {
        let mut settings: Settings = toml::from_str("").unwrap();
        settings.fill_default_value();
        assert_eq!(settings.store_path, PathBuf::from("user_sessions.json"));
        assert_eq!(settings.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(settings.chat.models[0], "gemini-1.5-flash");
        assert_eq!(settings.chat.memory_window, 12);
        assert!(settings.chat.entity_memory);
        assert_eq!(settings.vision.models.len(), 2);
        assert_eq!(settings.vision.caption_prompt, "Please describe the image");
        assert_eq!(settings.temperature, 0.0);
    }

    #[test]
    fn file_values_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genai.toml");
        std::fs::write(
            &path,
            r#"
store_path = "accounts.json"
temperature = 0.4

[chat]
models = ["gemini-1.5-pro"]
memory_window = 4
entity_memory = false
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.store_path, PathBuf::from("accounts.json"));
        assert_eq!(settings.temperature, 0.4);
        assert_eq!(settings.chat.models, ["gemini-1.5-pro"]);
        assert_eq!(settings.chat.memory_window, 4);
        assert!(!settings.chat.entity_memory);
        assert_eq!(settings.vision.models[1], "gemini-1.5-flash-8b");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Settings::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
