use std::path::PathBuf;

use super::{ChatModel, GenerateRequest, ImageData};
use crate::error::{Error, Result};

pub const DEFAULT_CAPTION_PROMPT: &str = "Please describe the image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    File(PathBuf),
}

impl ImageSource {
    /// `http(s)://` input is a URL, everything else a local path.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input.starts_with("http://") || input.starts_with("https://") {
            Some(Self::Url(input.to_string()))
        } else {
            Some(Self::File(PathBuf::from(input)))
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImageSource::Url(_) => "Original URL",
            ImageSource::File(_) => "File",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ImageSource::Url(url) => url.clone(),
            ImageSource::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub source: ImageSource,
    pub image: ImageData,
}

pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    if bytes.starts_with(PNG) {
        Some("image/png")
    } else if bytes.starts_with(JPEG) {
        Some("image/jpeg")
    } else {
        None
    }
}

pub fn decode(source: ImageSource, bytes: Vec<u8>) -> Result<LoadedImage> {
    let mime_type = sniff_mime(&bytes).ok_or_else(|| {
        Error::Image(format!(
            "`{}` is not a PNG or JPEG image",
            source.describe()
        ))
    })?;
    Ok(LoadedImage {
        source,
        image: ImageData { mime_type, bytes },
    })
}

pub fn load(source: ImageSource) -> Result<LoadedImage> {
    let bytes = match &source {
        ImageSource::Url(url) => fetch(url)?,
        ImageSource::File(path) => std::fs::read(path)
            .map_err(|e| Error::Image(format!("cannot read {}: {e}", path.display())))?,
    };
    log::debug!("loaded {} bytes from {}", bytes.len(), source.describe());
    decode(source, bytes)
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::Image(format!("cannot fetch {url}: {e}")))?;
    let bytes = response
        .bytes()
        .map_err(|e| Error::Image(format!("cannot read body of {url}: {e}")))?;
    Ok(bytes.to_vec())
}

pub fn caption(
    model: &dyn ChatModel,
    image: &LoadedImage,
    prompt: &str,
    temperature: f32,
) -> Result<String> {
    let request = GenerateRequest {
        prompt: prompt.to_string(),
        image: Some(image.image.clone()),
        temperature,
    };
    Ok(model.generate(&request)?.trim().to_string())
}
