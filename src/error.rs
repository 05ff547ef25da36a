use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Username already exists!")]
    DuplicateUser(String),

    #[error("Invalid credentials!")]
    InvalidCredentials,

    #[error("Username must not be empty")]
    InvalidUsername,

    #[error("Enter API key")]
    MissingApiKey,

    #[error("model error: {0}")]
    Model(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("store `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store `{}` is not valid json: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    /// Errors that come from the remote side or the user's key, as opposed to
    /// account bookkeeping.
    pub fn is_model_side(&self) -> bool {
        matches!(
            self,
            Error::Model(_) | Error::MissingApiKey | Error::Image(_) | Error::Template(_)
        )
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(e: handlebars::RenderError) -> Self {
        Error::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(e: handlebars::TemplateError) -> Self {
        Error::Template(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
