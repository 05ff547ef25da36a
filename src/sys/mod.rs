use std::fmt::Display;

pub mod session;
pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

impl Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let speaker = self.as_ref();
        write!(f, "{speaker}")
    }
}

impl AsRef<str> for Speaker {
    fn as_ref(&self) -> &str {
        match self {
            Speaker::User => "User",
            Speaker::Bot => "Bot",
        }
    }
}

/// One persisted turn, stored on disk as `"User: <text>"` or `"Bot: <text>"`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Line {
    pub speaker: Speaker,
    pub text: String,
}

impl Line {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
        }
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

impl From<Line> for String {
    fn from(line: Line) -> Self {
        line.to_string()
    }
}

impl TryFrom<String> for Line {
    type Error = String;

    // Older chat pages wrote "User:text" without the space.
    fn try_from(raw: String) -> Result<Self, Self::Error> {
        for speaker in [Speaker::User, Speaker::Bot] {
            if let Some(rest) = raw
                .strip_prefix(speaker.as_ref())
                .and_then(|r| r.strip_prefix(':'))
            {
                let text = rest.strip_prefix(' ').unwrap_or(rest);
                return Ok(Self {
                    speaker,
                    text: text.to_string(),
                });
            }
        }
        Err(format!("transcript line without speaker prefix: `{raw}`"))
    }
}

/// One user utterance and the reply it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Transcript(pub Vec<Line>);

impl Transcript {
    pub fn from_exchanges<'a, I: IntoIterator<Item = &'a Exchange>>(exchanges: I) -> Self {
        let mut lines = Vec::new();
        for exchange in exchanges {
            lines.push(Line::user(&exchange.user));
            lines.push(Line::bot(&exchange.bot));
        }
        Self(lines)
    }

    pub fn lines(&self) -> &[Line] {
        &self.0
    }
}
