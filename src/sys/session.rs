//! Per-session context passed to every screen handler.

use super::store::CredentialStore;
use super::{Exchange, Transcript};
use crate::error::Result;
use crate::llm::memory::EntityMemory;

#[derive(Debug, Clone)]
pub struct SessionState {
    authenticated: bool,
    current_user: Option<String>,
    active: Vec<Exchange>,
    archive: Vec<Transcript>,
    /// Last text submitted from the chat input.
    pub input: String,
    pub memory: EntityMemory,
}

impl SessionState {
    pub fn new(memory_window: usize) -> Self {
        Self {
            authenticated: false,
            current_user: None,
            active: Vec::new(),
            archive: Vec::new(),
            input: String::new(),
            memory: EntityMemory::new(memory_window),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn active(&self) -> &[Exchange] {
        &self.active
    }

    pub fn archive(&self) -> &[Transcript] {
        &self.archive
    }

    pub fn login(&mut self, store: &CredentialStore, username: &str, password: &str) -> Result<()> {
        store.authenticate(username, password)?;
        let archive = store.transcripts(username)?;
        log::info!(
            "user `{username}` logged in with {} archived transcripts",
            archive.len()
        );
        self.authenticated = true;
        self.current_user = Some(username.to_string());
        self.archive = archive;
        Ok(())
    }

    pub fn record_turn(&mut self, user_text: impl Into<String>, bot_text: impl Into<String>) {
        self.active.push(Exchange {
            user: user_text.into(),
            bot: bot_text.into(),
        });
    }

    /// New Chat: archive the active transcript if there is one, then clear.
    ///
    /// A failed archive write leaves the session unchanged.
    pub fn reset(&mut self, store: Option<&CredentialStore>) -> Result<()> {
        if !self.active.is_empty() {
            let transcript = Transcript::from_exchanges(&self.active);
            if let (Some(store), Some(user)) = (store, self.current_user.as_deref()) {
                store.append_transcript(user, transcript.clone())?;
            }
            self.archive.push(transcript);
        }
        self.active.clear();
        self.input.clear();
        self.memory.clear();
        Ok(())
    }

    /// Empties the current user's archive, locally and in the store.
    pub fn clear_all(&mut self, store: Option<&CredentialStore>) -> Result<()> {
        if let (Some(store), Some(user)) = (store, self.current_user.as_deref()) {
            store.clear_transcripts(user)?;
        }
        self.archive.clear();
        Ok(())
    }

    pub fn logout(&mut self, store: Option<&CredentialStore>) -> Result<()> {
        self.reset(store)?;
        if let Some(user) = self.current_user.take() {
            log::info!("user `{user}` logged out");
        }
        self.authenticated = false;
        self.archive.clear();
        Ok(())
    }
}
