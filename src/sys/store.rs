//! Username -> account mapping persisted as a single JSON object.
//!
//! Every operation reads the whole file, edits it in memory and writes it
//! back. Two processes writing the same file race and the last write wins.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::Transcript;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Account {
    /// `None` for accounts created implicitly by an archive write.
    pub password: Option<String>,
    #[serde(default)]
    pub sessions: Vec<Transcript>,
}

type Accounts = BTreeMap<String, Account>;

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Opens the store at `path`, creating it as `{}` when absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        if !store.path.exists() {
            log::info!("creating credential store at {}", store.path.display());
            store.write(&Accounts::new())?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(Error::InvalidUsername);
        }
        let mut accounts = self.read()?;
        if accounts.contains_key(username) {
            return Err(Error::DuplicateUser(username.to_string()));
        }
        accounts.insert(
            username.to_string(),
            Account {
                password: Some(password.to_string()),
                sessions: Vec::new(),
            },
        );
        self.write(&accounts)?;
        log::info!("registered user `{username}`");
        Ok(())
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        let accounts = self.read()?;
        match accounts.get(username) {
            Some(account) if account.password.as_deref() == Some(password) => Ok(()),
            _ => Err(Error::InvalidCredentials),
        }
    }

    pub fn transcripts(&self, username: &str) -> Result<Vec<Transcript>> {
        let accounts = self.read()?;
        Ok(accounts
            .get(username)
            .map(|account| account.sessions.clone())
            .unwrap_or_default())
    }

    pub fn append_transcript(&self, username: &str, transcript: Transcript) -> Result<()> {
        let mut accounts = self.read()?;
        accounts
            .entry(username.to_string())
            .or_default()
            .sessions
            .push(transcript);
        self.write(&accounts)?;
        log::debug!("archived a transcript for `{username}`");
        Ok(())
    }

    /// Empties the archive of `username`, leaving every other account as is.
    pub fn clear_transcripts(&self, username: &str) -> Result<()> {
        let mut accounts = self.read()?;
        if let Some(account) = accounts.get_mut(username) {
            account.sessions.clear();
            self.write(&accounts)?;
            log::info!("cleared archive of `{username}`");
        }
        Ok(())
    }

    fn read(&self) -> Result<Accounts> {
        let content = fs::read_to_string(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Accounts::new());
        }
        serde_json::from_str(&content).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, accounts: &Accounts) -> Result<()> {
        let io_err = |source| Error::Io {
            path: self.path.clone(),
            source,
        };

        let mut buf = Vec::with_capacity(256);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        accounts.serialize(&mut ser).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(&buf).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::Line;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path().join("user_sessions.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_empty_object() {
        let (_dir, store) = store();
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.trim(), "{}");
    }

    #[test]
    fn duplicate_registration_fails() {
        let (_dir, store) = store();
        store.register("alice", "pw").unwrap();
        let err = store.register("alice", "other").unwrap_err();
        assert!(matches!(err, Error::DuplicateUser(name) if name == "alice"));
        store.authenticate("alice", "pw").unwrap();
    }

    #[test]
    fn fresh_user_can_log_in_immediately() {
        let (_dir, store) = store();
        store.register("bob", "secret").unwrap();
        store.authenticate("bob", "secret").unwrap();
        assert!(store.transcripts("bob").unwrap().is_empty());
    }

    #[test]
    fn blank_username_is_rejected() {
        let (_dir, store) = store();
        assert!(matches!(store.register("  ", "pw"), Err(Error::InvalidUsername)));
    }

    #[test]
    fn wrong_password_and_unknown_user_fail() {
        let (_dir, store) = store();
        store.register("alice", "pw").unwrap();
        assert!(matches!(
            store.authenticate("alice", "nope"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("mallory", "pw"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn passwordless_account_cannot_log_in() {
        let (_dir, store) = store();
        store
            .append_transcript("ghost", Transcript(vec![Line::user("hi")]))
            .unwrap();
        assert!(matches!(
            store.authenticate("ghost", ""),
            Err(Error::InvalidCredentials)
        ));
        assert_eq!(store.transcripts("ghost").unwrap().len(), 1);
    }

    #[test]
    fn transcripts_keep_append_order() {
        let (_dir, store) = store();
        store.register("alice", "pw").unwrap();
        let first = Transcript(vec![Line::user("one"), Line::bot("1")]);
        let second = Transcript(vec![Line::user("two"), Line::bot("2")]);
        store.append_transcript("alice", first.clone()).unwrap();
        store.append_transcript("alice", second.clone()).unwrap();
        assert_eq!(store.transcripts("alice").unwrap(), vec![first, second]);
    }

    #[test]
    fn clear_only_touches_one_account() {
        let (_dir, store) = store();
        store.register("alice", "pw").unwrap();
        store.register("bob", "pw").unwrap();
        let t = Transcript(vec![Line::user("x"), Line::bot("y")]);
        store.append_transcript("alice", t.clone()).unwrap();
        store.append_transcript("bob", t.clone()).unwrap();

        store.clear_transcripts("alice").unwrap();

        assert!(store.transcripts("alice").unwrap().is_empty());
        assert_eq!(store.transcripts("bob").unwrap(), vec![t]);
        store.authenticate("alice", "pw").unwrap();
    }

    #[test]
    fn file_layout_matches_expected_json() {
        let (_dir, store) = store();
        store.register("alice", "pw").unwrap();
        store
            .append_transcript(
                "alice",
                Transcript(vec![Line::user("hello"), Line::bot("hi there")]),
            )
            .unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "alice": {
                    "password": "pw",
                    "sessions": [["User: hello", "Bot: hi there"]]
                }
            })
        );
        assert!(content.contains("\n    \"alice\""));
    }

    #[test]
    fn reads_file_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_sessions.json");
        fs::write(
            &path,
            r#"{"carol": {"password": "pw", "sessions": [["User:hey", "Bot:yo"]]}}"#,
        )
        .unwrap();
        let store = CredentialStore::open(&path).unwrap();
        let transcripts = store.transcripts("carol").unwrap();
        assert_eq!(transcripts[0].lines(), &[Line::user("hey"), Line::bot("yo")]);
    }

    #[test]
    fn corrupt_file_reports_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_sessions.json");
        fs::write(&path, "{not json").unwrap();
        let store = CredentialStore::open(&path).unwrap();
        assert!(matches!(store.authenticate("a", "b"), Err(Error::Json { .. })));
    }
}
