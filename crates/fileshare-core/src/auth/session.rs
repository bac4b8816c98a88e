use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::{Credential, CredentialBackend};

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Persisted form of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub saved_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(credential: &Credential) -> Self {
        Self {
            access_token: credential.expose().to_string(),
            saved_at: Utc::now(),
        }
    }

    /// How long ago the credential was written, for display only.
    /// The server decides whether it is still valid.
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.saved_at).num_minutes().max(0)
    }
}

/// Access token persisted as JSON in the data directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Read the full session record, if one is on disk.
    pub fn read(&self) -> Result<Option<SessionData>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(data))
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl CredentialBackend for FileBackend {
    fn load(&self) -> Result<Option<Credential>> {
        let data = match self.read()? {
            Some(data) if !data.access_token.is_empty() => data,
            _ => return Ok(None),
        };
        debug!(age_minutes = data.age_minutes(), "Loaded saved session");
        Ok(Some(Credential::new(data.access_token)))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        let contents = serde_json::to_string_pretty(&SessionData::new(credential))?;
        std::fs::write(self.session_path(), contents).context("Failed to write session file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialStore;

    #[test]
    fn test_credential_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let store = CredentialStore::open(Box::new(FileBackend::new(dir.path().to_path_buf())));
        store.set(Credential::new("persisted-token"));
        drop(store);

        let reopened = CredentialStore::open(Box::new(FileBackend::new(dir.path().to_path_buf())));
        assert_eq!(reopened.get().unwrap().expose(), "persisted-token");
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());
        backend.save(&Credential::new("t")).unwrap();
        assert!(dir.path().join(SESSION_FILE).exists());

        backend.remove().unwrap();
        assert!(!dir.path().join(SESSION_FILE).exists());
        assert!(backend.load().unwrap().is_none());
        // Removing twice is fine
        backend.remove().unwrap();
    }

    #[test]
    fn test_session_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("nested"));
        backend.save(&Credential::new("t")).unwrap();

        let data = backend.read().unwrap().unwrap();
        assert_eq!(data.access_token, "t");
        assert_eq!(data.age_minutes(), 0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf());
        assert!(backend.load().is_err());
    }
}
