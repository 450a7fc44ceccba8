use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// What survives between runs: the bearer token and when it was issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub saved_at: String,
}

/// File-backed token storage (`~/.medassyst/session.json`)
#[derive(Debug, Clone)]
pub struct TokenStorage {
    session_path: PathBuf,
}

impl TokenStorage {
    pub fn new(session_path: PathBuf) -> Self {
        Self { session_path }
    }

    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.session_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.session_path)
            .context("Failed to read session file")?;
        let session: StoredSession = serde_json::from_str(&content)
            .context("Failed to parse session file")?;

        Ok(Some(session).filter(|s| !s.token.is_empty()))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.session_path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }

        let session = StoredSession {
            token: token.to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
        };
        let content = serde_json::to_string_pretty(&session)
            .context("Failed to serialize session")?;

        fs::write(&self.session_path, content).context("Failed to write session file")?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.session_path.exists() {
            fs::remove_file(&self.session_path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("session.json"));

        assert!(storage.load().unwrap().is_none());

        storage.save("abc.def").unwrap();
        assert_eq!(storage.load().unwrap().unwrap().token, "abc.def");

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
        // clearing twice is fine
        storage.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        assert!(TokenStorage::new(path).load().is_err());
    }
}
