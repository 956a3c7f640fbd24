use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AppResult;

/// Login identity for the enhancement web service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub remember: bool,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.password.is_empty()
    }
}

/// On-disk record. Email and password are base64-encoded so the file is not
/// field-for-field plaintext; this is obfuscation, not encryption, and the
/// file is only as private as its filesystem permissions.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredCredentials {
    email: String,
    password: String,
    remember: bool,
}

pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved credentials. A missing file, `remember == false`, or a
    /// record that fails to decode all yield empty credentials.
    pub fn load(&self) -> Credentials {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Credentials::default(),
        };

        let stored: StoredCredentials = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Unreadable credentials file {:?}: {}", self.path, e);
                return Credentials::default();
            }
        };

        if !stored.remember {
            return Credentials::default();
        }

        match (decode_field(&stored.email), decode_field(&stored.password)) {
            (Some(email), Some(password)) => Credentials {
                email,
                password,
                remember: true,
            },
            _ => {
                log::warn!("Stored credentials failed to decode, ignoring them");
                Credentials::default()
            }
        }
    }

    /// Persist credentials when `remember` is set, otherwise overwrite the
    /// file with an explicitly empty record.
    pub fn save(&self, credentials: &Credentials) -> AppResult<()> {
        let stored = if credentials.remember {
            StoredCredentials {
                email: BASE64.encode(credentials.email.as_bytes()),
                password: BASE64.encode(credentials.password.as_bytes()),
                remember: true,
            }
        } else {
            StoredCredentials::default()
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn decode_field(value: &str) -> Option<String> {
    let bytes = BASE64.decode(value).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.json"))
    }

    fn sample() -> Credentials {
        Credentials {
            email: "user@example.com".to_string(),
            password: "hunter2!".to_string(),
            remember: true,
        }
    }

    #[test]
    fn test_remembered_credentials_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&sample()).unwrap();
        assert_eq!(store.load(), sample());
    }

    #[test]
    fn test_save_without_remember_clears_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();

        let mut forgotten = sample();
        forgotten.remember = false;
        store.save(&forgotten).unwrap();

        let loaded = store.load();
        assert!(loaded.is_empty());
        assert!(!loaded.remember);
    }

    #[test]
    fn test_file_is_not_field_for_field_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_ne!(value["email"].as_str().unwrap(), sample().email);
        assert_ne!(value["password"].as_str().unwrap(), sample().password);
    }

    #[test]
    fn test_load_missing_file_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = store_in(&dir).load();
        assert!(loaded.is_empty());
        assert!(!loaded.remember);
    }

    #[test]
    fn test_malformed_encoding_fails_soft() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"email": "%%%not-base64%%%", "password": "also bad", "remember": true}"#,
        )
        .unwrap();

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupted_json_fails_soft() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "remember: maybe").unwrap();

        assert!(store.load().is_empty());
    }
}
