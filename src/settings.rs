use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AppResult;

/// User preferences persisted as a single flat JSON file.
///
/// The file is the whole record: `save` overwrites it, last write wins, and a
/// missing or unreadable file is treated as first run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub download_path: String,
    pub auto_download: bool,
    pub keep_original: bool,
    pub speech_level: u8,
    pub background_level: u8,
}

impl Default for AppSettings {
    fn default() -> Self {
        let download_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Downloads")
            .join("AdobePodcast");

        Self {
            download_path: download_dir.to_string_lossy().to_string(),
            auto_download: true,
            keep_original: true,
            speech_level: 70,
            background_level: 10,
        }
    }
}

impl AppSettings {
    /// Enhancement levels are percentages; a hand-edited file can carry values
    /// above 100, which are pulled back into range.
    pub fn clamped(mut self) -> Self {
        self.speech_level = self.speech_level.min(100);
        self.background_level = self.background_level.min(100);
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// does not parse. Never surfaces an error to the caller.
    pub fn load(&self) -> AppSettings {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return AppSettings::default(),
        };

        match serde_json::from_str::<AppSettings>(&raw) {
            Ok(settings) => settings.clamped(),
            Err(e) => {
                log::warn!("Unreadable settings file {:?}, using defaults: {}", self.path, e);
                AppSettings::default()
            }
        }
    }

    /// Persist the full record, overwriting the previous content.
    pub fn save(&self, settings: &AppSettings) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&settings.clone().clamped())?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json"))
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = store_in(&dir).load();

        assert!(Path::new(&settings.download_path).ends_with("Downloads/AdobePodcast"));
        assert!(settings.auto_download);
        assert!(settings.keep_original);
        assert_eq!(settings.speech_level, 70);
        assert_eq!(settings.background_level, 10);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let settings = AppSettings {
            download_path: "/tmp/enhanced".to_string(),
            auto_download: false,
            keep_original: false,
            speech_level: 55,
            background_level: 25,
        };

        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);
    }

    #[test]
    fn test_load_corrupted_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{ not json at all").unwrap();

        assert_eq!(store.load(), AppSettings::default());
    }

    #[test]
    fn test_missing_keys_fall_back_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"speech_level": 42}"#).unwrap();

        let settings = store.load();
        assert_eq!(settings.speech_level, 42);
        assert_eq!(settings.background_level, 10);
        assert!(settings.auto_download);
    }

    #[test]
    fn test_out_of_range_levels_are_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"speech_level": 200, "background_level": 101}"#,
        )
        .unwrap();

        let settings = store.load();
        assert_eq!(settings.speech_level, 100);
        assert_eq!(settings.background_level, 100);
    }

    #[test]
    fn test_file_uses_documented_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&AppSettings::default()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in [
            "download_path",
            "auto_download",
            "keep_original",
            "speech_level",
            "background_level",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
    }
}
