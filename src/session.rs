use serde::Serialize;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// A file the user queued for enhancement, annotated with a display-ready size.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFile {
    pub path: String,
    pub name: String,
    pub size_bytes: u64,
    pub size_label: String,
}

impl SelectedFile {
    /// Annotate a path with its on-disk size. A file that vanished between the
    /// picker and here still lists, with a zero size.
    pub fn from_path(path: &Path) -> Self {
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self {
            path: path.to_string_lossy().to_string(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size_bytes,
            size_label: format_size(size_bytes),
        }
    }
}

/// Render a byte count for the file list.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.2} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes as u64)
    }
}

/// Transient per-run state: login flag, the identity behind it, and the
/// current file selection. Never persisted; logout resets all of it.
#[derive(Debug, Default)]
pub struct Session {
    logged_in: bool,
    email: String,
    password: String,
    selected_files: Vec<SelectedFile>,
}

impl Session {
    pub fn log_in(&mut self, email: String, password: String) -> AppResult<()> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::InvalidArgument(
                "Email and password are required".to_string(),
            ));
        }
        self.email = email;
        self.password = password;
        self.logged_in = true;
        Ok(())
    }

    pub fn log_out(&mut self) {
        *self = Self::default();
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Replace the selection wholesale, keeping the picker's order.
    pub fn set_selected_files(&mut self, files: Vec<SelectedFile>) {
        self.selected_files = files;
    }

    pub fn selected_files(&self) -> &[SelectedFile] {
        &self.selected_files
    }

    pub fn selected_paths(&self) -> Vec<String> {
        self.selected_files.iter().map(|f| f.path.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(path: &str) -> SelectedFile {
        SelectedFile {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            size_bytes: 0,
            size_label: "0 B".to_string(),
        }
    }

    #[test]
    fn test_login_requires_email_and_password() {
        let mut session = Session::default();
        assert!(session.log_in(String::new(), "pw".to_string()).is_err());
        assert!(session.log_in("a@b.c".to_string(), String::new()).is_err());
        assert!(!session.is_logged_in());

        session
            .log_in("a@b.c".to_string(), "pw".to_string())
            .unwrap();
        assert!(session.is_logged_in());
        assert_eq!(session.email(), "a@b.c");
    }

    #[test]
    fn test_logout_resets_everything() {
        let mut session = Session::default();
        session
            .log_in("a@b.c".to_string(), "pw".to_string())
            .unwrap();
        session.set_selected_files(vec![selected("/tmp/a.mp4")]);

        session.log_out();
        assert!(!session.is_logged_in());
        assert!(session.email().is_empty());
        assert!(session.password().is_empty());
        assert!(session.selected_files().is_empty());
    }

    #[test]
    fn test_selection_replacement_preserves_order() {
        let mut session = Session::default();
        session.set_selected_files(vec![selected("/tmp/z.mp4"), selected("/tmp/a.mp4")]);
        assert_eq!(session.selected_paths(), vec!["/tmp/z.mp4", "/tmp/a.mp4"]);

        session.set_selected_files(vec![selected("/tmp/b.mov")]);
        assert_eq!(session.selected_paths(), vec!["/tmp/b.mov"]);
    }

    #[test]
    fn test_from_path_reads_the_byte_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let file = SelectedFile::from_path(&path);
        assert_eq!(file.size_bytes, 2048);
        assert_eq!(file.name, "clip.mp4");
        assert_eq!(file.size_label, "2.0 KB");
    }

    #[test]
    fn test_format_size_tiers() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
