use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Log levels for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// File-backed application logger. Every enhancement run's streamed lines are
/// recorded here so a failed run can be inspected after the window closed.
pub struct AppLogger {
    file: Mutex<Option<File>>,
    path: PathBuf,
    min_level: LogLevel,
}

impl AppLogger {
    pub fn new(log_dir: &std::path::Path, min_level: LogLevel) -> Self {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let path = log_dir.join(format!("enhancer-{}.log", date));

        // Ensure directory exists
        std::fs::create_dir_all(log_dir).ok();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok();

        Self {
            file: Mutex::new(file),
            path,
            min_level,
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if (level as u8) < (self.min_level as u8) {
            return;
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let line = format!("[{}] [{}] {}\n", timestamp, level.as_str(), message);

        if let Ok(mut file_lock) = self.file.lock() {
            if let Some(file) = file_lock.as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }

        // Also write to stderr for dev
        #[cfg(debug_assertions)]
        eprintln!("{}", line.trim());
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.path
    }
}

/// Convenience macros for logging
#[macro_export]
macro_rules! app_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! app_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(&format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_formatted_line_to_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AppLogger::new(dir.path(), LogLevel::Info);
        logger.info("hello from the logger");

        let contents = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(contents.contains("[INFO] hello from the logger"));
    }

    #[test]
    fn test_min_level_filters_lower_levels() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AppLogger::new(dir.path(), LogLevel::Warn);
        logger.debug("dropped");
        logger.info("also dropped");
        logger.error("kept");

        let contents = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(!contents.contains("dropped"));
        assert!(contents.contains("[ERROR] kept"));
    }
}
