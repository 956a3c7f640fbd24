use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tauri::Manager;
use tokio::process::Command;

use crate::error::{AppError, AppResult};

/// Wall-clock ceiling for one enhancement run. The external script has its own
/// per-step timeouts; this is the last line against a hung browser session.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Create a Command that hides the console window on Windows
#[cfg(windows)]
pub fn create_hidden_command(program: &str) -> Command {
    #[allow(unused_imports)]
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;

    let mut cmd = Command::new(program);
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

#[cfg(not(windows))]
pub fn create_hidden_command(program: &str) -> Command {
    Command::new(program)
}

/// Resolves the Node.js binary name per platform; the runtime is expected on
/// PATH, matching how the automation script is shipped.
pub fn get_node_path() -> &'static str {
    if cfg!(windows) {
        "node.exe"
    } else {
        "node"
    }
}

/// Resolves the automation script. Bundled resources win; in development the
/// script sits beside the executable or in the working directory.
pub fn get_script_path(app_handle: &tauri::AppHandle) -> PathBuf {
    if let Ok(resource_dir) = app_handle.path().resource_dir() {
        let bundled = resource_dir.join("automation").join("automation.js");
        if bundled.exists() {
            return bundled;
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let beside = dir.join("automation.js");
            if beside.exists() {
                return beside;
            }
        }
    }
    PathBuf::from("automation.js")
}

/// One fully-specified enhancement request: everything the automation script
/// needs to log in, upload, process and download a batch of files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub email: String,
    pub password: String,
    pub files: Vec<String>,
    pub download_path: String,
    pub speech_level: u8,
    pub background_level: u8,
}

impl EnhanceRequest {
    /// Argument vector for the automation script. Credentials are deliberately
    /// absent here: argv is visible to every process on the machine, so they
    /// travel in environment variables scoped to the child instead.
    pub fn to_args(&self, script: &Path) -> AppResult<Vec<String>> {
        if self.files.is_empty() {
            return Err(AppError::InvalidArgument(
                "No files selected for enhancement".to_string(),
            ));
        }
        let files_json = serde_json::to_string(&self.files)?;
        Ok(vec![
            script.to_string_lossy().to_string(),
            "--files".to_string(),
            files_json,
            "--download-path".to_string(),
            self.download_path.clone(),
            "--speech-level".to_string(),
            self.speech_level.to_string(),
            "--background-level".to_string(),
            self.background_level.to_string(),
        ])
    }
}

/// Terminal state of a finished run. `stderr` carries the captured error
/// stream verbatim (trimmed) when the script exited non-zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceOutcome {
    pub exit_code: i32,
    pub stderr: String,
}

impl EnhanceOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Strip a leading bracketed timestamp segment from a progress line.
/// `"[12:00:01] uploading"` becomes `"uploading"`; lines without the prefix
/// pass through trimmed.
pub fn strip_timestamp(line: &str) -> &str {
    use std::sync::OnceLock;

    static RE_TS: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE_TS.get_or_init(|| regex::Regex::new(r"^\s*\[[^\]]*\]\s*").unwrap());

    match re.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

/// Run the automation script to completion.
///
/// Stdout is streamed line-by-line into `line_tx` as it arrives, with
/// undecodable byte sequences replaced rather than aborting the read and
/// timestamp prefixes stripped. Stderr is collected in full. The child is
/// killed on cancellation or when `timeout` elapses. Spawn and IO failures
/// come back as `AppError::Enhancer`; a finished process always yields an
/// `EnhanceOutcome`, whatever its exit code.
pub async fn run_enhance(
    program: &str,
    script: &Path,
    request: &EnhanceRequest,
    line_tx: tokio::sync::mpsc::Sender<String>,
    cancel_rx: tokio::sync::watch::Receiver<bool>,
    timeout: Duration,
) -> AppResult<EnhanceOutcome> {
    let args = request.to_args(script)?;

    let mut child = create_hidden_command(program)
        .args(&args)
        .env("ENHANCER_EMAIL", &request.email)
        .env("ENHANCER_PASSWORD", &request.password)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| AppError::Enhancer(format!("Failed to spawn {}: {}", program, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Enhancer("Failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Enhancer("Failed to capture stderr".to_string()))?;

    let stdout_handle = tokio::spawn(async move {
        use tokio::io::{AsyncBufReadExt, BufReader};
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let decoded = String::from_utf8_lossy(&buf);
                    let line = strip_timestamp(&decoded);
                    if line.is_empty() {
                        continue;
                    }
                    if line_tx.send(line.to_string()).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let stderr_handle = tokio::spawn(async move {
        use tokio::io::AsyncReadExt;
        let mut stderr = stderr;
        let mut bytes = Vec::new();
        let _ = stderr.read_to_end(&mut bytes).await;
        String::from_utf8_lossy(&bytes).to_string()
    });

    tokio::select! {
        result = child.wait() => {
            match result {
                Ok(status) => {
                    // Drain both streams before reporting the outcome
                    let _ = stdout_handle.await;
                    let stderr_text = stderr_handle.await.unwrap_or_default();
                    let exit_code = status.code().unwrap_or(-1);
                    Ok(EnhanceOutcome {
                        exit_code,
                        stderr: if status.success() {
                            String::new()
                        } else {
                            stderr_text.trim().to_string()
                        },
                    })
                }
                Err(e) => {
                    stdout_handle.abort();
                    stderr_handle.abort();
                    Err(AppError::Enhancer(format!("Process error: {}", e)))
                }
            }
        }
        _ = wait_for_cancel(cancel_rx) => {
            let _ = child.kill().await;
            stdout_handle.abort();
            stderr_handle.abort();
            Err(AppError::Enhancer("Enhancement cancelled".to_string()))
        }
        _ = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            stdout_handle.abort();
            stderr_handle.abort();
            Err(AppError::Enhancer(format!(
                "Enhancement timed out after {}s",
                timeout.as_secs()
            )))
        }
    }
}

async fn wait_for_cancel(mut rx: tokio::sync::watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            // Channel closed, just wait forever
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Debug)]
pub struct ActiveJob {
    pub id: String,
    pub cancel_token: tokio::sync::watch::Sender<bool>,
}

/// Single-slot run supervisor: at most one enhancement run is in flight, a
/// second request is rejected rather than queued.
#[derive(Default)]
pub struct EnhanceManager {
    active: Option<ActiveJob>,
}

impl EnhanceManager {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn try_begin(&mut self, id: &str, cancel_token: tokio::sync::watch::Sender<bool>) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(ActiveJob {
            id: id.to_string(),
            cancel_token,
        });
        true
    }

    /// Clear the slot if `id` is still the occupant.
    pub fn finish(&mut self, id: &str) {
        if self.active.as_ref().is_some_and(|job| job.id == id) {
            self.active = None;
        }
    }

    pub fn cancel(&mut self) -> bool {
        match &self.active {
            Some(job) => job.cancel_token.send(true).is_ok(),
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|job| job.id.as_str())
    }
}
