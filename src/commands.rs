use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Emitter, State};

use crate::credentials::{CredentialStore, Credentials};
use crate::enhancer::{self, EnhanceManager, EnhanceRequest};
use crate::logger::AppLogger;
use crate::session::{SelectedFile, Session};
use crate::settings::{AppSettings, SettingsStore};
use crate::{app_error, app_info};

// ────────────────────────────────── Login ──────────────────────────────────

#[tauri::command]
pub async fn login(
    session: State<'_, Arc<Mutex<Session>>>,
    credential_store: State<'_, CredentialStore>,
    logger: State<'_, Arc<AppLogger>>,
    email: String,
    password: String,
    remember: bool,
) -> Result<(), String> {
    if email.trim().is_empty() || password.is_empty() {
        return Err("Please enter email and password".to_string());
    }

    credential_store
        .save(&Credentials {
            email: email.clone(),
            password: password.clone(),
            remember,
        })
        .map_err(|e| e.to_string())?;

    let mut session = session.lock().map_err(|e| e.to_string())?;
    session.log_in(email, password).map_err(|e| e.to_string())?;
    app_info!(logger, "User logged in as {}", session.email());
    Ok(())
}

#[tauri::command]
pub async fn logout(
    session: State<'_, Arc<Mutex<Session>>>,
    logger: State<'_, Arc<AppLogger>>,
) -> Result<(), String> {
    let mut session = session.lock().map_err(|e| e.to_string())?;
    session.log_out();
    app_info!(logger, "User logged out");
    Ok(())
}

/// Saved credentials for pre-filling the login form. Empty when nothing was
/// remembered.
#[tauri::command]
pub async fn load_credentials(
    credential_store: State<'_, CredentialStore>,
) -> Result<Credentials, String> {
    Ok(credential_store.load())
}

// ──────────────────────────────── Settings ────────────────────────────────

#[tauri::command]
pub async fn get_settings(store: State<'_, SettingsStore>) -> Result<AppSettings, String> {
    Ok(store.load())
}

#[tauri::command]
pub async fn save_settings(
    store: State<'_, SettingsStore>,
    logger: State<'_, Arc<AppLogger>>,
    settings: AppSettings,
) -> Result<(), String> {
    store.save(&settings).map_err(|e| e.to_string())?;
    app_info!(
        logger,
        "Settings saved (speech {}%, background {}%)",
        settings.speech_level,
        settings.background_level
    );
    Ok(())
}

#[tauri::command]
pub async fn select_directory(app: AppHandle) -> Result<Option<String>, String> {
    use tauri_plugin_dialog::DialogExt;
    let path = app.dialog().file().blocking_pick_folder();
    Ok(path.map(|p| p.to_string()))
}

// ────────────────────────────── File selection ──────────────────────────────

#[tauri::command]
pub async fn select_files(
    app: AppHandle,
    session: State<'_, Arc<Mutex<Session>>>,
    logger: State<'_, Arc<AppLogger>>,
) -> Result<Vec<SelectedFile>, String> {
    use tauri_plugin_dialog::DialogExt;

    let picked = app
        .dialog()
        .file()
        .add_filter("Videos", &["mp4", "mov", "avi", "mkv", "webm", "m4v"])
        .blocking_pick_files();

    let mut session = session.lock().map_err(|e| e.to_string())?;

    // Cancelled picker keeps the current selection
    let Some(picked) = picked else {
        return Ok(session.selected_files().to_vec());
    };

    let files: Vec<SelectedFile> = picked
        .iter()
        .map(|p| SelectedFile::from_path(std::path::Path::new(&p.to_string())))
        .collect();

    app_info!(logger, "{} file(s) selected", files.len());
    session.set_selected_files(files);
    Ok(session.selected_files().to_vec())
}

// ────────────────────────────── Enhancement ──────────────────────────────

#[tauri::command]
pub async fn start_enhance(
    app: AppHandle,
    session: State<'_, Arc<Mutex<Session>>>,
    settings_store: State<'_, SettingsStore>,
    manager: State<'_, Arc<tokio::sync::Mutex<EnhanceManager>>>,
    logger: State<'_, Arc<AppLogger>>,
) -> Result<String, String> {
    let (email, password, files) = {
        let session = session.lock().map_err(|e| e.to_string())?;
        if !session.is_logged_in() {
            return Err("Please log in first".to_string());
        }
        if session.selected_files().is_empty() {
            return Err("Please select files first".to_string());
        }
        (
            session.email().to_string(),
            session.password().to_string(),
            session.selected_paths(),
        )
    };

    let settings = settings_store.load();
    std::fs::create_dir_all(&settings.download_path).map_err(|e| e.to_string())?;

    let request = EnhanceRequest {
        email,
        password,
        files,
        download_path: settings.download_path,
        speech_level: settings.speech_level,
        background_level: settings.background_level,
    };

    let id = uuid::Uuid::new_v4().to_string();
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    let (line_tx, mut line_rx) = tokio::sync::mpsc::channel::<String>(64);

    {
        let mut mgr = manager.lock().await;
        if !mgr.try_begin(&id, cancel_tx) {
            return Err("An enhancement run is already in progress".to_string());
        }
    }

    let node = enhancer::get_node_path();
    let script = enhancer::get_script_path(&app);
    app_info!(logger, "Starting enhancement of {} file(s)", request.files.len());

    // Forward streamed lines to the window and the log file
    let app_for_lines = app.clone();
    let logger_for_lines = logger.inner().clone();
    let id_for_lines = id.clone();
    tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            logger_for_lines.info(&line);
            let _ = app_for_lines.emit(
                "enhance-log",
                serde_json::json!({ "id": id_for_lines, "line": line }),
            );
        }
    });

    let app_clone = app.clone();
    let manager_arc = manager.inner().clone();
    let logger_arc = logger.inner().clone();
    let id_clone = id.clone();
    tokio::spawn(async move {
        let result = enhancer::run_enhance(
            node,
            &script,
            &request,
            line_tx,
            cancel_rx,
            enhancer::RUN_TIMEOUT,
        )
        .await;

        {
            let mut mgr = manager_arc.lock().await;
            mgr.finish(&id_clone);
        }

        match result {
            Ok(outcome) if outcome.success() => {
                app_info!(logger_arc, "Enhancement completed");
                let _ = app_clone.emit("enhance-complete", serde_json::json!({ "id": id_clone }));
                notify(&app_clone, "Files processed successfully");
            }
            Ok(outcome) => {
                app_error!(
                    logger_arc,
                    "Enhancement failed (exit {}): {}",
                    outcome.exit_code,
                    outcome.stderr
                );
                let _ = app_clone.emit(
                    "enhance-error",
                    serde_json::json!({
                        "id": id_clone,
                        "exitCode": outcome.exit_code,
                        "error": outcome.stderr,
                    }),
                );
                notify(&app_clone, "Enhancement failed");
            }
            Err(e) => {
                app_error!(logger_arc, "Enhancement error: {}", e);
                let _ = app_clone.emit(
                    "enhance-error",
                    serde_json::json!({ "id": id_clone, "error": e.to_string() }),
                );
                notify(&app_clone, "Enhancement failed");
            }
        }
    });

    Ok(id)
}

#[tauri::command]
pub async fn cancel_enhance(
    manager: State<'_, Arc<tokio::sync::Mutex<EnhanceManager>>>,
    logger: State<'_, Arc<AppLogger>>,
) -> Result<bool, String> {
    let mut mgr = manager.lock().await;
    let cancelled = mgr.cancel();
    if cancelled {
        app_info!(logger, "Enhancement cancellation requested");
    }
    Ok(cancelled)
}

#[tauri::command]
pub async fn enhance_status(
    manager: State<'_, Arc<tokio::sync::Mutex<EnhanceManager>>>,
) -> Result<bool, String> {
    Ok(manager.lock().await.is_running())
}

// ─────────────────────────────── Utilities ───────────────────────────────

#[tauri::command]
pub async fn open_download_folder(store: State<'_, SettingsStore>) -> Result<(), String> {
    let settings = store.load();
    #[cfg(windows)]
    {
        // On Windows, use cmd.exe with 'start' to handle special characters properly
        use std::process::Command;
        Command::new("cmd")
            .args(["/C", "start", "", &settings.download_path])
            .spawn()
            .map_err(|e| format!("Failed to open '{}': {}", settings.download_path, e))?;
        return Ok(());
    }
    #[cfg(not(windows))]
    {
        open::that(&settings.download_path).map_err(|e| e.to_string())
    }
}

#[tauri::command]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn notify(app: &AppHandle, body: &str) {
    use tauri_plugin_notification::NotificationExt;
    if let Err(e) = app
        .notification()
        .builder()
        .title("Podcast Enhancer")
        .body(body)
        .show()
    {
        log::warn!("Failed to show notification: {}", e);
    }
}
