pub mod commands;
pub mod credentials;
pub mod enhancer;
pub mod error;
pub mod logger;
pub mod session;
pub mod settings;

use tauri::Manager;

use crate::credentials::CredentialStore;
use crate::enhancer::EnhanceManager;
use crate::logger::{AppLogger, LogLevel};
use crate::session::Session;
use crate::settings::SettingsStore;

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_notification::init())
        .setup(|app| {
            let app_data = app
                .path()
                .app_data_dir()
                .expect("Failed to resolve app data dir");
            std::fs::create_dir_all(&app_data)
                .map_err(|e| format!("Failed to create app data directory: {}", e))?;

            app.manage(SettingsStore::new(app_data.join("settings.json")));
            app.manage(CredentialStore::new(app_data.join("credentials.json")));

            let logger = AppLogger::new(&app_data.join("logs"), LogLevel::Info);
            app.manage(std::sync::Arc::new(logger));

            app.manage(std::sync::Arc::new(std::sync::Mutex::new(Session::default())));
            app.manage(std::sync::Arc::new(tokio::sync::Mutex::new(
                EnhanceManager::new(),
            )));

            log::info!("Podcast Enhancer v{} started", env!("CARGO_PKG_VERSION"));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::login,
            commands::logout,
            commands::load_credentials,
            commands::get_settings,
            commands::save_settings,
            commands::select_directory,
            commands::select_files,
            commands::start_enhance,
            commands::cancel_enhance,
            commands::enhance_status,
            commands::open_download_folder,
            commands::get_app_version,
        ])
        .run(tauri::generate_context!())
        .expect("Error while running Podcast Enhancer");
}
