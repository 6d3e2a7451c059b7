//! Runtime data directory layout.
//!
//! Resolves and creates the OS-dependent application data root, falling
//! back to a repo-local directory if the preferred location isn't writable
//! (e.g. a locked-down service account).

use std::path::{Path, PathBuf};

const APP_NAME: &str = "AutoClipper";
const APPDATA_ENV_OVERRIDE: &str = "AUTOCLIPPER_APPDATA";

/// Every directory and well-known file path under the runtime root.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root: PathBuf,
    pub logs_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub clips_dir: PathBuf,
    pub models_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub secrets_dir: PathBuf,
    pub config_path: PathBuf,
    pub database_path: PathBuf,
}

/// The app data root `AUTOCLIPPER_APPDATA` points to, or the OS default —
/// `%APPDATA%/AutoClipper` on Windows, `~/.config/AutoClipper` elsewhere.
/// Performs no I/O.
pub fn app_data_root() -> PathBuf {
    if let Some(override_dir) = std::env::var_os(APPDATA_ENV_OVERRIDE) {
        return expand_home(Path::new(&override_dir));
    }

    if cfg!(windows) {
        let base = std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join("AppData").join("Roaming"));
        base.join(APP_NAME)
    } else {
        home_dir().join(".config").join(APP_NAME)
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Resolves the runtime root, creating every subdirectory along the way.
/// Falls back to `<fallback_root>/.autoclipper-runtime` if the preferred
/// root can't be created or written to.
pub fn ensure_runtime_paths(fallback_root: &Path) -> std::io::Result<RuntimePaths> {
    let root = resolve_writable_root(fallback_root)?;
    build_paths(root)
}

fn resolve_writable_root(fallback_root: &Path) -> std::io::Result<PathBuf> {
    let preferred = app_data_root();
    if is_writable(&preferred) {
        return Ok(preferred);
    }
    let fallback = fallback_root.join(".autoclipper-runtime");
    std::fs::create_dir_all(&fallback)?;
    Ok(fallback)
}

fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".write_test");
    let writable = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    writable
}

fn build_paths(root: PathBuf) -> std::io::Result<RuntimePaths> {
    let logs_dir = root.join("logs");
    let storage_dir = root.join("storage");
    let downloads_dir = storage_dir.join("downloads");
    let clips_dir = storage_dir.join("clips");
    let models_dir = storage_dir.join("models");
    let temp_dir = storage_dir.join("temp");
    let secrets_dir = root.join("secrets");
    let config_path = root.join("config.json");
    let database_path = root.join("database.db");

    for dir in [&root, &logs_dir, &storage_dir, &downloads_dir, &clips_dir, &models_dir, &temp_dir, &secrets_dir] {
        std::fs::create_dir_all(dir)?;
    }

    Ok(RuntimePaths {
        root,
        logs_dir,
        storage_dir,
        downloads_dir,
        clips_dir,
        models_dir,
        temp_dir,
        secrets_dir,
        config_path,
        database_path,
    })
}
