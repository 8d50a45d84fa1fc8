// Linkshelf platform paths
// Resolves per-OS config and data directories at compile time via `cfg(target_os)`.
//
//   Linux:   $XDG_CONFIG_HOME/linkshelf, $XDG_DATA_HOME/linkshelf
//   macOS:   ~/Library/Application Support/Linkshelf
//   Windows: %APPDATA%\Linkshelf

use std::env;
use std::path::PathBuf;

/// Overrides the data directory when set.
pub const DATA_DIR_ENV: &str = "LINKSHELF_DATA_DIR";

/// Overrides the settings file path when set.
pub const CONFIG_FILE_ENV: &str = "LINKSHELF_CONFIG";

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    PathBuf::from(env::var(var).unwrap_or_else(|_| env::temp_dir().to_string_lossy().to_string()))
}

/// `$xdg_var/linkshelf`, or `~/<fallback>/linkshelf`.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn xdg_dir(xdg_var: &str, fallback: &[&str]) -> PathBuf {
    match env::var(xdg_var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("linkshelf"),
        _ => fallback
            .iter()
            .fold(home_dir(), |path, part| path.join(part))
            .join("linkshelf"),
    }
}

#[cfg(target_os = "macos")]
fn app_support_dir() -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join("Linkshelf")
}

#[cfg(target_os = "windows")]
fn app_data_dir() -> PathBuf {
    env::var("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
        .join("Linkshelf")
}

/// Returns the directory holding `settings.json`.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        app_data_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_CONFIG_HOME", &[".config"])
    }
}

/// Returns the directory holding the SQLite database.
/// `LINKSHELF_DATA_DIR` takes precedence over the platform default.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        app_data_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_DATA_HOME", &[".local", "share"])
    }
}

/// Returns the settings file path, honoring `LINKSHELF_CONFIG`.
pub fn get_settings_path() -> PathBuf {
    match env::var(CONFIG_FILE_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => get_config_dir().join("settings.json"),
    }
}
