use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::AppError;
use crate::paths;

/// Output pins every installation must define.
pub const REQUIRED_PINS: [&str; 2] = ["thinking", "lamp"];

/// Name of the busy-indicator output toggled around every command.
pub const INDICATOR_PIN: &str = "thinking";

/// Coordinates used for weather lookups.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationCoords {
    pub x: String,
    pub y: String,
}

impl Default for LocationCoords {
    /// Blacksburg, VA.
    fn default() -> Self {
        Self {
            x: "37.232191".to_string(),
            y: "-80.423165".to_string(),
        }
    }
}

/// Installation settings, read from `settings.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Output name → pin number.
    pub pin_mapping: IndexMap<String, u8>,
    /// Log file name inside `logs_dir`. None = log to the console only.
    #[serde(default)]
    pub logfile: Option<String>,
    #[serde(default)]
    pub location_coords: Option<LocationCoords>,
    #[serde(default)]
    pub sounds_dir: Option<PathBuf>,
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,
    /// Directory relative paths are resolved against (the settings file's parent).
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Settings {
    pub fn sounds_dir(&self) -> PathBuf {
        paths::resolve_dir(&self.base_dir, self.sounds_dir.as_deref(), paths::SOUNDS_DIR)
    }

    pub fn models_dir(&self) -> PathBuf {
        paths::resolve_dir(&self.base_dir, self.models_dir.as_deref(), paths::MODELS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        paths::resolve_dir(&self.base_dir, self.logs_dir.as_deref(), paths::LOGS_DIR)
    }

    /// Full path of the command log, if one is configured.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.logfile
            .as_deref()
            .map(|f| paths::log_path(&self.logs_dir(), f))
    }

    pub fn location(&self) -> LocationCoords {
        self.location_coords.clone().unwrap_or_default()
    }

    /// Check that every required output is mapped.
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = REQUIRED_PINS
            .iter()
            .copied()
            .filter(|pin| !self.pin_mapping.contains_key(*pin))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::SettingsError {
                message: format!(
                    "pin_mapping does not define all the required keys: {} (missing {})",
                    REQUIRED_PINS.join(", "),
                    missing.join(", ")
                ),
            })
        }
    }
}

/// Load and validate settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<Settings, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| AppError::SettingsError {
        message: format!("Failed to read {}: {e}", path.display()),
    })?;
    let mut settings: Settings =
        serde_json::from_str(&text).map_err(|e| AppError::SettingsError {
            message: format!(
                "Failed to load {}: {e}. Make sure you assign values to the pin mappings.",
                path.display()
            ),
        })?;
    settings.base_dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(paths::SETTINGS_FILE);
        std::fs::write(
            &path,
            r#"{
                "pin_mapping": { "thinking": 20, "lamp": 21 },
                "logfile": "xavier.log"
            }"#,
        )
        .unwrap();

        let loaded = load_settings(&path).expect("should load");
        assert_eq!(loaded.pin_mapping["lamp"], 21);
        assert_eq!(loaded.sounds_dir(), dir.path().join("sounds"));
        assert_eq!(loaded.log_path(), Some(dir.path().join("logs").join("xavier.log")));
        assert_eq!(loaded.location(), LocationCoords::default());
    }

    #[test]
    fn test_missing_required_pin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(paths::SETTINGS_FILE);
        std::fs::write(&path, r#"{ "pin_mapping": { "thinking": 20 } }"#).unwrap();

        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("missing lamp"), "got: {err}");
    }

    #[test]
    fn test_malformed_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(paths::SETTINGS_FILE);
        assert!(matches!(load_settings(&path), Err(AppError::SettingsError { .. })));

        std::fs::write(&path, r#"{ "pin_mapping": { "thinking": "twenty" } }"#).unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("pin mappings"), "got: {err}");
    }

    #[test]
    fn test_configured_dirs_resolve_against_settings_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(paths::SETTINGS_FILE);
        std::fs::write(
            &path,
            r#"{
                "pin_mapping": { "thinking": 20, "lamp": 21 },
                "sounds_dir": "audio",
                "location_coords": { "x": "1.0", "y": "2.0" }
            }"#,
        )
        .unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.sounds_dir(), dir.path().join("audio"));
        assert_eq!(loaded.models_dir(), dir.path().join("models"));
        assert_eq!(loaded.location().x, "1.0");
        assert_eq!(loaded.log_path(), None);
    }
}
