//! Centralized path definitions for sounds, detection models and logs.
//!
//! This module is the single source of truth for directory names, file
//! extensions and path-building functions. No other module should hard-code
//! these strings.

use std::path::{Path, PathBuf};

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";

// ── Directory names ──────────────────────────────────────────────

pub const SOUNDS_DIR: &str = "sounds";
pub const MODELS_DIR: &str = "models";
pub const LOGS_DIR: &str = "logs";

// ── Extensions ───────────────────────────────────────────────────

pub const SOUND_EXT: &str = "mp3";
pub const MODEL_EXT: &str = "pmdl";

// ── Path builders ────────────────────────────────────────────────

/// `<sounds_dir>/<id>.mp3`
pub fn sound_path(sounds_dir: &Path, id: &str) -> PathBuf {
    sounds_dir.join(format!("{id}.{SOUND_EXT}"))
}

/// Detection model for a command: `<models_dir>/<command>.pmdl`.
pub fn model_path(models_dir: &Path, command: &str) -> PathBuf {
    models_dir.join(format!("{command}.{MODEL_EXT}"))
}

pub fn log_path(logs_dir: &Path, logfile: &str) -> PathBuf {
    logs_dir.join(logfile)
}

/// Resolve an optional configured directory against the settings file's base dir.
pub fn resolve_dir(base: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => base.join(p),
        None => base.join(default_name),
    }
}
