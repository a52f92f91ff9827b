//! Shared validation helpers for command registration.
//!
//! Centralizes the checks the factory runs (names, sensitivities, declared
//! kinds) so every registration path produces consistent error messages.

use crate::error::{AppError, FailureKind};

/// Names double as detection-model file stems: non-empty, no whitespace or separators.
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::config("Command name must not be empty"));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
        return Err(AppError::config(format!(
            "Command name '{name}' must not contain whitespace or path separators"
        )));
    }
    Ok(())
}

/// Validate that a detection sensitivity is finite and in [0.0, 1.0].
pub fn validate_sensitivity(name: &str, sensitivity: f64) -> Result<(), AppError> {
    if !sensitivity.is_finite() {
        return Err(AppError::config(format!(
            "Sensitivity for '{name}' must be finite"
        )));
    }
    if !(0.0..=1.0).contains(&sensitivity) {
        return Err(AppError::config(format!(
            "Sensitivity for '{name}' ({sensitivity:.3}) must be between 0.0 and 1.0"
        )));
    }
    Ok(())
}

/// Reserved kinds are always fatal and may not be declared recoverable.
pub fn validate_recoverable_kinds<'a>(
    name: &str,
    kinds: impl IntoIterator<Item = &'a FailureKind>,
) -> Result<(), AppError> {
    let reserved: Vec<&str> = kinds
        .into_iter()
        .filter(|k| k.is_reserved())
        .map(FailureKind::name)
        .collect();
    if reserved.is_empty() {
        Ok(())
    } else {
        Err(AppError::config(format!(
            "Command '{name}' cannot declare {} as recoverable",
            reserved.join(" or ")
        )))
    }
}
