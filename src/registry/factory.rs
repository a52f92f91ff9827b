use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use super::descriptor::{CommandDescriptor, IntoCallback};
use super::validation;
use crate::error::{AppError, FailureKind};
use crate::paths;

/// Builds validated [`CommandDescriptor`]s.
///
/// Pure validation: creating a descriptor never touches a registry.
#[derive(Debug, Clone)]
pub struct CommandFactory {
    sounds_dir: PathBuf,
}

impl CommandFactory {
    pub fn new(sounds_dir: PathBuf) -> Self {
        Self { sounds_dir }
    }

    pub fn sounds_dir(&self) -> &Path {
        &self.sounds_dir
    }

    /// Create a descriptor. The binding kind is inferred from the callback's shape.
    ///
    /// Fails with `ConfigurationError` for an invalid name or sensitivity or a
    /// reserved recoverable kind, and with `ResourceNotFound` when `alt_sound`
    /// has no file under the sounds directory.
    pub fn create<M>(
        &self,
        name: impl Into<String>,
        callback: impl IntoCallback<M>,
        sensitivity: f64,
        recoverable: impl IntoIterator<Item = FailureKind>,
        alt_sound: Option<&str>,
    ) -> Result<CommandDescriptor, AppError> {
        let name = name.into();
        validation::validate_name(&name)?;
        validation::validate_sensitivity(&name, sensitivity)?;

        let recoverable: IndexSet<FailureKind> = recoverable.into_iter().collect();
        validation::validate_recoverable_kinds(&name, &recoverable)?;

        if let Some(sound) = alt_sound {
            let path = paths::sound_path(&self.sounds_dir, sound);
            if !path.is_file() {
                return Err(AppError::ResourceNotFound {
                    what: format!("Sound '{sound}' for command '{name}'"),
                    path,
                });
            }
        }

        Ok(CommandDescriptor::new(
            name,
            callback.into_callback(),
            sensitivity,
            recoverable,
            alt_sound.map(str::to_string),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::descriptor::{BindingKind, CommandOutcome};

    struct Jokester;

    fn joke(_: &Jokester) -> CommandOutcome {
        Ok("Why did the chicken cross the road?".into())
    }

    fn time() -> CommandOutcome {
        Ok("12 00 with 00 seconds.".into())
    }

    fn factory_with_sounds(sounds: &[&str]) -> (tempfile::TempDir, CommandFactory) {
        let dir = tempfile::tempdir().unwrap();
        for s in sounds {
            std::fs::write(paths::sound_path(dir.path(), s), b"").unwrap();
        }
        let factory = CommandFactory::new(dir.path().to_path_buf());
        (dir, factory)
    }

    #[test]
    fn infers_binding_kind() {
        let (_dir, factory) = factory_with_sounds(&[]);
        let bound = factory.create("joke", joke, 0.5, [], None).unwrap();
        assert_eq!(bound.binding_kind(), BindingKind::Bound);
        let unbound = factory.create("time", time, 0.5, [], None).unwrap();
        assert_eq!(unbound.binding_kind(), BindingKind::Unbound);
    }

    #[test]
    fn keeps_declared_fields() {
        let (_dir, factory) = factory_with_sounds(&["chime"]);
        let d = factory
            .create(
                "time",
                time,
                0.45,
                [FailureKind::NetworkTimeout, FailureKind::NetworkTimeout],
                Some("chime"),
            )
            .unwrap();
        assert_eq!(d.name(), "time");
        assert!((d.sensitivity() - 0.45).abs() < f64::EPSILON);
        assert_eq!(d.recoverable_kinds().len(), 1);
        assert!(d.is_recoverable(&FailureKind::NetworkTimeout));
        assert_eq!(d.alt_sound(), Some("chime"));
    }

    #[test]
    fn rejects_reserved_recoverable_kinds() {
        let (_dir, factory) = factory_with_sounds(&[]);
        for reserved in FailureKind::RESERVED {
            let err = factory.create("joke", joke, 0.5, [reserved], None).unwrap_err();
            assert!(matches!(err, AppError::ConfigurationError { .. }), "got: {err}");
        }
    }

    #[test]
    fn rejects_missing_alt_sound() {
        let (_dir, factory) = factory_with_sounds(&[]);
        let err = factory.create("time", time, 0.5, [], Some("chime")).unwrap_err();
        assert!(
            matches!(&err, AppError::ResourceNotFound { path, .. } if path.ends_with("chime.mp3")),
            "got: {err}"
        );
    }
}
