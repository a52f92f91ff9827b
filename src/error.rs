use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::util::split_caps;

/// Discriminant for everything a command callback can fail with.
///
/// Commands declare which kinds they tolerate; the dispatcher compares the
/// raised kind against that set by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The text-to-speech / audio output path is broken. Always fatal.
    SpeechChannelFailure,
    /// A physical output (pin, indicator, mixer) could not be driven. Always fatal.
    ActuatorFailure,
    ConnectionError,
    NetworkTimeout,
    InvalidResponse,
    /// A bound callback was handed a plugin of the wrong concrete type.
    PluginMismatch,
    /// Author-defined kind, e.g. `Named("CalendarLocked".into())`.
    Named(String),
}

impl FailureKind {
    /// Kinds that can never be declared recoverable.
    pub const RESERVED: [FailureKind; 2] = [
        FailureKind::SpeechChannelFailure,
        FailureKind::ActuatorFailure,
    ];

    /// Reserved by variant or by name, so `Named("ActuatorFailure")` counts.
    pub fn is_reserved(&self) -> bool {
        Self::RESERVED.iter().any(|r| r.name() == self.name())
    }

    /// True for `SpeechChannelFailure` and a `Named` kind spelled the same.
    pub fn is_speech_channel(&self) -> bool {
        self.name() == Self::SpeechChannelFailure.name()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SpeechChannelFailure => "SpeechChannelFailure",
            Self::ActuatorFailure => "ActuatorFailure",
            Self::ConnectionError => "ConnectionError",
            Self::NetworkTimeout => "NetworkTimeout",
            Self::InvalidResponse => "InvalidResponse",
            Self::PluginMismatch => "PluginMismatch",
            Self::Named(name) => name,
        }
    }

    /// The kind as it should be read aloud: `NetworkTimeout` → `Network Timeout`.
    pub fn spoken_name(&self) -> String {
        split_caps(self.name())
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure raised by a command callback or by an Actuator operation.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct CommandFailure {
    pub kind: FailureKind,
    pub message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CommandFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn speech(message: impl Into<String>) -> Self {
        Self::new(FailureKind::SpeechChannelFailure, message)
    }

    pub fn actuator(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ActuatorFailure, message)
    }

    /// Multi-line detail trace: the failure itself followed by its source chain.
    pub fn trace(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            lines.push(format!("caused by: {cause}"));
            current = cause.source();
        }
        lines.join("\n")
    }
}

impl From<reqwest::Error> for CommandFailure {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            FailureKind::NetworkTimeout
        } else if e.is_decode() || e.is_status() {
            FailureKind::InvalidResponse
        } else {
            FailureKind::ConnectionError
        };
        let message = e.url().map_or_else(
            || "request failed".to_string(),
            |url| format!("request to {url} failed"),
        );
        CommandFailure::new(kind, message).with_source(e)
    }
}

/// Crate-wide error type.
///
/// Configuration problems surface synchronously from registration; `Fatal`
/// is what escapes `Runtime::start` after teardown.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("{what} not found at {}", path.display())]
    ResourceNotFound { what: String, path: PathBuf },

    #[error("Settings error: {message}")]
    SettingsError { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Command {command} failed and cannot be recovered: {failure}")]
    Fatal {
        command: String,
        #[source]
        failure: CommandFailure,
    },

    #[error("Listener error: {message}")]
    Listener { message: String },

    #[error("Runtime has been torn down")]
    Stopped,
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        AppError::ConfigurationError {
            message: message.into(),
        }
    }

    /// The failure kind behind a fatal dispatch, if that is what this is.
    pub fn failure_kind(&self) -> Option<&FailureKind> {
        match self {
            AppError::Fatal { failure, .. } => Some(&failure.kind),
            _ => None,
        }
    }
}
