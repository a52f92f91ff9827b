//! Xavier: a voice-activated home-automation command runtime.
//!
//! Commands are registered on a [`runtime::Runtime`] directly or through
//! [`registry::Plugin`]s, then triggered from the console or a hotword
//! listener. Every dispatch goes through the same instrumentation and
//! failure policy.

pub mod actuator;
pub mod binder;
pub mod dispatcher;
pub mod error;
pub mod journal;
pub mod listener;
pub mod paths;
pub mod plugins;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod util;

#[cfg(test)]
mod testing;
