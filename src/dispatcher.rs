//! Per-invocation instrumentation and failure classification.
//!
//! [`invoke`] is the wrapper every dispatch goes through: busy indicator on,
//! the one-in-ten alternate sound branch, the callback, indicator off.
//! [`classify`] decides what the runtime does with a failure.

use std::any::Any;

use rand::Rng;
use tracing::{debug, error};

use crate::actuator::Actuator;
use crate::error::{CommandFailure, FailureKind};
use crate::registry::{CommandDescriptor, CommandOutcome};
use crate::settings::INDICATOR_PIN;

/// One in this many invocations of a command with an alternate sound plays
/// the sound instead.
pub const ALT_SOUND_ODDS: u32 = 10;

/// What a dispatch that did not tear the runtime down amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed { output: String },
    /// The command failed with a kind it declared recoverable.
    Recovered { kind: FailureKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Recoverable,
    SpeechChannel,
    Unclassified,
}

/// Run one command with the busy indicator held on for its duration.
///
/// The indicator is switched off on every path. When both the command and
/// the reset fail, the command's failure is returned.
pub fn invoke<R: Rng>(
    descriptor: &CommandDescriptor,
    plugin: Option<&dyn Any>,
    actuator: &mut dyn Actuator,
    rng: &mut R,
) -> CommandOutcome {
    let outcome = actuator
        .set_indicator(INDICATOR_PIN, true)
        .and_then(|()| run_body(descriptor, plugin, actuator, rng));
    let reset = actuator.set_indicator(INDICATOR_PIN, false);

    match (outcome, reset) {
        (Ok(output), Ok(())) => Ok(output),
        (Ok(_), Err(reset_failure)) => Err(reset_failure),
        (Err(failure), Ok(())) => Err(failure),
        (Err(failure), Err(reset_failure)) => {
            error!(
                command = descriptor.name(),
                "Failed to reset busy indicator: {reset_failure}"
            );
            Err(failure)
        }
    }
}

fn run_body<R: Rng>(
    descriptor: &CommandDescriptor,
    plugin: Option<&dyn Any>,
    actuator: &mut dyn Actuator,
    rng: &mut R,
) -> CommandOutcome {
    if let Some(sound) = descriptor.alt_sound() {
        if rng.gen_range(0..ALT_SOUND_ODDS) == 0 {
            debug!(command = descriptor.name(), sound, "Alternate response");
            return actuator.play_sound(sound);
        }
    }
    descriptor.callback().call(plugin, actuator)
}

pub fn classify(descriptor: &CommandDescriptor, failure: &CommandFailure) -> FailureClass {
    if failure.kind.is_speech_channel() {
        FailureClass::SpeechChannel
    } else if descriptor.is_recoverable(&failure.kind) {
        FailureClass::Recoverable
    } else {
        FailureClass::Unclassified
    }
}

/// `Command joke just threw an exception of type Network Timeout.`
pub fn recoverable_notice(command: &str, kind: &FailureKind) -> String {
    format!(
        "Command {command} just threw an exception of type {}.",
        kind.spoken_name()
    )
}

pub fn fatal_notice(command: &str, kind: &FailureKind) -> String {
    format!(
        "{} I cannot recover from this exception.",
        recoverable_notice(command, kind)
    )
}
