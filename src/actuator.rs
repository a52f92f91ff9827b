//! Physical-world side of the controller: output pins, sound playback, speech.
//!
//! The runtime only depends on the [`Actuator`] trait. [`SimulatedBody`] is the
//! board used when no hardware driver is linked in; it keeps pin state in
//! memory and reports what it would do through `tracing`.

use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::CommandFailure;
use crate::paths;

pub trait Actuator {
    /// Drive a named output on or off.
    fn set_indicator(&mut self, name: &str, on: bool) -> Result<(), CommandFailure>;

    /// Flip a named output. Returns the new state.
    fn toggle(&mut self, name: &str) -> Result<bool, CommandFailure>;

    /// Play a pre-recorded sound by id. Returns a short description of what happened.
    fn play_sound(&mut self, id: &str) -> Result<String, CommandFailure>;

    /// Speak text aloud. Fails with `SpeechChannelFailure` when the channel is broken.
    fn speak(&mut self, text: &str) -> Result<(), CommandFailure>;

    /// Switch every output off and release the audio device.
    fn teardown(&mut self);
}

struct Pin {
    number: u8,
    on: bool,
}

/// In-memory output board.
pub struct SimulatedBody {
    pins: IndexMap<String, Pin>,
    sounds_dir: PathBuf,
    torn_down: bool,
}

impl SimulatedBody {
    pub fn new(pin_mapping: &IndexMap<String, u8>, sounds_dir: PathBuf) -> Self {
        let pins = pin_mapping
            .iter()
            .map(|(name, &number)| (name.clone(), Pin { number, on: false }))
            .collect();
        Self {
            pins,
            sounds_dir,
            torn_down: false,
        }
    }

    pub fn is_on(&self, name: &str) -> Option<bool> {
        self.pins.get(name).map(|p| p.on)
    }

    fn pin_mut(&mut self, name: &str) -> Result<&mut Pin, CommandFailure> {
        if self.torn_down {
            return Err(CommandFailure::actuator("output board has been torn down"));
        }
        self.pins
            .get_mut(name)
            .ok_or_else(|| CommandFailure::actuator(format!("no pin mapped for output '{name}'")))
    }
}

impl Actuator for SimulatedBody {
    fn set_indicator(&mut self, name: &str, on: bool) -> Result<(), CommandFailure> {
        let pin = self.pin_mut(name)?;
        pin.on = on;
        debug!(output = name, pin = pin.number, on, "set output");
        Ok(())
    }

    fn toggle(&mut self, name: &str) -> Result<bool, CommandFailure> {
        let pin = self.pin_mut(name)?;
        pin.on = !pin.on;
        debug!(output = name, pin = pin.number, on = pin.on, "toggled output");
        Ok(pin.on)
    }

    fn play_sound(&mut self, id: &str) -> Result<String, CommandFailure> {
        if self.torn_down {
            return Err(CommandFailure::actuator("mixer has been closed"));
        }
        let path = paths::sound_path(&self.sounds_dir, id);
        if !path.is_file() {
            return Err(CommandFailure::actuator(format!(
                "sound file {} does not exist",
                path.display()
            )));
        }
        info!(sound = id, "playing sound");
        Ok(format!("Played {id}."))
    }

    fn speak(&mut self, text: &str) -> Result<(), CommandFailure> {
        if self.torn_down {
            return Err(CommandFailure::speech("speech channel has been closed"));
        }
        info!(target: "xavier::speech", "{text}");
        Ok(())
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        for pin in self.pins.values_mut() {
            pin.on = false;
        }
        self.torn_down = true;
        debug!("output board torn down");
    }
}
