//! Recording test doubles for the runtime's collaborators.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::actuator::Actuator;
use crate::error::CommandFailure;
use crate::journal::CommandLog;

#[derive(Debug, Default)]
pub struct Events {
    pub indicators: Vec<(String, bool)>,
    pub toggled: Vec<String>,
    pub sounds: Vec<String>,
    pub speech: Vec<String>,
    pub teardowns: usize,
    /// Make every `speak` fail with `SpeechChannelFailure`.
    pub fail_speech: bool,
    /// Make switching an indicator off fail with `ActuatorFailure`.
    pub fail_indicator_reset: bool,
}

impl Events {
    pub fn toggles(&self) -> Vec<String> {
        self.toggled.clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.speech.clone()
    }
}

pub struct RecordingActuator {
    events: Arc<Mutex<Events>>,
}

impl RecordingActuator {
    pub fn new() -> (Self, Arc<Mutex<Events>>) {
        let events = Arc::new(Mutex::new(Events::default()));
        (
            Self {
                events: Arc::clone(&events),
            },
            events,
        )
    }
}

impl Actuator for RecordingActuator {
    fn set_indicator(&mut self, name: &str, on: bool) -> Result<(), CommandFailure> {
        let mut ev = self.events.lock();
        ev.indicators.push((name.to_string(), on));
        if !on && ev.fail_indicator_reset {
            return Err(CommandFailure::actuator("indicator stuck on"));
        }
        Ok(())
    }

    fn toggle(&mut self, name: &str) -> Result<bool, CommandFailure> {
        let mut ev = self.events.lock();
        ev.toggled.push(name.to_string());
        Ok(ev.toggled.iter().filter(|n| *n == name).count() % 2 == 1)
    }

    fn play_sound(&mut self, id: &str) -> Result<String, CommandFailure> {
        self.events.lock().sounds.push(id.to_string());
        Ok(format!("Played {id}."))
    }

    fn speak(&mut self, text: &str) -> Result<(), CommandFailure> {
        let mut ev = self.events.lock();
        if ev.fail_speech {
            return Err(CommandFailure::speech("speaker unplugged"));
        }
        ev.speech.push(text.to_string());
        Ok(())
    }

    fn teardown(&mut self) {
        self.events.lock().teardowns += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Default)]
pub struct LogRecord {
    /// (level, command, output or trace)
    pub entries: Vec<(Level, String, String)>,
    pub closes: usize,
}

impl LogRecord {
    pub fn count(&self, level: Level) -> usize {
        self.entries.iter().filter(|(l, _, _)| *l == level).count()
    }
}

pub struct RecordingLog {
    record: Arc<Mutex<LogRecord>>,
}

impl RecordingLog {
    pub fn new() -> (Self, Arc<Mutex<LogRecord>>) {
        let record = Arc::new(Mutex::new(LogRecord::default()));
        (
            Self {
                record: Arc::clone(&record),
            },
            record,
        )
    }

    fn push(&self, level: Level, command: &str, detail: &str) {
        self.record
            .lock()
            .entries
            .push((level, command.to_string(), detail.to_string()));
    }
}

impl CommandLog for RecordingLog {
    fn log_info(&mut self, command: &str, output: &str) {
        self.push(Level::Info, command, output);
    }

    fn log_warn(&mut self, command: &str, trace: &str) {
        self.push(Level::Warn, command, trace);
    }

    fn log_error(&mut self, command: &str, trace: &str) {
        self.push(Level::Error, command, trace);
    }

    fn close(&mut self) {
        self.record.lock().closes += 1;
    }
}
