//! The command runtime: owns the collaborators, the registry and the run
//! state, and turns dispatch failures into recovery or teardown.

use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use crate::actuator::{Actuator, SimulatedBody};
use crate::binder::{self, ConsoleTable, ListenerBindings};
use crate::dispatcher::{self, DispatchOutcome, FailureClass};
use crate::error::{AppError, CommandFailure, FailureKind};
use crate::journal::{CommandLog, Journal};
use crate::listener::{spawn_line_reader, ListenerFactory, POLL_INTERVAL};
use crate::registry::{
    CommandDescriptor, CommandFactory, CommandKey, IntoCallback, Plugin, Registry,
};
use crate::settings::Settings;

const CONSOLE_PROMPT: &str = "Enter/list/exit: ";

// ── Run state ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    NotStarted = 0,
    Running = 1,
    /// Terminal.
    Stopped = 2,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            _ => RunState::Stopped,
        }
    }
}

/// Shareable handle to a runtime's run state.
///
/// Cloned into signal handlers and listener poll predicates; `stop` is the
/// only transition available from outside the runtime.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicU8>);

impl StopHandle {
    /// Move to `Stopped`. Idempotent, and valid before `start`.
    pub fn stop(&self) {
        self.0.store(RunState::Stopped as u8, Ordering::SeqCst);
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == RunState::Stopped
    }

    /// `NotStarted → Running`. Returns the state that blocked the transition.
    fn begin(&self) -> Result<(), RunState> {
        self.0
            .compare_exchange(
                RunState::NotStarted as u8,
                RunState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(|_| ())
            .map_err(RunState::from_u8)
    }
}

/// Where `start` takes its triggers from.
pub enum StartMode<'a> {
    /// Typed command names on stdin.
    Console,
    Listener(&'a dyn ListenerFactory),
}

// ── Runtime ─────────────────────────────────────────────────────

pub struct Runtime {
    actuator: Option<Box<dyn Actuator>>,
    log: Option<Box<dyn CommandLog>>,
    registry: Registry,
    factory: CommandFactory,
    models_dir: PathBuf,
    rng: StdRng,
    state: StopHandle,
}

impl Runtime {
    pub fn new(
        actuator: Box<dyn Actuator>,
        log: Box<dyn CommandLog>,
        sounds_dir: PathBuf,
        models_dir: PathBuf,
    ) -> Self {
        Self {
            actuator: Some(actuator),
            log: Some(log),
            registry: Registry::new(),
            factory: CommandFactory::new(sounds_dir),
            models_dir,
            rng: StdRng::from_entropy(),
            state: StopHandle::default(),
        }
    }

    /// Runtime over the simulated output board, journaling to the configured
    /// log file (or only to tracing when none is set).
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let body = SimulatedBody::new(&settings.pin_mapping, settings.sounds_dir());
        let log: Box<dyn CommandLog> = match settings.log_path() {
            Some(path) => Box::new(Journal::to_file(&path)?),
            None => Box::new(Journal::console()),
        };
        Ok(Self::new(
            Box::new(body),
            log,
            settings.sounds_dir(),
            settings.models_dir(),
        ))
    }

    /// Make the alternate-sound draws reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn factory(&self) -> &CommandFactory {
        &self.factory
    }

    pub fn state(&self) -> RunState {
        self.state.state()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.state.clone()
    }

    // ── Registration ────────────────────────────────────────────

    pub fn register_plugin(&mut self, plugin: Rc<dyn Plugin>) -> Result<bool, AppError> {
        self.registry.register_plugin(plugin, &self.factory)
    }

    pub fn register_command<M>(
        &mut self,
        name: impl Into<String>,
        callback: impl IntoCallback<M>,
        sensitivity: f64,
        recoverable: impl IntoIterator<Item = FailureKind>,
        alt_sound: Option<&str>,
    ) -> Result<&CommandDescriptor, AppError> {
        let descriptor = self
            .factory
            .create(name, callback, sensitivity, recoverable, alt_sound)?;
        self.registry.register_command(descriptor)
    }

    // ── Dispatch ────────────────────────────────────────────────

    /// Run one registered command and apply the failure policy.
    ///
    /// Declared-recoverable failures are absorbed after a spoken notice.
    /// Anything else tears the runtime down and comes back as
    /// [`AppError::Fatal`].
    pub fn dispatch(&mut self, key: CommandKey) -> Result<DispatchOutcome, AppError> {
        let (command, failure) = {
            let Some(actuator) = self.actuator.as_deref_mut() else {
                return Err(AppError::Stopped);
            };
            let entry = self
                .registry
                .get(key)
                .ok_or_else(|| AppError::config(format!("No command registered at {key:?}")))?;
            let descriptor = entry.descriptor;
            let command = descriptor.name();

            let failure =
                match dispatcher::invoke(descriptor, entry.plugin_any(), actuator, &mut self.rng) {
                    Ok(output) => {
                        if let Some(log) = self.log.as_deref_mut() {
                            log.log_info(command, &output);
                        }
                        return Ok(DispatchOutcome::Completed { output });
                    }
                    Err(failure) => failure,
                };

            match dispatcher::classify(descriptor, &failure) {
                FailureClass::Recoverable => {
                    if let Some(log) = self.log.as_deref_mut() {
                        log.log_warn(command, &failure.trace());
                    }
                    let notice = dispatcher::recoverable_notice(command, &failure.kind);
                    match actuator.speak(&notice) {
                        Ok(()) => {
                            return Ok(DispatchOutcome::Recovered { kind: failure.kind });
                        }
                        Err(speech) => {
                            if let Some(log) = self.log.as_deref_mut() {
                                log.log_error(command, &speech.trace());
                            }
                            (command.to_string(), speech)
                        }
                    }
                }
                FailureClass::SpeechChannel => {
                    if let Some(log) = self.log.as_deref_mut() {
                        log.log_error(command, &failure.trace());
                    }
                    (command.to_string(), failure)
                }
                FailureClass::Unclassified => {
                    if let Some(log) = self.log.as_deref_mut() {
                        log.log_error(command, &failure.trace());
                    }
                    let notice = dispatcher::fatal_notice(command, &failure.kind);
                    if let Err(speech) = actuator.speak(&notice) {
                        error!(command, "Could not report the failure aloud: {speech}");
                    }
                    (command.to_string(), failure)
                }
            }
        };

        self.fail(command, failure)
    }

    pub fn dispatch_by_name(&mut self, name: &str) -> Result<DispatchOutcome, AppError> {
        let key = self
            .registry
            .find(name)
            .map(|e| e.key)
            .ok_or_else(|| AppError::config(format!("No command named '{name}'")))?;
        self.dispatch(key)
    }

    fn fail(&mut self, command: String, failure: CommandFailure) -> Result<DispatchOutcome, AppError> {
        self.teardown();
        Err(AppError::Fatal { command, failure })
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Block in the chosen trigger loop until stopped or a fatal failure.
    pub fn start(&mut self, mode: StartMode<'_>) -> Result<(), AppError> {
        match mode {
            StartMode::Console => {
                let stdout = std::io::stdout();
                self.start_console(BufReader::new(std::io::stdin()), stdout.lock())
            }
            StartMode::Listener(factory) => self.start_listener(factory),
        }
    }

    /// Read command names line by line. `list` prints every name, `exit`,
    /// end of input or a stop request ends the session.
    ///
    /// Input is read on its own thread so a stop request is honored while
    /// the console waits for a line.
    pub fn start_console<R, W>(&mut self, input: R, mut output: W) -> Result<(), AppError>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        if !self.begin()? {
            return Ok(());
        }
        let table = binder::console_table(&self.registry);
        let lines = spawn_line_reader(input);
        let result = self.console_loop(&table, &lines, &mut output);
        self.stop();
        result
    }

    fn console_loop<W: Write>(
        &mut self,
        table: &ConsoleTable,
        lines: &Receiver<io::Result<Vec<u8>>>,
        output: &mut W,
    ) -> Result<(), AppError> {
        writeln!(output, "Opening console...")?;
        while !self.state.is_stopped() {
            write!(output, "{CONSOLE_PROMPT}")?;
            output.flush()?;

            let Some(bytes) = self.next_console_line(lines)? else {
                writeln!(output)?;
                break;
            };
            let Ok(line) = std::str::from_utf8(&bytes) else {
                writeln!(output, "Invalid command")?;
                continue;
            };
            let cmd = line.trim_end_matches(['\r', '\n']);
            if let Some(key) = table.get(cmd) {
                self.dispatch(key)?;
            } else if cmd == "list" {
                for name in table.names() {
                    writeln!(output, "{name}")?;
                }
            } else if cmd == "exit" {
                break;
            } else {
                writeln!(output, "Invalid command")?;
            }
        }
        Ok(())
    }

    /// `None` at end of input or once the runtime is stopped.
    fn next_console_line(
        &self,
        lines: &Receiver<io::Result<Vec<u8>>>,
    ) -> Result<Option<Vec<u8>>, AppError> {
        while !self.state.is_stopped() {
            match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => return Ok(Some(line?)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Hand every command's model and sensitivity to a hotword listener and
    /// dispatch whatever it detects.
    pub fn start_listener(&mut self, factory: &dyn ListenerFactory) -> Result<(), AppError> {
        if !self.begin()? {
            return Ok(());
        }
        let bindings = binder::listener_bindings(&self.registry, &self.models_dir);
        let result = self.listen(factory, &bindings);
        self.stop();
        result
    }

    fn listen(
        &mut self,
        factory: &dyn ListenerFactory,
        bindings: &ListenerBindings,
    ) -> Result<(), AppError> {
        let mut listener = factory.build(&bindings.models, &bindings.sensitivities)?;
        let state = self.state.clone();
        info!(commands = bindings.len(), "Beginning to listen...");

        let result = listener.run(
            &mut |index| match bindings.trigger(index) {
                Some(key) => self.dispatch(key).map(|_| ()),
                None => {
                    warn!(index, "Detection does not match a registered command");
                    Ok(())
                }
            },
            &|| state.state() != RunState::Running,
            POLL_INTERVAL,
        );
        listener.terminate();
        result
    }

    /// Returns `Ok(false)` when the runtime was already stopped.
    fn begin(&self) -> Result<bool, AppError> {
        if self.actuator.is_none() {
            return Err(AppError::Stopped);
        }
        match self.state.begin() {
            Ok(()) => Ok(true),
            Err(RunState::Stopped) => {
                info!("Runtime was stopped before it started");
                Ok(false)
            }
            Err(_) => Err(AppError::config("Runtime is already running")),
        }
    }

    pub fn stop(&self) {
        self.state.stop();
    }

    /// Release the actuator and the log. Runs at most once.
    pub fn teardown(&mut self) {
        self.state.stop();
        let actuator = self.actuator.take();
        let log = self.log.take();
        if actuator.is_none() && log.is_none() {
            return;
        }
        if let Some(mut actuator) = actuator {
            actuator.teardown();
        }
        if let Some(mut log) = log {
            log.close();
        }
        info!("Runtime torn down");
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.teardown();
    }
}
