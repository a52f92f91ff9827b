//! Command registry: the single owner of every registered descriptor.
//!
//! Commands arrive two ways. Plugins hand over their descriptor set through
//! [`Plugin::commands`]; direct commands are registered one at a time. Both
//! share one namespace, and every registration is all-or-nothing.

pub mod descriptor;
pub mod factory;
pub mod validation;

use std::any::Any;
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, info, warn};

pub use descriptor::{BindingKind, Callback, CommandDescriptor, CommandOutcome, IntoCallback};
pub use factory::CommandFactory;

use crate::error::AppError;

// ── Plugin contract ─────────────────────────────────────────────

/// Access to the concrete plugin type behind a `dyn Plugin`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An object exposing an ordered set of commands.
///
/// `commands` is called once, at registration. Bound descriptors in the
/// returned set receive this instance when they run.
pub trait Plugin: AsAny {
    fn name(&self) -> &str;

    fn commands(&self, factory: &CommandFactory) -> Result<Vec<CommandDescriptor>, AppError>;
}

struct PluginRecord {
    plugin: Rc<dyn Plugin>,
    commands: Vec<CommandDescriptor>,
}

// ── Lookup ──────────────────────────────────────────────────────

/// Stable address of a registered descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKey {
    Plugin { plugin: usize, command: usize },
    Direct(usize),
}

/// A registered descriptor together with the plugin it is bound to.
#[derive(Clone, Copy)]
pub struct Entry<'a> {
    pub key: CommandKey,
    pub descriptor: &'a CommandDescriptor,
    pub plugin: Option<&'a dyn Plugin>,
}

impl Entry<'_> {
    /// The plugin instance as the `&dyn Any` bound callbacks downcast.
    pub fn plugin_any(&self) -> Option<&dyn Any> {
        self.plugin.map(AsAny::as_any)
    }
}

// ── Registry ────────────────────────────────────────────────────

#[derive(Default)]
pub struct Registry {
    names: IndexSet<String>,
    plugins: Vec<PluginRecord>,
    direct: Vec<CommandDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every command a plugin exposes.
    ///
    /// Returns `Ok(false)` with the registry untouched when the instance is
    /// already registered, exposes no commands, or any of its names collides
    /// (with the registry or within its own set). Errors from
    /// [`Plugin::commands`] propagate.
    pub fn register_plugin(
        &mut self,
        plugin: Rc<dyn Plugin>,
        factory: &CommandFactory,
    ) -> Result<bool, AppError> {
        if self.is_registered(&plugin) {
            debug!(plugin = plugin.name(), "Plugin instance already registered");
            return Ok(false);
        }

        let descriptors = plugin.commands(factory)?;
        if descriptors.is_empty() {
            debug!(plugin = plugin.name(), "Plugin exposes no commands");
            return Ok(false);
        }

        let mut incoming: IndexSet<&str> = IndexSet::with_capacity(descriptors.len());
        for d in &descriptors {
            if self.names.contains(d.name()) || !incoming.insert(d.name()) {
                warn!(
                    plugin = plugin.name(),
                    command = d.name(),
                    "Rejected plugin: duplicate command name"
                );
                return Ok(false);
            }
        }

        let (bound, unbound): (Vec<_>, Vec<_>) = descriptors
            .into_iter()
            .partition(|d| d.binding_kind() == BindingKind::Bound);

        for d in bound.iter().chain(&unbound) {
            self.names.insert(d.name().to_string());
        }
        info!(
            plugin = plugin.name(),
            bound = bound.len(),
            unbound = unbound.len(),
            "Registered plugin"
        );
        self.direct.extend(unbound);
        self.plugins.push(PluginRecord {
            plugin,
            commands: bound,
        });
        Ok(true)
    }

    /// Register a self-contained command.
    ///
    /// Bound descriptors have no plugin to run against and are rejected, as
    /// are names already in use.
    pub fn register_command(
        &mut self,
        descriptor: CommandDescriptor,
    ) -> Result<&CommandDescriptor, AppError> {
        if descriptor.binding_kind() == BindingKind::Bound {
            return Err(AppError::config(format!(
                "Command '{}' takes a plugin instance; register it through a plugin",
                descriptor.name()
            )));
        }
        if self.names.contains(descriptor.name()) {
            return Err(AppError::config(format!(
                "Command name '{}' is already registered",
                descriptor.name()
            )));
        }
        self.names.insert(descriptor.name().to_string());
        debug!(command = descriptor.name(), "Registered command");
        self.direct.push(descriptor);
        self.direct
            .last()
            .ok_or_else(|| AppError::config("direct command list is empty after insert"))
    }

    fn is_registered(&self, plugin: &Rc<dyn Plugin>) -> bool {
        self.plugins
            .iter()
            .any(|r| std::ptr::addr_eq(Rc::as_ptr(&r.plugin), Rc::as_ptr(plugin)))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn get(&self, key: CommandKey) -> Option<Entry<'_>> {
        match key {
            CommandKey::Plugin { plugin, command } => {
                let record = self.plugins.get(plugin)?;
                Some(Entry {
                    key,
                    descriptor: record.commands.get(command)?,
                    plugin: Some(&*record.plugin),
                })
            }
            CommandKey::Direct(i) => Some(Entry {
                key,
                descriptor: self.direct.get(i)?,
                plugin: None,
            }),
        }
    }

    /// All commands: plugin commands in registration order, then direct ones.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> {
        let bound = self.plugins.iter().enumerate().flat_map(|(p, record)| {
            record
                .commands
                .iter()
                .enumerate()
                .map(move |(c, descriptor)| Entry {
                    key: CommandKey::Plugin {
                        plugin: p,
                        command: c,
                    },
                    descriptor,
                    plugin: Some(&*record.plugin),
                })
        });
        let direct = self.direct.iter().enumerate().map(|(i, descriptor)| Entry {
            key: CommandKey::Direct(i),
            descriptor,
            plugin: None,
        });
        bound.chain(direct)
    }

    pub fn find(&self, name: &str) -> Option<Entry<'_>> {
        self.entries().find(|e| e.descriptor.name() == name)
    }

    pub fn sensitivity_of(&self, name: &str) -> Option<f64> {
        self.find(name).map(|e| e.descriptor.sensitivity())
    }
}
