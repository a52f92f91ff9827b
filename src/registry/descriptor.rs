use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexSet;

use crate::actuator::Actuator;
use crate::error::{CommandFailure, FailureKind};

/// What a command callback returns: the text to log on success.
pub type CommandOutcome = Result<String, CommandFailure>;

type UnboundFn = dyn Fn(&mut dyn Actuator) -> CommandOutcome;
type BoundFn = dyn Fn(&dyn Any, &mut dyn Actuator) -> CommandOutcome;

/// Whether a callback needs its owning plugin instance at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Bound,
    Unbound,
}

/// Normalized command callback.
pub enum Callback {
    Unbound(Box<UnboundFn>),
    /// Receives the plugin instance as `&dyn Any` and downcasts it.
    Bound(Box<BoundFn>),
}

impl Callback {
    pub fn binding_kind(&self) -> BindingKind {
        match self {
            Callback::Unbound(_) => BindingKind::Unbound,
            Callback::Bound(_) => BindingKind::Bound,
        }
    }

    pub(crate) fn call(
        &self,
        plugin: Option<&dyn Any>,
        actuator: &mut dyn Actuator,
    ) -> CommandOutcome {
        match (self, plugin) {
            (Callback::Unbound(f), _) => f(actuator),
            (Callback::Bound(f), Some(plugin)) => f(plugin, actuator),
            (Callback::Bound(_), None) => Err(CommandFailure::new(
                FailureKind::PluginMismatch,
                "bound command invoked without its plugin instance",
            )),
        }
    }
}

// ── Arity classification ─────────────────────────────────────────

/// Conversion from a plain function or closure into a [`Callback`].
///
/// The marker type records which shape matched, so the binding kind is
/// decided by the callback's parameter list:
///
/// | shape                                   | kind      |
/// |-----------------------------------------|-----------|
/// | `Fn() -> CommandOutcome`                | `Unbound` |
/// | `Fn(&mut dyn Actuator) -> ..`           | `Unbound` |
/// | `Fn(&P) -> ..`                          | `Bound`   |
/// | `Fn(&P, &mut dyn Actuator) -> ..`       | `Bound`   |
pub trait IntoCallback<Marker> {
    fn into_callback(self) -> Callback;
}

pub struct NoArgs;
pub struct ActuatorOnly;
pub struct WithPlugin<P>(PhantomData<fn(&P)>);
pub struct WithPluginAndActuator<P>(PhantomData<fn(&P)>);

fn unbound(f: impl Fn(&mut dyn Actuator) -> CommandOutcome + 'static) -> Callback {
    Callback::Unbound(Box::new(f))
}

fn bound(f: impl Fn(&dyn Any, &mut dyn Actuator) -> CommandOutcome + 'static) -> Callback {
    Callback::Bound(Box::new(f))
}

fn plugin_mismatch<P>() -> CommandFailure {
    CommandFailure::new(
        FailureKind::PluginMismatch,
        format!("bound command expected a {} instance", type_name::<P>()),
    )
}

impl<F> IntoCallback<NoArgs> for F
where
    F: Fn() -> CommandOutcome + 'static,
{
    fn into_callback(self) -> Callback {
        unbound(move |_| self())
    }
}

impl<F> IntoCallback<ActuatorOnly> for F
where
    F: Fn(&mut dyn Actuator) -> CommandOutcome + 'static,
{
    fn into_callback(self) -> Callback {
        unbound(self)
    }
}

impl<F, P> IntoCallback<WithPlugin<P>> for F
where
    F: Fn(&P) -> CommandOutcome + 'static,
    P: Any,
{
    fn into_callback(self) -> Callback {
        bound(move |plugin, _| match plugin.downcast_ref::<P>() {
            Some(p) => self(p),
            None => Err(plugin_mismatch::<P>()),
        })
    }
}

impl<F, P> IntoCallback<WithPluginAndActuator<P>> for F
where
    F: Fn(&P, &mut dyn Actuator) -> CommandOutcome + 'static,
    P: Any,
{
    fn into_callback(self) -> Callback {
        bound(move |plugin, actuator| match plugin.downcast_ref::<P>() {
            Some(p) => self(p, actuator),
            None => Err(plugin_mismatch::<P>()),
        })
    }
}

// ── Descriptor ───────────────────────────────────────────────────

/// Immutable registration record for one invocable action.
///
/// Only [`CommandFactory`](super::factory::CommandFactory) builds these, so a
/// descriptor that exists has already passed validation.
pub struct CommandDescriptor {
    name: String,
    callback: Callback,
    sensitivity: f64,
    recoverable: IndexSet<FailureKind>,
    alt_sound: Option<String>,
}

impl CommandDescriptor {
    pub(super) fn new(
        name: String,
        callback: Callback,
        sensitivity: f64,
        recoverable: IndexSet<FailureKind>,
        alt_sound: Option<String>,
    ) -> Self {
        Self {
            name,
            callback,
            sensitivity,
            recoverable,
            alt_sound,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn recoverable_kinds(&self) -> &IndexSet<FailureKind> {
        &self.recoverable
    }

    pub fn is_recoverable(&self, kind: &FailureKind) -> bool {
        self.recoverable.contains(kind)
    }

    pub fn alt_sound(&self) -> Option<&str> {
        self.alt_sound.as_deref()
    }

    pub fn binding_kind(&self) -> BindingKind {
        self.callback.binding_kind()
    }

    pub(crate) fn callback(&self) -> &Callback {
        &self.callback
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("binding", &self.binding_kind())
            .field("sensitivity", &self.sensitivity)
            .field("recoverable", &self.recoverable)
            .field("alt_sound", &self.alt_sound)
            .finish_non_exhaustive()
    }
}
