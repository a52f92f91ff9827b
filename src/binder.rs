//! Registry → trigger-source bindings.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::paths;
use crate::registry::{CommandKey, Registry};

/// Exact-match name lookup for console input.
#[derive(Debug, Clone, Default)]
pub struct ConsoleTable {
    commands: IndexMap<String, CommandKey>,
}

impl ConsoleTable {
    pub fn get(&self, input: &str) -> Option<CommandKey> {
        self.commands.get(input).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

pub fn console_table(registry: &Registry) -> ConsoleTable {
    ConsoleTable {
        commands: registry
            .entries()
            .map(|e| (e.descriptor.name().to_string(), e.key))
            .collect(),
    }
}

/// Index-aligned inputs for a hotword listener: entry `i` of each vector
/// belongs to the same command.
#[derive(Debug, Clone, Default)]
pub struct ListenerBindings {
    pub triggers: Vec<CommandKey>,
    pub models: Vec<PathBuf>,
    pub sensitivities: Vec<f64>,
}

impl ListenerBindings {
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn trigger(&self, index: usize) -> Option<CommandKey> {
        self.triggers.get(index).copied()
    }
}

pub fn listener_bindings(registry: &Registry, models_dir: &Path) -> ListenerBindings {
    let mut bindings = ListenerBindings::default();
    for entry in registry.entries() {
        let d = entry.descriptor;
        bindings.triggers.push(entry.key);
        bindings.models.push(paths::model_path(models_dir, d.name()));
        bindings.sensitivities.push(d.sensitivity());
    }
    bindings
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::error::AppError;
    use crate::registry::{CommandDescriptor, CommandFactory, CommandOutcome, Plugin};

    struct Porch;

    fn porch_light(_: &Porch) -> CommandOutcome {
        Ok("Porch light on.".into())
    }

    impl Plugin for Porch {
        fn name(&self) -> &str {
            "porch"
        }

        fn commands(&self, f: &CommandFactory) -> Result<Vec<CommandDescriptor>, AppError> {
            Ok(vec![f.create("porch_light", porch_light, 0.42, [], None)?])
        }
    }

    fn time() -> CommandOutcome {
        Ok("time".into())
    }

    fn registry() -> Registry {
        let factory = CommandFactory::new(PathBuf::from("sounds"));
        let mut reg = Registry::new();
        reg.register_command(factory.create("time", time, 0.5, [], None).unwrap())
            .unwrap();
        reg.register_plugin(Rc::new(Porch), &factory).unwrap();
        reg
    }

    #[test]
    fn listener_inputs_are_index_aligned() {
        let reg = registry();
        let b = listener_bindings(&reg, Path::new("/srv/models"));

        assert_eq!(b.len(), 2);
        assert_eq!(b.models[0], PathBuf::from("/srv/models/porch_light.pmdl"));
        assert_eq!(b.models[1], PathBuf::from("/srv/models/time.pmdl"));
        assert_eq!(b.sensitivities, vec![0.42, 0.5]);
        for (i, key) in b.triggers.iter().enumerate() {
            let name = reg.get(*key).unwrap().descriptor.name();
            assert!(b.models[i].ends_with(format!("{name}.pmdl")));
        }
        assert!(b.trigger(2).is_none());
    }

    #[test]
    fn console_table_is_exact_match() {
        let reg = registry();
        let table = console_table(&reg);
        assert_eq!(table.len(), 2);
        assert!(table.get("time").is_some());
        assert!(table.get("Time").is_none());
        assert!(table.get("time ").is_none());
        assert_eq!(table.names().collect::<Vec<_>>(), ["porch_light", "time"]);
    }
}
