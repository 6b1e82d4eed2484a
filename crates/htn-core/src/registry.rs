//! Name-indexed lazy task resolution with memoised identities.
//!
//! Tasks reference each other by name with no pre-sorted construction order:
//! a builder closure registered per name instantiates the task on first
//! resolve, and the registry guarantees a single `Rc<Task>` identity per name
//! for the engine lifetime. Re-entrant resolution of a name that is still
//! being built reports a cycle instead of recursing.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::trace;

use crate::error::{EngineError, LookupKind};
use crate::task::Task;

pub type TaskBuilder = Rc<dyn Fn(&TaskRegistry) -> Result<Task, EngineError>>;

#[derive(Default)]
struct RegistryInner {
    tasks: BTreeMap<String, Rc<Task>>,
    builders: BTreeMap<String, TaskBuilder>,
    in_progress: BTreeSet<String>,
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder for `name`, instantiated on first resolve.
    pub fn register(
        &self,
        name: impl Into<String>,
        builder: TaskBuilder,
    ) -> Result<(), EngineError> {
        let name = name.into();
        let mut inner = self.inner.borrow_mut();
        if inner.builders.contains_key(&name) || inner.tasks.contains_key(&name) {
            return Err(EngineError::Configuration(format!(
                "duplicate task name: {}",
                name
            )));
        }
        inner.builders.insert(name, builder);
        Ok(())
    }

    /// Insert an already-built task under `name`.
    pub fn insert(&self, name: impl Into<String>, task: Task) -> Result<Rc<Task>, EngineError> {
        let name = name.into();
        let mut inner = self.inner.borrow_mut();
        if inner.builders.contains_key(&name) || inner.tasks.contains_key(&name) {
            return Err(EngineError::Configuration(format!(
                "duplicate task name: {}",
                name
            )));
        }
        let task = Rc::new(task);
        inner.tasks.insert(name, Rc::clone(&task));
        Ok(task)
    }

    /// Resolve `name` to its task, instantiating and caching it on first
    /// access. The same name always resolves to the same identity.
    pub fn resolve(&self, name: &str) -> Result<Rc<Task>, EngineError> {
        if let Some(task) = self.inner.borrow().tasks.get(name) {
            return Ok(Rc::clone(task));
        }

        let builder = {
            let inner = self.inner.borrow();
            if inner.in_progress.contains(name) {
                return Err(EngineError::CycleDetected {
                    name: name.to_string(),
                });
            }
            match inner.builders.get(name) {
                Some(builder) => Rc::clone(builder),
                None => return Err(EngineError::missing(LookupKind::Task, name)),
            }
        };

        trace!(task = %name, "instantiating task");
        self.inner.borrow_mut().in_progress.insert(name.to_string());
        let built = builder(self);
        self.inner.borrow_mut().in_progress.remove(name);

        let task = Rc::new(built?);
        self.inner
            .borrow_mut()
            .tasks
            .insert(name.to_string(), Rc::clone(&task));
        Ok(task)
    }

    /// Whether `name` is registered, built or not.
    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.borrow();
        inner.tasks.contains_key(name) || inner.builders.contains_key(name)
    }

    /// All registered names, built or not.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        inner
            .tasks
            .keys()
            .chain(inner.builders.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{no_op_action, PrimitiveTask};

    fn primitive(name: &str) -> Task {
        Task::Primitive(PrimitiveTask::new(name, Vec::new(), no_op_action()))
    }

    #[test]
    fn resolve_memoises_a_single_identity() {
        let registry = TaskRegistry::new();
        registry
            .register("A", Rc::new(|_registry| Ok(primitive("A"))))
            .unwrap();

        let first = registry.resolve("A").unwrap();
        let second = registry.resolve("A").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn builder_runs_once() {
        let registry = TaskRegistry::new();
        let built = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&built);
        registry
            .register(
                "A",
                Rc::new(move |_registry| {
                    counter.set(counter.get() + 1);
                    Ok(primitive("A"))
                }),
            )
            .unwrap();

        registry.resolve("A").unwrap();
        registry.resolve("A").unwrap();
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn missing_name_is_a_lookup_error() {
        let registry = TaskRegistry::new();
        assert_eq!(
            registry.resolve("Ghost").unwrap_err(),
            EngineError::missing(LookupKind::Task, "Ghost")
        );
    }

    #[test]
    fn duplicate_registration_is_a_configuration_error() {
        let registry = TaskRegistry::new();
        registry.insert("A", primitive("A")).unwrap();
        assert!(matches!(
            registry.register("A", Rc::new(|_registry| Ok(primitive("A")))),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn self_referential_construction_reports_a_cycle() {
        let registry = TaskRegistry::new();
        registry
            .register(
                "A",
                Rc::new(|registry: &TaskRegistry| {
                    // A task whose construction resolves itself.
                    registry.resolve("A")?;
                    Ok(primitive("A"))
                }),
            )
            .unwrap();

        assert_eq!(
            registry.resolve("A").unwrap_err(),
            EngineError::CycleDetected {
                name: "A".to_string()
            }
        );
    }

    #[test]
    fn mutual_reference_reports_a_cycle() {
        let registry = TaskRegistry::new();
        registry
            .register(
                "A",
                Rc::new(|registry: &TaskRegistry| {
                    registry.resolve("B")?;
                    Ok(primitive("A"))
                }),
            )
            .unwrap();
        registry
            .register(
                "B",
                Rc::new(|registry: &TaskRegistry| {
                    registry.resolve("A")?;
                    Ok(primitive("B"))
                }),
            )
            .unwrap();

        assert!(matches!(
            registry.resolve("A"),
            Err(EngineError::CycleDetected { .. })
        ));
    }

    #[test]
    fn failed_build_is_not_cached() {
        let registry = TaskRegistry::new();
        let attempts = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&attempts);
        registry
            .register(
                "Flaky",
                Rc::new(move |_registry| {
                    counter.set(counter.get() + 1);
                    if counter.get() == 1 {
                        Err(EngineError::Configuration("first build fails".to_string()))
                    } else {
                        Ok(primitive("Flaky"))
                    }
                }),
            )
            .unwrap();

        assert!(registry.resolve("Flaky").is_err());
        assert!(registry.resolve("Flaky").is_ok());
        assert_eq!(attempts.get(), 2);
    }
}
