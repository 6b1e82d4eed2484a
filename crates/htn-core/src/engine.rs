//! Engine assembly: name-keyed registries validated and wired into a planner.
//!
//! The builder accepts sensors, actions, conditions, properties, method and
//! task specs, and the task graph, all referencing each other by name.
//! `build` validates every cross-reference up front so dangling names surface
//! as configuration errors at construction, not at plan time. After build the
//! registries are effectively read-only; only completion flags, flag
//! conditions, and sensor setters mutate at run time.

use std::collections::BTreeMap;
use std::rc::Rc;

use contracts::assets::{
    ConditionSpec, MethodSpec, TaskGraphSpec, TaskKind, TaskNodeSpec, TaskSpec,
};

use crate::condition::{Condition, TaskCondition};
use crate::error::{EngineError, LookupKind};
use crate::planner::{Planner, TaskGraph, TaskNode};
use crate::registry::TaskRegistry;
use crate::sensor::Sensor;
use crate::state::{Properties, Property, Sensors, State};
use crate::task::{no_op_action, Action, CompoundTask, GoalTask, Method, PrimitiveTask, Task};

pub type Actions = BTreeMap<String, Action>;
pub type Conditions = BTreeMap<String, Rc<Condition>>;
pub type Methods = BTreeMap<String, Rc<Method>>;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owner of all registries plus the planner. Constructed through
/// [`EngineBuilder`]; lives for the agent lifetime.
pub struct Engine {
    sensors: Sensors,
    conditions: Conditions,
    methods: Methods,
    properties: Properties,
    registry: TaskRegistry,
    planner: Planner,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Build the per-agent state view over this engine's sensors and
    /// properties. Construct once and reuse across ticks.
    pub fn state(&self) -> State {
        State::new(self.sensors.clone(), self.properties.clone())
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn sensor(&self, name: &str) -> Result<Rc<dyn Sensor>, EngineError> {
        self.sensors
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::missing(LookupKind::Sensor, name))
    }

    pub fn condition(&self, name: &str) -> Result<Rc<Condition>, EngineError> {
        self.conditions
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::missing(LookupKind::Condition, name))
    }

    pub fn method(&self, name: &str) -> Result<Rc<Method>, EngineError> {
        self.methods
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::missing(LookupKind::Method, name))
    }
}

// ---------------------------------------------------------------------------
// EngineBuilder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct EngineBuilder {
    sensors: Sensors,
    actions: Actions,
    conditions: Conditions,
    properties: Properties,
    method_specs: BTreeMap<String, MethodSpec>,
    task_specs: BTreeMap<String, TaskSpec>,
    graph: TaskGraphSpec,
}

impl EngineBuilder {
    pub fn with_sensor(mut self, sensor: Rc<dyn Sensor>) -> Self {
        self.sensors.insert(sensor.name().to_string(), sensor);
        self
    }

    pub fn with_action(
        mut self,
        name: impl Into<String>,
        action: impl Fn(&State) -> Result<(), EngineError> + 'static,
    ) -> Self {
        self.actions.insert(name.into(), Rc::new(action));
        self
    }

    pub fn with_condition(mut self, name: impl Into<String>, condition: Condition) -> Self {
        self.conditions.insert(name.into(), Rc::new(condition));
        self
    }

    pub fn with_condition_spec(self, name: impl Into<String>, spec: &ConditionSpec) -> Self {
        self.with_condition(name, Condition::from_spec(spec))
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties
            .insert(property.name().to_string(), property);
        self
    }

    /// Register the common property that reads the sensor of the same name.
    pub fn with_sensor_property(self, name: impl Into<String>) -> Self {
        self.with_property(Property::from_sensor(name))
    }

    pub fn with_method(mut self, spec: MethodSpec) -> Self {
        self.method_specs.insert(spec.name.clone(), spec);
        self
    }

    pub fn with_task(mut self, spec: TaskSpec) -> Self {
        self.task_specs.insert(spec.name.clone(), spec);
        self
    }

    pub fn with_graph(mut self, graph: TaskGraphSpec) -> Self {
        self.graph = graph;
        self
    }

    /// Validate every cross-reference and wire the registries into an engine.
    pub fn build(self) -> Result<Engine, EngineError> {
        self.validate()?;

        let registry = TaskRegistry::new();

        // Methods capture their condition handles and the registry; subtasks
        // stay as names resolved at execution time.
        let mut methods = Methods::new();
        for (name, spec) in &self.method_specs {
            let conditions = spec
                .conditions
                .iter()
                .map(|condition_name| Rc::clone(&self.conditions[condition_name]))
                .collect();
            methods.insert(
                name.clone(),
                Rc::new(Method::new(
                    name.clone(),
                    conditions,
                    spec.tasks.clone(),
                    registry.clone(),
                )),
            );
        }

        for spec in self.task_specs.values() {
            registry.register(spec.name.clone(), self.task_builder(spec, &methods))?;
        }

        let graph = TaskGraph {
            root: self.graph.root.as_ref().map(node_from_spec),
        };
        let planner = Planner::new(graph, registry.clone());

        Ok(Engine {
            sensors: self.sensors,
            conditions: self.conditions,
            methods,
            properties: self.properties,
            registry,
            planner,
        })
    }

    fn validate(&self) -> Result<(), EngineError> {
        for (name, spec) in &self.method_specs {
            for condition in &spec.conditions {
                if !self.conditions.contains_key(condition) {
                    return Err(EngineError::Configuration(format!(
                        "method {} condition {} not found",
                        name, condition
                    )));
                }
            }
            for task in &spec.tasks {
                if !self.task_specs.contains_key(task) {
                    return Err(EngineError::Configuration(format!(
                        "method {} task {} not found",
                        name, task
                    )));
                }
            }
        }

        for (name, spec) in &self.task_specs {
            match spec.kind {
                TaskKind::Primitive => {
                    for condition in &spec.preconditions {
                        if !self.conditions.contains_key(condition) {
                            return Err(EngineError::Configuration(format!(
                                "task {} precondition {} not found",
                                name, condition
                            )));
                        }
                    }
                    if let Some(action) = &spec.action {
                        if !self.actions.contains_key(action) {
                            return Err(EngineError::Configuration(format!(
                                "task {} action {} not found",
                                name, action
                            )));
                        }
                    }
                }
                TaskKind::Compound => {
                    for method in &spec.preconditions {
                        if !self.method_specs.contains_key(method) {
                            return Err(EngineError::Configuration(format!(
                                "task {} method {} not found",
                                name, method
                            )));
                        }
                    }
                }
                TaskKind::Goal => {
                    for task in &spec.preconditions {
                        if !self.task_specs.contains_key(task) {
                            return Err(EngineError::Configuration(format!(
                                "task {} precondition task {} not found",
                                name, task
                            )));
                        }
                    }
                }
            }
        }

        for task in self.graph.task_names() {
            if !self.task_specs.contains_key(task) {
                return Err(EngineError::Configuration(format!(
                    "task graph references unknown task {}",
                    task
                )));
            }
        }

        Ok(())
    }

    fn task_builder(
        &self,
        spec: &TaskSpec,
        methods: &Methods,
    ) -> Rc<dyn Fn(&TaskRegistry) -> Result<Task, EngineError>> {
        let name = spec.name.clone();
        let complete = spec.complete;
        match spec.kind {
            TaskKind::Primitive => {
                let preconditions: Vec<Rc<Condition>> = spec
                    .preconditions
                    .iter()
                    .map(|condition| Rc::clone(&self.conditions[condition]))
                    .collect();
                let action = spec
                    .action
                    .as_ref()
                    .map(|action| Rc::clone(&self.actions[action]))
                    .unwrap_or_else(no_op_action);
                Rc::new(move |_registry| {
                    let task = Task::Primitive(PrimitiveTask::new(
                        name.clone(),
                        preconditions.clone(),
                        Rc::clone(&action),
                    ));
                    task.set_complete(complete);
                    Ok(task)
                })
            }
            TaskKind::Compound => {
                let methods: Vec<Rc<Method>> = spec
                    .preconditions
                    .iter()
                    .map(|method| Rc::clone(&methods[method]))
                    .collect();
                Rc::new(move |_registry| {
                    let task = Task::Compound(CompoundTask::new(name.clone(), methods.clone()));
                    task.set_complete(complete);
                    Ok(task)
                })
            }
            TaskKind::Goal => {
                // Goal preconditions resolve their tasks when the goal itself
                // is first resolved; the registry reports cycles instead of
                // recursing forever.
                let precondition_tasks = spec.preconditions.clone();
                Rc::new(move |registry| {
                    let mut conditions = Vec::with_capacity(precondition_tasks.len());
                    for task_name in &precondition_tasks {
                        let task = registry.resolve(task_name)?;
                        conditions.push(TaskCondition::new(task));
                    }
                    let task = Task::Goal(GoalTask::new(name.clone(), conditions));
                    task.set_complete(complete);
                    Ok(task)
                })
            }
        }
    }
}

fn node_from_spec(spec: &TaskNodeSpec) -> TaskNode {
    TaskNode {
        task: spec.task.clone(),
        children: spec.children.iter().map(node_from_spec).collect(),
    }
}
