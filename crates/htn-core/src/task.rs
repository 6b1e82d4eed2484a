//! Tasks and methods: the three task variants plus the ranked
//! condition/subtask bundles compound tasks select among.
//!
//! Completion is latching: once a task marks itself complete it never
//! un-completes inside the engine, and executing a complete task is a no-op.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::condition::{Condition, TaskCondition};
use crate::error::EngineError;
use crate::registry::TaskRegistry;
use crate::state::State;

/// An effect applied to state by a primitive task.
pub type Action = Rc<dyn Fn(&State) -> Result<(), EngineError>>;

/// A no-op action, for tasks whose only effect is latching complete.
pub fn no_op_action() -> Action {
    Rc::new(|_state| Ok(()))
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

pub enum Task {
    Primitive(PrimitiveTask),
    Compound(CompoundTask),
    Goal(GoalTask),
}

impl Task {
    /// Run the task against state. Executing a complete task is a no-op, so
    /// the executor never needs to skip entries.
    pub fn execute(&self, state: &State) -> Result<(), EngineError> {
        match self {
            Task::Primitive(task) => task.execute(state),
            Task::Compound(task) => task.execute(state),
            Task::Goal(task) => task.execute(state),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Task::Primitive(task) => task.is_complete(),
            Task::Compound(task) => task.is_complete(),
            Task::Goal(task) => task.is_complete(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Task::Primitive(task) => task.name(),
            Task::Compound(task) => task.name(),
            Task::Goal(task) => task.name(),
        }
    }

    /// Externally clear or pre-set the completion flag. The engine itself
    /// only ever latches it on.
    pub fn set_complete(&self, complete: bool) {
        match self {
            Task::Primitive(task) => task.complete.set(complete),
            Task::Compound(task) => task.complete.set(complete),
            Task::Goal(task) => task.complete.set(complete),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Primitive(task) => write!(f, "{}", task),
            Task::Compound(task) => write!(f, "{}", task),
            Task::Goal(task) => write!(f, "{}", task),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name())
            .field("complete", &self.is_complete())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PrimitiveTask
// ---------------------------------------------------------------------------

/// Ordered preconditions gating a single action. The task stays incomplete
/// (and eligible next tick) until every precondition holds and the action
/// succeeds.
pub struct PrimitiveTask {
    name: String,
    preconditions: Vec<Rc<Condition>>,
    action: Action,
    complete: Cell<bool>,
}

impl PrimitiveTask {
    pub fn new(name: impl Into<String>, preconditions: Vec<Rc<Condition>>, action: Action) -> Self {
        Self {
            name: name.into(),
            preconditions,
            action,
            complete: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_complete(&self) -> bool {
        self.complete.get()
    }

    fn execute(&self, state: &State) -> Result<(), EngineError> {
        if self.complete.get() {
            return Ok(());
        }
        trace!(task = %self.name, "checking preconditions");
        if !self
            .preconditions
            .iter()
            .all(|condition| condition.is_met(state))
        {
            return Ok(());
        }
        debug!(task = %self.name, "preconditions met, applying action");
        (self.action)(state)?;
        self.complete.set(true);
        Ok(())
    }
}

impl fmt::Display for PrimitiveTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] preconditions: [", self.name)?;
        for (index, condition) in self.preconditions.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", condition)?;
        }
        write!(f, "], complete: {}", self.complete.get())
    }
}

// ---------------------------------------------------------------------------
// GoalTask
// ---------------------------------------------------------------------------

/// Complete exactly when all of its task conditions are complete. Has no
/// action of its own.
pub struct GoalTask {
    name: String,
    preconditions: Vec<TaskCondition>,
    complete: Cell<bool>,
}

impl GoalTask {
    pub fn new(name: impl Into<String>, preconditions: Vec<TaskCondition>) -> Self {
        Self {
            name: name.into(),
            preconditions,
            complete: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_complete(&self) -> bool {
        self.complete.get()
    }

    fn execute(&self, _state: &State) -> Result<(), EngineError> {
        if self.complete.get() {
            return Ok(());
        }
        for condition in &self.preconditions {
            if !condition.is_met() {
                trace!(task = %self.name, condition = %condition, "goal precondition not met");
                return Ok(());
            }
        }
        debug!(task = %self.name, "goal conditions met, goal task is complete");
        self.complete.set(true);
        Ok(())
    }
}

impl fmt::Display for GoalTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal [{}] preconditions: [", self.name)?;
        for (index, condition) in self.preconditions.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", condition)?;
        }
        write!(f, "], complete: {}", self.complete.get())
    }
}

// ---------------------------------------------------------------------------
// CompoundTask
// ---------------------------------------------------------------------------

/// Selects the first applicable method in priority (insertion) order. With
/// no applicable method, or a selected method with nothing left to run, the
/// task is satisfied and latches complete.
pub struct CompoundTask {
    name: String,
    methods: Vec<Rc<Method>>,
    complete: Cell<bool>,
}

impl CompoundTask {
    pub fn new(name: impl Into<String>, methods: Vec<Rc<Method>>) -> Self {
        Self {
            name: name.into(),
            methods,
            complete: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_complete(&self) -> bool {
        self.complete.get()
    }

    pub fn methods(&self) -> &[Rc<Method>] {
        &self.methods
    }

    fn execute(&self, state: &State) -> Result<(), EngineError> {
        if self.complete.get() {
            return Ok(());
        }
        let Some(method) = self
            .methods
            .iter()
            .find(|method| method.is_applicable(state))
        else {
            debug!(task = %self.name, "no applicable method, task is satisfied");
            self.complete.set(true);
            return Ok(());
        };
        debug!(task = %self.name, method = method.name(), "selected method");
        let executed = method.execute(state)?;
        if executed == 0 {
            self.complete.set(true);
        }
        Ok(())
    }
}

impl fmt::Display for CompoundTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compound [{}] methods: [", self.name)?;
        for (index, method) in self.methods.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", method.name())?;
        }
        write!(f, "], complete: {}", self.complete.get())
    }
}

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// A ranked decomposition choice: conditions that gate it plus ordered
/// subtask names resolved at execution time. Methods are not tasks and hold
/// no completion state.
pub struct Method {
    name: String,
    conditions: Vec<Rc<Condition>>,
    subtasks: Vec<String>,
    registry: TaskRegistry,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        conditions: Vec<Rc<Condition>>,
        subtasks: Vec<String>,
        registry: TaskRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            conditions,
            subtasks,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subtasks(&self) -> &[String] {
        &self.subtasks
    }

    /// All conditions met, left to right, short-circuiting.
    pub fn is_applicable(&self, state: &State) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.is_met(state))
    }

    /// Execute incomplete subtasks in reverse insertion order and return how
    /// many ran. The planner emits plans children-first; reversing here keeps
    /// method execution consistent with plan execution order.
    pub fn execute(&self, state: &State) -> Result<usize, EngineError> {
        let mut executed = 0;
        for name in self.subtasks.iter().rev() {
            let task = self.registry.resolve(name)?;
            if task.is_complete() {
                continue;
            }
            trace!(method = %self.name, subtask = %name, "executing subtask");
            task.execute(state)?;
            executed += 1;
        }
        Ok(executed)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method {}: tasks [{}]", self.name, self.subtasks.join(","))
    }
}
