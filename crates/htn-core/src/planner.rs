//! Task graph traversal and plan execution.
//!
//! The planner is stateless between calls: each tick it walks the graph from
//! the root, skips complete tasks, and emits the rest with every node's
//! descendants ahead of the node itself, so executing the plan in order runs
//! children before parents.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::EngineError;
use crate::registry::TaskRegistry;
use crate::state::State;
use crate::task::Task;

// ---------------------------------------------------------------------------
// Task graph
// ---------------------------------------------------------------------------

/// A node in the rooted task tree, holding the task's registry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub task: String,
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    pub fn leaf(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(task: impl Into<String>, children: Vec<TaskNode>) -> Self {
        Self {
            task: task.into(),
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskGraph {
    pub root: Option<TaskNode>,
}

impl TaskGraph {
    pub fn new(root: TaskNode) -> Self {
        Self { root: Some(root) }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// An ordered sequence of live task handles; executing them mutates their
/// completion state.
pub type Plan = Vec<Rc<Task>>;

pub struct Planner {
    graph: TaskGraph,
    registry: TaskRegistry,
}

impl Planner {
    pub fn new(graph: TaskGraph, registry: TaskRegistry) -> Self {
        Self { graph, registry }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Walk the graph and collect the incomplete tasks, children before
    /// parents. An absent root yields an empty plan; a node re-entered along
    /// its own ancestor path is a cycle and fails the plan.
    pub fn plan(&self, state: &State) -> Result<Plan, EngineError> {
        trace!(state = %state, "building plan");
        let plan = match &self.graph.root {
            Some(root) => {
                let mut path = Vec::new();
                evaluate_node(root, &self.registry, &mut path)?
            }
            None => Plan::new(),
        };
        debug!(tasks = plan.len(), "plan built");
        Ok(plan)
    }
}

fn evaluate_node(
    node: &TaskNode,
    registry: &TaskRegistry,
    path: &mut Vec<String>,
) -> Result<Plan, EngineError> {
    if path.iter().any(|ancestor| ancestor == &node.task) {
        return Err(EngineError::CycleDetected {
            name: node.task.clone(),
        });
    }
    let task = registry.resolve(&node.task)?;

    let mut tasks = Plan::new();
    if !task.is_complete() {
        tasks.push(task);
    }

    path.push(node.task.clone());
    for child in &node.children {
        let mut subtree = evaluate_node(child, registry, path)?;
        // Children execute before parents: the subtree goes in front.
        subtree.append(&mut tasks);
        tasks = subtree;
    }
    path.pop();

    Ok(tasks)
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Apply a plan to state, in order, propagating the first error. Complete
/// tasks are not skipped; their execute is a no-op, so double execution
/// within a tick is safe.
pub fn execute_plan(plan: &Plan, state: &State) -> Result<(), EngineError> {
    debug!(tasks = plan.len(), "executing plan");
    for task in plan {
        task.execute(state)?;
    }
    Ok(())
}

/// Render a plan as its task-name sequence, for logs and tests.
pub fn plan_names(plan: &Plan) -> Vec<&str> {
    plan.iter().map(|task| task.name()).collect()
}

impl fmt::Display for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph.root {
            Some(root) => write!(f, "Planner rooted at {}", root.task),
            None => write!(f, "Planner with empty graph"),
        }
    }
}
