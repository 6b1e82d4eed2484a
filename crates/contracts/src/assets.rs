//! Asset spec types: the JSON shapes the loader reads and the engine builder
//! consumes. Every spec references its collaborators by name; dangling names
//! surface as configuration errors when the engine is built.

use serde::{Deserialize, Serialize};

use crate::{LogicalOp, PredicateOp, Value};

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// A condition description. On disk the kind is carried by the directory the
/// file lives in; embedded in a single document it is carried by the `type`
/// field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionSpec {
    Flag(FlagSpec),
    #[serde(rename = "notflag")]
    NotFlag(NotFlagSpec),
    Comparison(ComparisonSpec),
    #[serde(rename = "propertycomparison")]
    PropertyComparison(PropertyComparisonSpec),
    Logical(LogicalSpec),
}

impl ConditionSpec {
    /// The directory tag this spec kind loads from.
    pub fn kind(&self) -> &'static str {
        match self {
            ConditionSpec::Flag(_) => "flag",
            ConditionSpec::NotFlag(_) => "notflag",
            ConditionSpec::Comparison(_) => "comparison",
            ConditionSpec::PropertyComparison(_) => "propertycomparison",
            ConditionSpec::Logical(_) => "logical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlagSpec {
    #[serde(default)]
    pub value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotFlagSpec {
    #[serde(default)]
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSpec {
    pub property: String,
    pub op: PredicateOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyComparisonSpec {
    pub left: String,
    pub right: String,
    pub op: PredicateOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalSpec {
    pub left: String,
    /// Ignored under `Not`.
    #[serde(default)]
    pub right: String,
    pub op: LogicalOp,
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// A settable scalar sensor description (the only sensor kind with a JSON
/// form; clock- and actor-backed sensors are constructed programmatically).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    #[serde(default)]
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Tasks and methods
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Primitive,
    Compound,
    Goal,
}

impl TaskKind {
    /// Load order: primitive specs first so compound and goal references
    /// resolve against already-known names.
    pub const LOAD_ORDER: [TaskKind; 3] = [TaskKind::Primitive, TaskKind::Compound, TaskKind::Goal];

    pub fn dir_name(&self) -> &'static str {
        match self {
            TaskKind::Primitive => "primitive",
            TaskKind::Compound => "compound",
            TaskKind::Goal => "goal",
        }
    }
}

/// A task description. `preconditions` is interpreted per kind: condition
/// names for primitive tasks, method names for compound tasks, task names for
/// goal tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub complete: bool,
}

/// A ranked decomposition choice for a compound task: condition names that
/// gate it and the subtask names it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}

// ---------------------------------------------------------------------------
// Task graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNodeSpec {
    pub task: String,
    #[serde(default)]
    pub children: Vec<TaskNodeSpec>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskGraphSpec {
    #[serde(default)]
    pub root: Option<TaskNodeSpec>,
}

impl TaskGraphSpec {
    /// Every task name referenced anywhere in the graph.
    pub fn task_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(root) = &self.root {
            collect_names(root, &mut names);
        }
        names
    }
}

fn collect_names<'a>(node: &'a TaskNodeSpec, names: &mut Vec<&'a str>) {
    names.push(node.task.as_str());
    for child in &node.children {
        collect_names(child, names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_spec_tagged_round_trip() {
        let spec = ConditionSpec::Comparison(ComparisonSpec {
            property: "Beta".to_string(),
            op: PredicateOp::Gte,
            value: Value::F64(0.65),
        });
        let encoded = serde_json::to_string(&spec).expect("serialize");
        assert!(encoded.contains("\"type\":\"comparison\""));
        let decoded: ConditionSpec = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(spec, decoded);
    }

    #[test]
    fn task_spec_defaults() {
        let spec: TaskSpec = serde_json::from_str(r#"{"name": "Wait"}"#).expect("deserialize");
        assert_eq!(spec.kind, TaskKind::Primitive);
        assert!(spec.preconditions.is_empty());
        assert!(spec.action.is_none());
        assert!(!spec.complete);
    }

    #[test]
    fn task_graph_collects_all_names() {
        let graph: TaskGraphSpec = serde_json::from_str(
            r#"{"root": {"task": "G", "children": [
                {"task": "A"},
                {"task": "B", "children": [{"task": "C"}]}
            ]}}"#,
        )
        .expect("deserialize");
        assert_eq!(graph.task_names(), vec!["G", "A", "B", "C"]);
    }

    #[test]
    fn empty_graph_has_no_names() {
        let graph = TaskGraphSpec::default();
        assert!(graph.task_names().is_empty());
    }
}
