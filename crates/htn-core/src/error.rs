use std::fmt;

/// Which name-keyed registry a failed lookup was against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Sensor,
    Property,
    Condition,
    Task,
    Method,
    Action,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookupKind::Sensor => "sensor",
            LookupKind::Property => "property",
            LookupKind::Condition => "condition",
            LookupKind::Task => "task",
            LookupKind::Method => "method",
            LookupKind::Action => "action",
        };
        write!(f, "{}", name)
    }
}

/// Errors surfaced by the engine.
///
/// Conditions never raise: lookup misses and type mismatches degrade to
/// `false` during evaluation. Tasks, the registry, the planner, and the
/// executor propagate these unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A name was not found in the corresponding registry.
    LookupMissing { kind: LookupKind, name: String },
    /// A property's typed value does not match the comparator's type.
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A primitive task's action returned an error; the tick halts and the
    /// task stays incomplete.
    ActionFailed { task: String, reason: String },
    /// Graph traversal or resolver recursion re-entered the same name.
    CycleDetected { name: String },
    /// The registry was built with dangling references.
    Configuration(String),
}

impl EngineError {
    pub fn missing(kind: LookupKind, name: impl Into<String>) -> Self {
        EngineError::LookupMissing {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::LookupMissing { kind, name } => {
                write!(f, "no {} with name {}", kind, name)
            }
            EngineError::TypeMismatch {
                property,
                expected,
                found,
            } => write!(
                f,
                "property {} read {} where {} was expected",
                property, found, expected
            ),
            EngineError::ActionFailed { task, reason } => {
                write!(f, "task {} action failed: {}", task, reason)
            }
            EngineError::CycleDetected { name } => {
                write!(f, "cycle detected at {}", name)
            }
            EngineError::Configuration(reason) => {
                write!(f, "configuration error: {}", reason)
            }
        }
    }
}

impl std::error::Error for EngineError {}
