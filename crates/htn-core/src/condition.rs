//! Conditions: boolean predicates over properties, flags, other conditions,
//! or task completion. Evaluation is side-effect free and never raises;
//! lookup misses and type mismatches degrade to `false`.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use contracts::assets::ConditionSpec;
use contracts::{LogicalOp, PredicateOp, Value};
use tracing::debug;

use crate::state::State;
use crate::task::Task;

/// The condition variants the engine understands.
pub enum Condition {
    Flag(Rc<FlagCondition>),
    NotFlag(NotFlagCondition),
    Comparison(ComparisonCondition),
    PropertyComparison(PropertyComparisonCondition),
    Logical(LogicalCondition),
    Task(TaskCondition),
    Func(FuncCondition),
}

impl Condition {
    pub fn is_met(&self, state: &State) -> bool {
        match self {
            Condition::Flag(condition) => condition.get(),
            Condition::NotFlag(condition) => condition.is_met(),
            Condition::Comparison(condition) => condition.is_met(state),
            Condition::PropertyComparison(condition) => condition.is_met(state),
            Condition::Logical(condition) => condition.is_met(state),
            Condition::Task(condition) => condition.is_met(),
            Condition::Func(condition) => condition.is_met(state),
        }
    }

    /// The flag behind a `Flag` or `NotFlag` variant, for callers that flip
    /// it at run time.
    pub fn as_flag(&self) -> Option<&Rc<FlagCondition>> {
        match self {
            Condition::Flag(flag) => Some(flag),
            Condition::NotFlag(condition) => Some(&condition.flag),
            _ => None,
        }
    }

    /// Build a condition from its loaded spec. Task and func conditions have
    /// no spec form; they are wired programmatically.
    pub fn from_spec(spec: &ConditionSpec) -> Condition {
        match spec {
            ConditionSpec::Flag(flag) => {
                Condition::Flag(Rc::new(FlagCondition::new(flag.value)))
            }
            ConditionSpec::NotFlag(flag) => Condition::NotFlag(NotFlagCondition::new(Rc::new(
                FlagCondition::new(flag.value),
            ))),
            ConditionSpec::Comparison(cmp) => Condition::Comparison(ComparisonCondition::new(
                cmp.property.clone(),
                cmp.op,
                cmp.value,
            )),
            ConditionSpec::PropertyComparison(cmp) => Condition::PropertyComparison(
                PropertyComparisonCondition::new(cmp.left.clone(), cmp.right.clone(), cmp.op),
            ),
            ConditionSpec::Logical(logical) => Condition::Logical(LogicalCondition::new(
                logical.left.clone(),
                logical.right.clone(),
                logical.op,
            )),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Flag(condition) => write!(f, "{}", condition),
            Condition::NotFlag(condition) => write!(f, "{}", condition),
            Condition::Comparison(condition) => write!(f, "{}", condition),
            Condition::PropertyComparison(condition) => write!(f, "{}", condition),
            Condition::Logical(condition) => write!(f, "{}", condition),
            Condition::Task(condition) => write!(f, "{}", condition),
            Condition::Func(condition) => write!(f, "{}", condition),
        }
    }
}

// ---------------------------------------------------------------------------
// Flag / NotFlag
// ---------------------------------------------------------------------------

/// A mutable boolean gate, flipped by the harness or by task actions.
pub struct FlagCondition {
    value: Cell<bool>,
}

impl FlagCondition {
    pub fn new(value: bool) -> Self {
        Self {
            value: Cell::new(value),
        }
    }

    pub fn get(&self) -> bool {
        self.value.get()
    }

    pub fn set(&self, value: bool) {
        self.value.set(value);
    }
}

impl fmt::Display for FlagCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagCondition: {}", self.value.get())
    }
}

/// Inverts a shared flag's current value.
pub struct NotFlagCondition {
    flag: Rc<FlagCondition>,
}

impl NotFlagCondition {
    pub fn new(flag: Rc<FlagCondition>) -> Self {
        Self { flag }
    }

    pub fn is_met(&self) -> bool {
        !self.flag.get()
    }
}

impl fmt::Display for NotFlagCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotFlagCondition: {}", self.flag.get())
    }
}

// ---------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------

/// `property op literal`. A missing property or a variant mismatch evaluates
/// false rather than failing the plan.
pub struct ComparisonCondition {
    property: String,
    op: PredicateOp,
    value: Value,
}

impl ComparisonCondition {
    pub fn new(property: impl Into<String>, op: PredicateOp, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    pub fn is_met(&self, state: &State) -> bool {
        let actual = match state.property(&self.property) {
            Ok(value) => value,
            Err(_) => return false,
        };
        match Value::compare(self.op, &actual, &self.value) {
            Some(met) => met,
            None => {
                debug!(
                    property = %self.property,
                    expected = self.value.kind(),
                    found = actual.kind(),
                    "comparison type mismatch, evaluating false"
                );
                false
            }
        }
    }
}

impl fmt::Display for ComparisonCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComparisonCondition: {} {} {}",
            self.property, self.op, self.value
        )
    }
}

/// Compares the current values of two properties.
pub struct PropertyComparisonCondition {
    left: String,
    right: String,
    op: PredicateOp,
}

impl PropertyComparisonCondition {
    pub fn new(left: impl Into<String>, right: impl Into<String>, op: PredicateOp) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            op,
        }
    }

    pub fn is_met(&self, state: &State) -> bool {
        let (Ok(left), Ok(right)) = (state.property(&self.left), state.property(&self.right))
        else {
            return false;
        };
        match Value::compare(self.op, &left, &right) {
            Some(met) => met,
            None => {
                debug!(
                    left = %self.left,
                    right = %self.right,
                    "property comparison type mismatch, evaluating false"
                );
                false
            }
        }
    }
}

impl fmt::Display for PropertyComparisonCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PropertyComparisonCondition: {} {} {}",
            self.left, self.op, self.right
        )
    }
}

// ---------------------------------------------------------------------------
// Logical
// ---------------------------------------------------------------------------

/// Combines two property readings as booleans (truthy iff > 0). `Not`
/// negates the left operand and never reads the right one.
pub struct LogicalCondition {
    left: String,
    right: String,
    op: LogicalOp,
}

impl LogicalCondition {
    pub fn new(left: impl Into<String>, right: impl Into<String>, op: LogicalOp) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            op,
        }
    }

    pub fn is_met(&self, state: &State) -> bool {
        let Some(left) = read_truthy(state, &self.left) else {
            return false;
        };
        if self.op == LogicalOp::Not {
            return !left;
        }
        let Some(right) = read_truthy(state, &self.right) else {
            return false;
        };
        match self.op {
            LogicalOp::And => left && right,
            LogicalOp::Or => left || right,
            LogicalOp::Xor => left ^ right,
            LogicalOp::Not => unreachable!("handled above"),
        }
    }
}

fn read_truthy(state: &State, property: &str) -> Option<bool> {
    let value = state.property(property).ok()?;
    Some(value.as_f64()? > 0.0)
}

impl fmt::Display for LogicalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            LogicalOp::Not => write!(f, "LogicalCondition: {} {}", self.op, self.left),
            _ => write!(
                f,
                "LogicalCondition: {} {} {}",
                self.left, self.op, self.right
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Task / Func
// ---------------------------------------------------------------------------

/// Met exactly when the referenced task is complete.
pub struct TaskCondition {
    task: Rc<Task>,
}

impl TaskCondition {
    pub fn new(task: Rc<Task>) -> Self {
        Self { task }
    }

    pub fn is_met(&self) -> bool {
        self.task.is_complete()
    }

    pub fn task(&self) -> &Rc<Task> {
        &self.task
    }
}

impl fmt::Display for TaskCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TaskCondition: {}, complete: {}",
            self.task.name(),
            self.task.is_complete()
        )
    }
}

/// An arbitrary named predicate closure.
pub struct FuncCondition {
    name: String,
    evaluator: Rc<dyn Fn(&State) -> bool>,
}

impl FuncCondition {
    pub fn new(name: impl Into<String>, evaluator: impl Fn(&State) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            evaluator: Rc::new(evaluator),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_met(&self, state: &State) -> bool {
        (self.evaluator)(state)
    }
}

impl fmt::Display for FuncCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncCondition: {}", self.name)
    }
}
