use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use contracts::assets::{TaskGraphSpec, TaskKind, TaskNodeSpec, TaskSpec};
use contracts::PredicateOp;
use htn_core::condition::{ComparisonCondition, Condition, FlagCondition, NotFlagCondition};
use htn_core::planner::{execute_plan, plan_names, TaskGraph, TaskNode};
use htn_core::registry::TaskRegistry;
use htn_core::sensor::{HourOfDaySensor, SimpleSensor, TickSensor};
use htn_core::task::{no_op_action, PrimitiveTask, Task};
use htn_core::{Engine, Planner, State};
use proptest::prelude::*;

fn task_spec(name: &str, kind: TaskKind, preconditions: &[&str], action: Option<&str>) -> TaskSpec {
    TaskSpec {
        name: name.to_string(),
        kind,
        preconditions: preconditions.iter().map(|s| s.to_string()).collect(),
        action: action.map(String::from),
        complete: false,
    }
}

fn node(task: &str, children: Vec<TaskNodeSpec>) -> TaskNodeSpec {
    TaskNodeSpec {
        task: task.to_string(),
        children,
    }
}

fn graph(root: TaskNodeSpec) -> TaskGraphSpec {
    TaskGraphSpec { root: Some(root) }
}

fn set_scalar(state: &State, name: &str, value: f64) {
    let sensor = state.sensor(name).expect("sensor exists");
    sensor
        .as_any()
        .downcast_ref::<SimpleSensor>()
        .expect("scalar sensor")
        .set(value);
}

fn read_scalar(state: &State, name: &str) -> f64 {
    state
        .property(name)
        .expect("property exists")
        .as_f64()
        .expect("numeric property")
}

// ---------------------------------------------------------------------------
// Seed scenarios
// ---------------------------------------------------------------------------

/// S1: a primitive task gated on a flag and a threshold fires on the first
/// tick where both hold, and only once.
#[test]
fn scenario_1_primitive_gating() {
    let gate = Rc::new(FlagCondition::new(false));
    let engine = Engine::builder()
        .with_sensor(Rc::new(SimpleSensor::new("Beta", 0.50)))
        .with_sensor_property("Beta")
        .with_condition("Gate", Condition::Flag(Rc::clone(&gate)))
        .with_condition(
            "BetaReady",
            Condition::Comparison(ComparisonCondition::new("Beta", PredicateOp::Gte, 0.65)),
        )
        .with_action("BumpBeta", |state| {
            let current = state.property("Beta")?.as_f64().unwrap_or(0.0);
            set_scalar(state, "Beta", current + 0.10);
            Ok(())
        })
        .with_task(task_spec(
            "A",
            TaskKind::Primitive,
            &["Gate", "BetaReady"],
            Some("BumpBeta"),
        ))
        .with_graph(graph(node("A", Vec::new())))
        .build()
        .expect("engine builds");

    let state = engine.state();
    let mut fired_at = None;
    for iteration in 0..40 {
        let plan = engine.planner().plan(&state).expect("plan");
        if plan.is_empty() {
            break;
        }
        execute_plan(&plan, &state).expect("execute");
        if fired_at.is_none() && engine.registry().resolve("A").unwrap().is_complete() {
            fired_at = Some(iteration);
        }
        // Harness mutations between ticks.
        if iteration == 3 {
            gate.set(true);
        }
        let beta = read_scalar(&state, "Beta");
        set_scalar(&state, "Beta", beta + 0.01);
    }

    // Beta crosses 0.65 on iteration 15 (0.50 + 15 * 0.01), with the gate
    // already up since iteration 3.
    assert_eq!(fired_at, Some(15));
    let final_beta = read_scalar(&state, "Beta");
    assert!((final_beta - (0.50 + 0.15 + 0.10 + 0.01)).abs() < 1e-9);
    assert!(engine.planner().plan(&state).unwrap().is_empty());
}

/// S2: a goal over three primitives; the first plan is children-first
/// [C, B, A, G] and the loop drains once every flag is up.
#[test]
fn scenario_2_goal_composition() {
    let flags: Vec<Rc<FlagCondition>> = (0..3).map(|_| Rc::new(FlagCondition::new(false))).collect();
    let engine = Engine::builder()
        .with_condition("FlagA", Condition::Flag(Rc::clone(&flags[0])))
        .with_condition("FlagB", Condition::Flag(Rc::clone(&flags[1])))
        .with_condition("FlagC", Condition::Flag(Rc::clone(&flags[2])))
        .with_task(task_spec("A", TaskKind::Primitive, &["FlagA"], None))
        .with_task(task_spec("B", TaskKind::Primitive, &["FlagB"], None))
        .with_task(task_spec("C", TaskKind::Primitive, &["FlagC"], None))
        .with_task(task_spec("G", TaskKind::Goal, &["A", "B", "C"], None))
        .with_graph(graph(node(
            "G",
            vec![node("A", Vec::new()), node("B", vec![node("C", Vec::new())])],
        )))
        .build()
        .expect("engine builds");

    let state = engine.state();
    let first_plan = engine.planner().plan(&state).expect("plan");
    assert_eq!(plan_names(&first_plan), vec!["C", "B", "A", "G"]);

    let mut iterations = 0;
    loop {
        let plan = engine.planner().plan(&state).expect("plan");
        if plan.is_empty() {
            break;
        }
        execute_plan(&plan, &state).expect("execute");
        match iterations {
            2 => flags[0].set(true),
            4 => flags[1].set(true),
            6 => flags[2].set(true),
            _ => {}
        }
        iterations += 1;
        assert!(iterations < 20, "tick loop failed to terminate");
    }

    let goal = engine.registry().resolve("G").unwrap();
    assert!(goal.is_complete());
}

/// S3: a compound task selects the first applicable method in priority
/// order; with empty subtask lists it is satisfied immediately either way.
#[test]
fn scenario_3_compound_priority() {
    let build = |flag_value: bool| {
        let flag = Rc::new(FlagCondition::new(flag_value));
        Engine::builder()
            .with_condition("TrueFlag", Condition::Flag(Rc::clone(&flag)))
            .with_condition(
                "NotTrueFlag",
                Condition::NotFlag(NotFlagCondition::new(Rc::clone(&flag))),
            )
            .with_method(contracts::assets::MethodSpec {
                name: "true".to_string(),
                conditions: vec!["TrueFlag".to_string()],
                tasks: Vec::new(),
            })
            .with_method(contracts::assets::MethodSpec {
                name: "false".to_string(),
                conditions: vec!["NotTrueFlag".to_string()],
                tasks: Vec::new(),
            })
            .with_task(task_spec("K", TaskKind::Compound, &["true", "false"], None))
            .with_graph(graph(node("K", Vec::new())))
            .build()
            .expect("engine builds")
    };

    for flag_value in [true, false] {
        let engine = build(flag_value);
        let state = engine.state();
        let plan = engine.planner().plan(&state).expect("plan");
        assert_eq!(plan_names(&plan), vec!["K"]);
        execute_plan(&plan, &state).expect("execute");
        assert!(engine.registry().resolve("K").unwrap().is_complete());
        assert!(engine.planner().plan(&state).unwrap().is_empty());
    }
}

/// S4: a comparison against an absent property is false on every evaluation,
/// so the task it gates never fires.
#[test]
fn scenario_4_missing_property() {
    let engine = Engine::builder()
        .with_condition(
            "AbsentCheck",
            Condition::Comparison(ComparisonCondition::new("absent", PredicateOp::Gte, 0.0)),
        )
        .with_task(task_spec("A", TaskKind::Primitive, &["AbsentCheck"], None))
        .with_graph(graph(node("A", Vec::new())))
        .build()
        .expect("engine builds");

    let state = engine.state();
    for _ in 0..5 {
        let plan = engine.planner().plan(&state).expect("plan");
        assert_eq!(plan_names(&plan), vec!["A"]);
        execute_plan(&plan, &state).expect("execute");
    }
    assert!(!engine.registry().resolve("A").unwrap().is_complete());
}

/// S5: tick and hour-of-day sensors against fixed instants.
#[test]
fn scenario_5_tick_sensor() {
    let start = Instant::now();
    let ticks = TickSensor::new("Tick", start, Duration::from_secs(1));
    assert_eq!(ticks.ticks_at(start + Duration::from_millis(2_500)), 2);

    // One tick per hour: 25 hours past the start folds to hour 1.
    let hours = HourOfDaySensor::new("HourOfDay", start, Duration::from_secs(3_600));
    assert_eq!(hours.hour_at(start + Duration::from_secs(25 * 3_600)), 1);
}

/// S6: a method with subtasks [X, Y, Z] executes them as Z, Y, X and reports
/// three executed.
#[test]
fn scenario_6_method_reverse_order() {
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let mut builder = Engine::builder();
    for name in ["X", "Y", "Z"] {
        let log = Rc::clone(&log);
        let entry = name.to_string();
        let action_name = format!("Record{name}");
        builder = builder
            .with_action(action_name.clone(), move |_state| {
                log.borrow_mut().push(entry.clone());
                Ok(())
            })
            .with_task(task_spec(name, TaskKind::Primitive, &[], Some(&action_name)));
    }
    let engine = builder
        .with_method(contracts::assets::MethodSpec {
            name: "M".to_string(),
            conditions: Vec::new(),
            tasks: vec!["X".to_string(), "Y".to_string(), "Z".to_string()],
        })
        .with_task(task_spec("K", TaskKind::Compound, &["M"], None))
        .build()
        .expect("engine builds");

    let state = engine.state();
    let executed = engine.method("M").unwrap().execute(&state).expect("method runs");
    assert_eq!(executed, 3);
    assert_eq!(*log.borrow(), vec!["Z", "Y", "X"]);
}

// ---------------------------------------------------------------------------
// Invariant properties over generated graphs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Shape(Vec<Shape>);

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = Just(Shape(Vec::new()));
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop::collection::vec(inner, 0..3).prop_map(Shape)
    })
}

fn build_nodes(shape: &Shape, counter: &mut usize, names: &mut Vec<String>) -> TaskNode {
    let name = format!("task_{}", *counter);
    *counter += 1;
    names.push(name.clone());
    let children = shape
        .0
        .iter()
        .map(|child| build_nodes(child, counter, names))
        .collect();
    TaskNode {
        task: name,
        children,
    }
}

fn descendants(node: &TaskNode, out: &mut Vec<(String, String)>) {
    fn collect(node: &TaskNode, names: &mut Vec<String>) {
        names.push(node.task.clone());
        for child in &node.children {
            collect(child, names);
        }
    }
    for child in &node.children {
        let mut below = Vec::new();
        collect(child, &mut below);
        for name in below {
            out.push((node.task.clone(), name));
        }
        descendants(child, out);
    }
}

fn planner_for(shape: &Shape, complete: &[bool]) -> (Planner, TaskRegistry, Vec<String>, TaskNode) {
    let mut counter = 0;
    let mut names = Vec::new();
    let root = build_nodes(shape, &mut counter, &mut names);
    let registry = TaskRegistry::new();
    for (index, name) in names.iter().enumerate() {
        let task = Task::Primitive(PrimitiveTask::new(name.clone(), Vec::new(), no_op_action()));
        if complete.get(index).copied().unwrap_or(false) {
            task.set_complete(true);
        }
        registry.insert(name.clone(), task).expect("unique names");
    }
    let planner = Planner::new(TaskGraph::new(root.clone()), registry.clone());
    (planner, registry, names, root)
}

fn empty_state() -> State {
    State::new(Default::default(), Default::default())
}

proptest! {
    /// Invariant 1: a plan never contains a task whose completion flag is
    /// already true at emission.
    #[test]
    fn plans_never_contain_complete_tasks(
        shape in arb_shape(),
        complete in prop::collection::vec(any::<bool>(), 0..32),
    ) {
        let (planner, registry, names, _root) = planner_for(&shape, &complete);
        let plan = planner.plan(&empty_state()).expect("plan");
        for task in &plan {
            prop_assert!(!task.is_complete());
        }
        // And every incomplete task in the graph appears exactly once.
        let emitted = plan_names(&plan);
        for (index, name) in names.iter().enumerate() {
            let is_complete = registry.resolve(name).unwrap().is_complete();
            let count = emitted.iter().filter(|n| *n == name).count();
            prop_assert_eq!(count, usize::from(!is_complete), "task {} index {}", name, index);
        }
    }

    /// Invariant 2: plan order is a valid post-order of the graph; every
    /// emitted descendant precedes its emitted ancestor.
    #[test]
    fn plans_order_descendants_before_ancestors(shape in arb_shape()) {
        let (planner, _registry, _names, root) = planner_for(&shape, &[]);
        let plan = planner.plan(&empty_state()).expect("plan");
        let emitted: Vec<String> = plan_names(&plan).into_iter().map(String::from).collect();
        let position = |name: &str| emitted.iter().position(|n| n == name);

        let mut pairs = Vec::new();
        descendants(&root, &mut pairs);
        for (ancestor, descendant) in pairs {
            let (Some(a), Some(d)) = (position(&ancestor), position(&descendant)) else {
                continue;
            };
            prop_assert!(d < a, "descendant {} at {} after ancestor {} at {}", descendant, d, ancestor, a);
        }
    }

    /// Invariant 7: planning twice with no intervening execute yields the
    /// same name sequence.
    #[test]
    fn planning_is_idempotent(
        shape in arb_shape(),
        complete in prop::collection::vec(any::<bool>(), 0..32),
    ) {
        let (planner, _registry, _names, _root) = planner_for(&shape, &complete);
        let state = empty_state();
        let first: Vec<String> = plan_names(&planner.plan(&state).unwrap()).into_iter().map(String::from).collect();
        let second: Vec<String> = plan_names(&planner.plan(&state).unwrap()).into_iter().map(String::from).collect();
        prop_assert_eq!(first, second);
    }

    /// Invariant 9: when every precondition eventually becomes satisfiable,
    /// the tick loop drains in finitely many iterations.
    #[test]
    fn tick_loop_terminates_once_gates_open(
        shape in arb_shape(),
        open_at in prop::collection::vec(0_usize..6, 0..32),
    ) {
        let mut counter = 0;
        let mut names = Vec::new();
        let root = build_nodes(&shape, &mut counter, &mut names);
        let registry = TaskRegistry::new();
        let mut gates = Vec::new();
        for (index, name) in names.iter().enumerate() {
            let gate = Rc::new(FlagCondition::new(false));
            let condition = Rc::new(Condition::Flag(Rc::clone(&gate)));
            gates.push((gate, open_at.get(index).copied().unwrap_or(0)));
            registry
                .insert(
                    name.clone(),
                    Task::Primitive(PrimitiveTask::new(name.clone(), vec![condition], no_op_action())),
                )
                .expect("unique names");
        }
        let planner = Planner::new(TaskGraph::new(root), registry);
        let state = empty_state();

        let mut iterations = 0;
        loop {
            let plan = planner.plan(&state).expect("plan");
            if plan.is_empty() {
                break;
            }
            execute_plan(&plan, &state).expect("execute");
            for (gate, open_at) in &gates {
                if iterations >= *open_at {
                    gate.set(true);
                }
            }
            iterations += 1;
            prop_assert!(iterations <= 8, "loop failed to drain");
        }
    }
}

/// Invariant 8: resolving a name twice returns the same identity.
#[test]
fn resolver_memoisation_preserves_identity() {
    let registry = TaskRegistry::new();
    registry
        .register(
            "A",
            Rc::new(|_registry: &TaskRegistry| {
                Ok(Task::Primitive(PrimitiveTask::new(
                    "A",
                    Vec::new(),
                    no_op_action(),
                )))
            }),
        )
        .unwrap();
    let first = registry.resolve("A").unwrap();
    let second = registry.resolve("A").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

/// Invariant 3: after executing a plan, every primitive whose preconditions
/// held has latched complete.
#[test]
fn execution_latches_ready_primitives() {
    let ready = Rc::new(FlagCondition::new(true));
    let blocked = Rc::new(FlagCondition::new(false));
    let engine = Engine::builder()
        .with_condition("Ready", Condition::Flag(ready))
        .with_condition("Blocked", Condition::Flag(blocked))
        .with_task(task_spec("CanRun", TaskKind::Primitive, &["Ready"], None))
        .with_task(task_spec("CannotRun", TaskKind::Primitive, &["Blocked"], None))
        .with_graph(graph(node(
            "CanRun",
            vec![node("CannotRun", Vec::new())],
        )))
        .build()
        .expect("engine builds");

    let state = engine.state();
    let plan = engine.planner().plan(&state).unwrap();
    execute_plan(&plan, &state).unwrap();
    assert!(engine.registry().resolve("CanRun").unwrap().is_complete());
    assert!(!engine.registry().resolve("CannotRun").unwrap().is_complete());
}
