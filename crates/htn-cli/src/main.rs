//! Tick harness for the planning engine: a built-in vendor demo and a runner
//! for JSON asset directories. The harness owns the cadence; the engine only
//! plans and executes.

use std::env;
use std::rc::Rc;
use std::time::{Duration, Instant};

use contracts::assets::{TaskGraphSpec, TaskKind, TaskNodeSpec, TaskSpec};
use contracts::config::TickConfig;
use contracts::PredicateOp;
use htn_core::actor::{
    Actor, CustomersEngagedSensor, CustomersInRangeSensor, Player, Point, Vendor,
};
use htn_core::condition::{ComparisonCondition, Condition, FlagCondition};
use htn_core::planner::{execute_plan, plan_names};
use htn_core::sensor::HourOfDaySensor;
use htn_core::{Engine, EngineError, State};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("htn-cli <command>");
    println!("commands:");
    println!("  demo [max-ticks]");
    println!("    run the built-in vendor scenario (default max-ticks: 50)");
    println!("  run <config.json> [tick-ms]");
    println!("    load an asset directory and tick until the plan is empty");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("demo") => {
            let max_ticks = args.get(2).and_then(|v| v.parse::<u64>().ok()).unwrap_or(50);
            if let Err(err) = run_demo(max_ticks) {
                eprintln!("error: {}", err);
                std::process::exit(1);
            }
        }
        Some("run") => {
            let Some(config_path) = args.get(2) else {
                eprintln!("error: missing config path");
                print_usage();
                std::process::exit(2);
            };
            let tick_ms = args.get(3).and_then(|v| v.parse::<u64>().ok());
            if let Err(err) = run_assets(config_path, tick_ms) {
                eprintln!("error: {}", err);
                std::process::exit(1);
            }
        }
        _ => {
            print_usage();
        }
    }
}

// ---------------------------------------------------------------------------
// Tick loop
// ---------------------------------------------------------------------------

/// One tick is one `(plan, execute)` pair; the loop ends when the planner
/// finds nothing left to run. `mutate` is the harness's hook for changing the
/// world between ticks.
fn tick_loop(
    engine: &Engine,
    state: &State,
    tick: Duration,
    max_ticks: u64,
    mut mutate: impl FnMut(u64),
) -> Result<u64, EngineError> {
    let mut iteration = 0;
    loop {
        let plan = engine.planner().plan(state)?;
        if plan.is_empty() {
            info!(iteration, "no tasks to execute");
            break;
        }
        info!(iteration, plan = ?plan_names(&plan), "executing plan");
        execute_plan(&plan, state)?;
        info!(iteration, state = %state, "state after iteration");

        mutate(iteration);
        iteration += 1;
        if iteration >= max_ticks {
            info!(iteration, "reached max ticks");
            break;
        }
        std::thread::sleep(tick);
    }
    Ok(iteration)
}

// ---------------------------------------------------------------------------
// Asset runner
// ---------------------------------------------------------------------------

fn run_assets(config_path: &str, tick_ms: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = htn_assets::load_config(config_path)?;
    info!(root = %config.asset_root, "loading domain assets");
    let domain = htn_assets::load_domain(&config)?;
    let engine = domain.apply(Engine::builder()).build()?;
    let state = engine.state();

    let tick = TickConfig {
        tick_duration_ms: tick_ms.unwrap_or_else(|| TickConfig::default().tick_duration_ms),
        max_ticks: None,
    };
    let ticks = tick_loop(
        &engine,
        &state,
        Duration::from_millis(tick.tick_duration_ms),
        tick.max_ticks.unwrap_or(u64::MAX),
        |_iteration| {},
    )?;
    info!(ticks, "domain drained");
    Ok(())
}

// ---------------------------------------------------------------------------
// Vendor demo
// ---------------------------------------------------------------------------

/// A vendor opens their stall, greets the first customer to wander into
/// range, and completes the sale. The harness walks the player one unit
/// closer per tick.
fn run_demo(max_ticks: u64) -> Result<(), Box<dyn std::error::Error>> {
    let vendor = Rc::new(Vendor::new("Vendor", Point::new(0.0, 0.0), 5.0));
    let player = Rc::new(Player::new("Player", Point::new(12.0, 0.0)));
    let bystander = Rc::new(Player::new("Bystander", Point::new(40.0, 0.0)));
    let candidates: Vec<Rc<dyn Actor>> = vec![player.clone(), bystander.clone()];

    let shift_started = Rc::new(FlagCondition::new(false));
    let start_flag = Rc::clone(&shift_started);
    let greet_vendor = Rc::clone(&vendor);
    let greet_player: Rc<dyn Actor> = player.clone();
    let sale_vendor = Rc::clone(&vendor);

    let engine = Engine::builder()
        .with_sensor(Rc::new(HourOfDaySensor::new(
            "HourOfDay",
            Instant::now(),
            Duration::from_secs(1),
        )))
        .with_sensor(Rc::new(CustomersInRangeSensor::new(
            "CustomersInRange",
            Rc::clone(&vendor),
            candidates,
        )))
        .with_sensor(Rc::new(CustomersEngagedSensor::new(
            "CustomersEngaged",
            Rc::clone(&vendor),
        )))
        .with_sensor_property("HourOfDay")
        .with_sensor_property("CustomersInRange")
        .with_sensor_property("CustomersEngaged")
        .with_condition("ShiftStarted", Condition::Flag(Rc::clone(&shift_started)))
        .with_condition(
            "CustomerInRange",
            Condition::Comparison(ComparisonCondition::new(
                "CustomersInRange",
                PredicateOp::Gt,
                0_i64,
            )),
        )
        .with_condition(
            "CustomerEngaged",
            Condition::Comparison(ComparisonCondition::new(
                "CustomersEngaged",
                PredicateOp::Gt,
                0_i64,
            )),
        )
        .with_action("StartShift", move |_state| {
            info!("starting work shift");
            start_flag.set(true);
            Ok(())
        })
        .with_action("GreetCustomer", move |_state| {
            info!(customer = greet_player.name(), "greeting customer");
            greet_vendor.add_customer(Rc::clone(&greet_player));
            Ok(())
        })
        .with_action("CompleteSale", move |_state| {
            info!("completing sale");
            sale_vendor.remove_customer("Player");
            Ok(())
        })
        .with_task(task_spec("StartShift", TaskKind::Primitive, &[], Some("StartShift")))
        .with_task(task_spec(
            "GreetCustomer",
            TaskKind::Primitive,
            &["ShiftStarted", "CustomerInRange"],
            Some("GreetCustomer"),
        ))
        .with_task(task_spec(
            "CompleteSale",
            TaskKind::Primitive,
            &["CustomerEngaged"],
            Some("CompleteSale"),
        ))
        .with_task(task_spec(
            "EndOfDay",
            TaskKind::Goal,
            &["StartShift", "GreetCustomer", "CompleteSale"],
            None,
        ))
        .with_graph(TaskGraphSpec {
            root: Some(TaskNodeSpec {
                task: "EndOfDay".to_string(),
                children: vec![
                    TaskNodeSpec {
                        task: "StartShift".to_string(),
                        children: Vec::new(),
                    },
                    TaskNodeSpec {
                        task: "GreetCustomer".to_string(),
                        children: vec![TaskNodeSpec {
                            task: "CompleteSale".to_string(),
                            children: Vec::new(),
                        }],
                    },
                ],
            }),
        })
        .build()?;

    let state = engine.state();
    let walker = Rc::clone(&player);
    let ticks = tick_loop(
        &engine,
        &state,
        Duration::from_millis(250),
        max_ticks,
        move |_iteration| {
            let at = walker.location();
            if at.x > 0.0 {
                walker.set_location(Point::new(at.x - 1.0, at.y));
            }
        },
    )?;

    let end_of_day = engine.registry().resolve("EndOfDay")?.is_complete();
    info!(ticks, end_of_day, "demo finished");
    Ok(())
}

fn task_spec(name: &str, kind: TaskKind, preconditions: &[&str], action: Option<&str>) -> TaskSpec {
    TaskSpec {
        name: name.to_string(),
        kind,
        preconditions: preconditions.iter().map(|s| s.to_string()).collect(),
        action: action.map(String::from),
        complete: false,
    }
}
