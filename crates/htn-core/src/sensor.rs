//! Sensors: named sources of typed observations backing state properties.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use contracts::{Value, TICKS_PER_DAY};

use crate::error::EngineError;

/// One observable quantity. Constructed during setup, lives for the engine
/// lifetime; type-specific setters mutate where supported.
///
/// `as_any` lets property closures downcast a registry handle to the concrete
/// sensor type when they need more than the typed read.
pub trait Sensor: fmt::Display {
    fn read(&self) -> Result<Value, EngineError>;
    fn name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

// ---------------------------------------------------------------------------
// SimpleSensor
// ---------------------------------------------------------------------------

/// A settable scalar sensor. The harness or task actions adjust the value
/// between or during ticks.
pub struct SimpleSensor {
    name: String,
    value: Cell<f64>,
}

impl SimpleSensor {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: Cell::new(value),
        }
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }

    pub fn set(&self, value: f64) {
        self.value.set(value);
    }
}

impl Sensor for SimpleSensor {
    fn read(&self) -> Result<Value, EngineError> {
        Ok(Value::F64(self.value.get()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for SimpleSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value.get())
    }
}

// ---------------------------------------------------------------------------
// TickSensor
// ---------------------------------------------------------------------------

/// Whole ticks elapsed since a start instant, given a tick duration.
pub struct TickSensor {
    name: String,
    started_at: Instant,
    tick_duration: Duration,
}

impl TickSensor {
    pub fn new(name: impl Into<String>, started_at: Instant, tick_duration: Duration) -> Self {
        Self {
            name: name.into(),
            started_at,
            tick_duration: tick_duration.max(Duration::from_nanos(1)),
        }
    }

    /// Ticks elapsed at `now`. Pure over its inputs so tests don't sleep.
    pub fn ticks_at(&self, now: Instant) -> i64 {
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_nanos() / self.tick_duration.as_nanos()) as i64
    }
}

impl Sensor for TickSensor {
    fn read(&self) -> Result<Value, EngineError> {
        Ok(Value::I64(self.ticks_at(Instant::now())))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for TickSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ticks", self.name, self.ticks_at(Instant::now()))
    }
}

// ---------------------------------------------------------------------------
// HourOfDaySensor
// ---------------------------------------------------------------------------

/// Tick count folded onto a 24-hour day.
pub struct HourOfDaySensor {
    ticks: TickSensor,
}

impl HourOfDaySensor {
    pub fn new(name: impl Into<String>, started_at: Instant, tick_duration: Duration) -> Self {
        Self {
            ticks: TickSensor::new(name, started_at, tick_duration),
        }
    }

    pub fn hour_at(&self, now: Instant) -> i64 {
        self.ticks.ticks_at(now) % TICKS_PER_DAY as i64
    }
}

impl Sensor for HourOfDaySensor {
    fn read(&self) -> Result<Value, EngineError> {
        Ok(Value::I64(self.hour_at(Instant::now())))
    }

    fn name(&self) -> &str {
        self.ticks.name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for HourOfDaySensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: hour {}", self.ticks.name(), self.hour_at(Instant::now()))
    }
}
