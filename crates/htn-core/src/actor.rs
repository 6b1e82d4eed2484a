//! Actor substrate behind the compositional sensors: positioned NPCs and
//! players, and a vendor with an interaction range and an engaged-customer set.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use contracts::Value;

use crate::error::EngineError;
use crate::sensor::Sensor;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

pub trait Actor {
    fn name(&self) -> &str;
    fn is_npc(&self) -> bool;
    fn location(&self) -> Point;
}

pub type Actors = BTreeMap<String, Rc<dyn Actor>>;

// ---------------------------------------------------------------------------
// Concrete actors
// ---------------------------------------------------------------------------

pub struct Npc {
    name: String,
    location: Cell<Point>,
}

impl Npc {
    pub fn new(name: impl Into<String>, location: Point) -> Self {
        Self {
            name: name.into(),
            location: Cell::new(location),
        }
    }

    pub fn set_location(&self, location: Point) {
        self.location.set(location);
    }
}

impl Actor for Npc {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_npc(&self) -> bool {
        true
    }

    fn location(&self) -> Point {
        self.location.get()
    }
}

pub struct Player {
    name: String,
    location: Cell<Point>,
}

impl Player {
    pub fn new(name: impl Into<String>, location: Point) -> Self {
        Self {
            name: name.into(),
            location: Cell::new(location),
        }
    }

    pub fn set_location(&self, location: Point) {
        self.location.set(location);
    }
}

impl Actor for Player {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_npc(&self) -> bool {
        false
    }

    fn location(&self) -> Point {
        self.location.get()
    }
}

// ---------------------------------------------------------------------------
// Vendor
// ---------------------------------------------------------------------------

/// An NPC that serves customers within a fixed interaction range.
pub struct Vendor {
    npc: Npc,
    customers: RefCell<Actors>,
    range: f64,
}

impl Vendor {
    pub fn new(name: impl Into<String>, location: Point, range: f64) -> Self {
        Self {
            npc: Npc::new(name, location),
            customers: RefCell::new(Actors::new()),
            range,
        }
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn add_customer(&self, customer: Rc<dyn Actor>) {
        self.customers
            .borrow_mut()
            .insert(customer.name().to_string(), customer);
    }

    pub fn remove_customer(&self, name: &str) -> Option<Rc<dyn Actor>> {
        self.customers.borrow_mut().remove(name)
    }

    pub fn is_customer(&self, name: &str) -> bool {
        self.customers.borrow().contains_key(name)
    }

    pub fn customers_engaged(&self) -> usize {
        self.customers.borrow().len()
    }
}

impl Actor for Vendor {
    fn name(&self) -> &str {
        self.npc.name()
    }

    fn is_npc(&self) -> bool {
        true
    }

    fn location(&self) -> Point {
        self.npc.location()
    }
}

// ---------------------------------------------------------------------------
// Actor-backed sensors
// ---------------------------------------------------------------------------

/// Counts candidate actors within the vendor's interaction range.
pub struct CustomersInRangeSensor {
    name: String,
    vendor: Rc<Vendor>,
    candidates: Vec<Rc<dyn Actor>>,
}

impl CustomersInRangeSensor {
    pub fn new(
        name: impl Into<String>,
        vendor: Rc<Vendor>,
        candidates: Vec<Rc<dyn Actor>>,
    ) -> Self {
        Self {
            name: name.into(),
            vendor,
            candidates,
        }
    }

    fn count(&self) -> i64 {
        let origin = self.vendor.location();
        self.candidates
            .iter()
            .filter(|actor| distance(actor.location(), origin) <= self.vendor.range())
            .count() as i64
    }
}

impl Sensor for CustomersInRangeSensor {
    fn read(&self) -> Result<Value, EngineError> {
        Ok(Value::I64(self.count()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for CustomersInRangeSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.count())
    }
}

/// Counts the customers the vendor is currently engaged with.
pub struct CustomersEngagedSensor {
    name: String,
    vendor: Rc<Vendor>,
}

impl CustomersEngagedSensor {
    pub fn new(name: impl Into<String>, vendor: Rc<Vendor>) -> Self {
        Self {
            name: name.into(),
            vendor,
        }
    }
}

impl Sensor for CustomersEngagedSensor {
    fn read(&self) -> Result<Value, EngineError> {
        Ok(Value::I64(self.vendor.customers_engaged() as i64))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for CustomersEngagedSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.vendor.customers_engaged())
    }
}
