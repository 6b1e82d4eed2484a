//! State: the name-indexed sensor catalogue plus derived property views.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use contracts::Value;

use crate::error::{EngineError, LookupKind};
use crate::sensor::Sensor;

pub type Sensors = BTreeMap<String, Rc<dyn Sensor>>;

/// A named, typed projection of state. Properties are the only thing
/// conditions read; they may consult any sensor or compute over many, and
/// they never write.
#[derive(Clone)]
pub struct Property {
    name: String,
    eval: Rc<dyn Fn(&State) -> Result<Value, EngineError>>,
}

impl Property {
    pub fn new(
        name: impl Into<String>,
        eval: impl Fn(&State) -> Result<Value, EngineError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            eval: Rc::new(eval),
        }
    }

    /// The common case: a property that reads the sensor of the same name.
    pub fn from_sensor(name: impl Into<String>) -> Self {
        let name = name.into();
        let sensor_name = name.clone();
        Self::new(name, move |state| state.sensor(&sensor_name)?.read())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate strictly against the given state; never cached.
    pub fn evaluate(&self, state: &State) -> Result<Value, EngineError> {
        (self.eval)(state)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("name", &self.name).finish()
    }
}

pub type Properties = BTreeMap<String, Property>;

/// The world as the engine sees it: sensors by name, properties by name.
/// Constructed once per agent and reused across ticks; only the underlying
/// sensors mutate.
pub struct State {
    sensors: Sensors,
    properties: Properties,
}

impl State {
    pub fn new(sensors: Sensors, properties: Properties) -> Self {
        Self {
            sensors,
            properties,
        }
    }

    /// The sensor registered under `name`.
    pub fn sensor(&self, name: &str) -> Result<Rc<dyn Sensor>, EngineError> {
        self.sensors
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::missing(LookupKind::Sensor, name))
    }

    /// Evaluate the property registered under `name`.
    pub fn property(&self, name: &str) -> Result<Value, EngineError> {
        let property = self
            .properties
            .get(name)
            .ok_or_else(|| EngineError::missing(LookupKind::Property, name))?;
        property.evaluate(self)
    }

    pub fn sensor_names(&self) -> impl Iterator<Item = &str> {
        self.sensors.keys().map(String::as_str)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for sensor in self.sensors.values() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", sensor)?;
            first = false;
        }
        Ok(())
    }
}
