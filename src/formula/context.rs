//! Evaluation context: variable and sensor resolution for formulas.
//!
//! Formulas never hold references to sprites or scopes; the caller assembles a
//! context for each evaluation. The runtime layers call-frame namespaces over
//! the sprite's own variables; tests often use a bare `HashMap`.

use std::collections::HashMap;

use crate::formula::element::{Sensor, Value};

/// Name-based variable resolution supplied by the caller
pub trait VariableLookup {
    fn variable(&self, name: &str) -> Option<Value>;

    fn list(&self, name: &str) -> Option<Vec<Value>> {
        let _ = name;
        None
    }
}

impl VariableLookup for HashMap<String, Value> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl VariableLookup for ahash::AHashMap<String, Value> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// External sensor subsystem, queried by channel. Readings are numeric.
pub trait SensorSource {
    fn sensor_value(&self, sensor: Sensor) -> Option<f64>;
}

/// Everything a formula may consult while evaluating
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    variables: Option<&'a dyn VariableLookup>,
    sensors: Option<&'a dyn SensorSource>,
}

impl<'a> EvalContext<'a> {
    /// Context that resolves nothing; every reference falls back
    pub fn empty() -> Self {
        Self { variables: None, sensors: None }
    }

    pub fn with_variables(variables: &'a dyn VariableLookup) -> Self {
        Self { variables: Some(variables), sensors: None }
    }

    pub fn new(
        variables: &'a dyn VariableLookup,
        sensors: Option<&'a dyn SensorSource>,
    ) -> Self {
        Self { variables: Some(variables), sensors }
    }

    pub(crate) fn variable(&self, name: &str) -> Option<Value> {
        self.variables.and_then(|v| v.variable(name))
    }

    pub(crate) fn list(&self, name: &str) -> Option<Vec<Value>> {
        self.variables.and_then(|v| v.list(name))
    }

    pub(crate) fn sensor(&self, sensor: Sensor) -> Option<f64> {
        self.sensors.and_then(|s| s.sensor_value(sensor))
    }
}
