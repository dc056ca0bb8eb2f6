//! Expression tree and evaluation for brick formulas.
//!
//! A formula is an expression tree attached to a brick slot (a motion delta, a
//! user brick parameter binding, a repeat count). Trees are built directly by
//! editors, reconstructed from records, or parsed from text by the record
//! layer. Evaluation is pure and total: unresolved references fall back to
//! zero instead of aborting the running program.

use serde::{Deserialize, Serialize};

use crate::formula::context::EvalContext;
use crate::resources::{Resource, Resources};

/// Binary operators supported in formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Device sensors a formula can read.
///
/// The actual readings come from the external sensor subsystem through
/// [`SensorSource`](crate::formula::SensorSource); this enum only names the
/// channels and the hardware capability each one implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    Loudness,
    FaceDetected,
    FaceSize,
    FacePositionX,
    FacePositionY,
    CompassDirection,
    AccelerationX,
    AccelerationY,
}

impl Sensor {
    /// Canonical lower-snake name used by the text parser and record layer
    pub fn name(&self) -> &'static str {
        match self {
            Sensor::Loudness => "loudness",
            Sensor::FaceDetected => "face_detected",
            Sensor::FaceSize => "face_size",
            Sensor::FacePositionX => "face_position_x",
            Sensor::FacePositionY => "face_position_y",
            Sensor::CompassDirection => "compass_direction",
            Sensor::AccelerationX => "acceleration_x",
            Sensor::AccelerationY => "acceleration_y",
        }
    }

    pub fn from_name(name: &str) -> Option<Sensor> {
        match name {
            "loudness" => Some(Sensor::Loudness),
            "face_detected" => Some(Sensor::FaceDetected),
            "face_size" => Some(Sensor::FaceSize),
            "face_position_x" => Some(Sensor::FacePositionX),
            "face_position_y" => Some(Sensor::FacePositionY),
            "compass_direction" => Some(Sensor::CompassDirection),
            "acceleration_x" => Some(Sensor::AccelerationX),
            "acceleration_y" => Some(Sensor::AccelerationY),
            _ => None,
        }
    }

    /// Hardware capability this sensor channel requires
    pub fn resource(&self) -> Resource {
        match self {
            Sensor::Loudness => Resource::Microphone,
            Sensor::FaceDetected
            | Sensor::FaceSize
            | Sensor::FacePositionX
            | Sensor::FacePositionY => Resource::Camera,
            Sensor::CompassDirection | Sensor::AccelerationX | Sensor::AccelerationY => {
                Resource::DeviceSensor
            }
        }
    }
}

/// Formula AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormulaElement {
    /// A numeric literal (e.g., 42.5)
    Number(f64),
    /// A string literal
    Text(String),
    /// A binary operation (e.g., left + right)
    BinaryOp {
        op: BinaryOp,
        left: Box<FormulaElement>,
        right: Box<FormulaElement>,
    },
    /// A unary operation (e.g., -x, !condition)
    UnaryOp {
        op: UnaryOp,
        operand: Box<FormulaElement>,
    },
    /// A user variable reference, resolved by name at evaluation time
    UserVariable(String),
    /// A user list reference, resolved by name at evaluation time
    UserList(String),
    /// A sensor reading
    Sensor(Sensor),
}

/// Result of evaluating a formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value. Text parses as a number, or coerces to zero.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
        }
    }

    fn truthy(&self) -> bool {
        self.as_number() != 0.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

/// Display formatting for numbers: integral values print without a fraction
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn bool_value(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

impl FormulaElement {
    /// Evaluate this subtree. Total: every node yields a value.
    pub fn evaluate(&self, ctx: &EvalContext) -> Value {
        match self {
            FormulaElement::Number(n) => Value::Number(*n),
            FormulaElement::Text(s) => Value::Text(s.clone()),
            FormulaElement::BinaryOp { op, left, right } => {
                eval_binary(*op, left.evaluate(ctx), right.evaluate(ctx))
            }
            FormulaElement::UnaryOp { op, operand } => {
                let v = operand.evaluate(ctx);
                match op {
                    UnaryOp::Neg => Value::Number(-v.as_number()),
                    UnaryOp::Not => bool_value(!v.truthy()),
                }
            }
            // Unresolved names fall back to zero so a half-edited program
            // keeps running.
            FormulaElement::UserVariable(name) => {
                ctx.variable(name).unwrap_or(Value::Number(0.0))
            }
            FormulaElement::UserList(name) => match ctx.list(name) {
                Some(items) => Value::Text(
                    items.iter().map(|v| v.as_text()).collect::<Vec<_>>().join(" "),
                ),
                None => Value::Number(0.0),
            },
            FormulaElement::Sensor(sensor) => {
                Value::Number(ctx.sensor(*sensor).unwrap_or(0.0))
            }
        }
    }

    /// Visit every node in the subtree
    pub fn for_each(&self, f: &mut impl FnMut(&FormulaElement)) {
        f(self);
        match self {
            FormulaElement::BinaryOp { left, right, .. } => {
                left.for_each(f);
                right.for_each(f);
            }
            FormulaElement::UnaryOp { operand, .. } => operand.for_each(f),
            _ => {}
        }
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Value {
    match op {
        BinaryOp::Add => Value::Number(left.as_number() + right.as_number()),
        BinaryOp::Sub => Value::Number(left.as_number() - right.as_number()),
        BinaryOp::Mul => Value::Number(left.as_number() * right.as_number()),
        BinaryOp::Div => {
            let divisor = right.as_number();
            if divisor == 0.0 {
                // Fail-soft: division by zero yields zero, not a crash
                Value::Number(0.0)
            } else {
                Value::Number(left.as_number() / divisor)
            }
        }
        BinaryOp::Mod => {
            let divisor = right.as_number();
            if divisor == 0.0 {
                Value::Number(0.0)
            } else {
                Value::Number(left.as_number().rem_euclid(divisor))
            }
        }
        BinaryOp::Gt => bool_value(left.as_number() > right.as_number()),
        BinaryOp::Lt => bool_value(left.as_number() < right.as_number()),
        BinaryOp::Gte => bool_value(left.as_number() >= right.as_number()),
        BinaryOp::Lte => bool_value(left.as_number() <= right.as_number()),
        BinaryOp::Eq => bool_value(values_equal(&left, &right)),
        BinaryOp::Neq => bool_value(!values_equal(&left, &right)),
        BinaryOp::And => bool_value(left.truthy() && right.truthy()),
        BinaryOp::Or => bool_value(left.truthy() || right.truthy()),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => a == b,
        _ => left.as_number() == right.as_number(),
    }
}

/// One formula slot owned by a brick.
///
/// Formulas are owned exclusively by the brick holding them; copying a brick
/// deep-copies its formulas. Only user brick definitions are shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    root: FormulaElement,
}

impl Formula {
    pub fn new(root: FormulaElement) -> Self {
        Self { root }
    }

    /// Literal numeric formula
    pub fn number(n: f64) -> Self {
        Self::new(FormulaElement::Number(n))
    }

    /// Formula reading a user variable by name
    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(FormulaElement::UserVariable(name.into()))
    }

    pub fn root(&self) -> &FormulaElement {
        &self.root
    }

    /// Replace the whole tree (editor rebinding a parameter)
    pub fn set_root(&mut self, root: FormulaElement) {
        self.root = root;
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> Value {
        self.root.evaluate(ctx)
    }

    pub fn evaluate_number(&self, ctx: &EvalContext) -> f64 {
        self.evaluate(ctx).as_number()
    }

    /// Hardware capabilities implied by sensor references in this tree
    pub fn required_resources(&self) -> Resources {
        let mut resources = Resources::NONE;
        self.root.for_each(&mut |element| {
            if let FormulaElement::Sensor(sensor) = element {
                resources.insert(sensor.resource());
            }
        });
        resources
    }
}

impl Default for Formula {
    fn default() -> Self {
        Self::number(0.0)
    }
}
