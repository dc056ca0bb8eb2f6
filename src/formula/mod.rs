//! Formula engine: expression trees evaluated against a caller-supplied
//! context.
//!
//! Bricks own their formulas exclusively; user brick instances keep one
//! formula binding per variable element of their shared definition. Evaluation
//! is pure and fail-soft: unresolved references yield zero so a running
//! program degrades instead of crashing.

pub mod context;
pub mod element;
pub mod parser;

pub use context::{EvalContext, SensorSource, VariableLookup};
pub use element::{BinaryOp, Formula, FormulaElement, Sensor, UnaryOp, Value};
pub use parser::ParseError;
