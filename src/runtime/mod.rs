//! Script interpreter.
//!
//! Execution is synchronous and single-threaded: one sprite's script runs
//! brick by brick against the sprite's own state. A user brick call site
//! evaluates its formula bindings in the *caller's* context, pushes a call
//! frame mapping the definition's schema variable names to those values, runs
//! the definition's internal script under that frame, and pops the frame
//! before the outer script resumes.
//!
//! Hardware effects (motors, speech) are owned by external subsystems; the
//! interpreter evaluates their formulas and emits trace events so the model
//! stays testable without hardware attached.

use ahash::AHashMap;

use crate::bricks::{Brick, BrickKind, DefinitionTable};
use crate::core::error::{Result, StageError};
use crate::formula::{EvalContext, Formula, SensorSource, Value, VariableLookup};
use crate::stage::script::Script;
use crate::stage::sprite::Look;
use crate::stage::variables::VariableStore;

/// Backstop against definition graphs built by bypassing the sprite's cycle
/// rejection (e.g. hand-assembled records).
pub const MAX_CALL_DEPTH: usize = 64;

/// Stack of call-frame namespaces, innermost last.
///
/// Lookup searches frames innermost-first, then falls through to the sprite's
/// variable store. Each user brick call gets a fresh frame; frames are torn
/// down when the call returns, so bound parameters are visible only inside
/// the definition's internal script for that call.
#[derive(Debug, Default)]
pub struct CallScopes {
    frames: Vec<AHashMap<String, Value>>,
}

impl CallScopes {
    fn push_frame(&mut self, bindings: Vec<(String, Value)>) {
        self.frames.push(bindings.into_iter().collect());
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    /// Update `name` in the innermost frame that defines it. Returns false if
    /// no frame does, in which case the sprite store is the write target.
    fn set_existing(&mut self, name: &str, value: Value) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        false
    }
}

/// Call frames layered over the sprite's own variables
struct ScopedVariables<'a> {
    scopes: &'a CallScopes,
    store: &'a VariableStore,
}

impl VariableLookup for ScopedVariables<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.scopes.get(name).or_else(|| self.store.variable(name))
    }

    fn list(&self, name: &str) -> Option<Vec<Value>> {
        self.store.list(name)
    }
}

/// Execute a script against sprite state. Entry point used by
/// [`Sprite::run_script`](crate::stage::Sprite::run_script).
pub fn execute_script(
    script: &Script,
    definitions: &DefinitionTable,
    look: &mut Look,
    variables: &mut VariableStore,
    sensors: Option<&dyn SensorSource>,
) -> Result<()> {
    let mut scopes = CallScopes::default();
    run_script(script, definitions, look, variables, sensors, &mut scopes)
}

fn run_script(
    script: &Script,
    definitions: &DefinitionTable,
    look: &mut Look,
    variables: &mut VariableStore,
    sensors: Option<&dyn SensorSource>,
    scopes: &mut CallScopes,
) -> Result<()> {
    for brick in script.iter() {
        run_brick(brick, definitions, look, variables, sensors, scopes)?;
    }
    Ok(())
}

fn run_brick(
    brick: &Brick,
    definitions: &DefinitionTable,
    look: &mut Look,
    variables: &mut VariableStore,
    sensors: Option<&dyn SensorSource>,
    scopes: &mut CallScopes,
) -> Result<()> {
    match &brick.kind {
        BrickKind::ChangeXByN { delta } => {
            look.position.x += evaluate(delta, variables, sensors, scopes).as_number() as f32;
        }
        BrickKind::ChangeYByN { delta } => {
            look.position.y += evaluate(delta, variables, sensors, scopes).as_number() as f32;
        }
        BrickKind::PlaceAt { x, y } => {
            look.position.x = evaluate(x, variables, sensors, scopes).as_number() as f32;
            look.position.y = evaluate(y, variables, sensors, scopes).as_number() as f32;
        }
        BrickKind::SetVariable { name, value } => {
            let value = evaluate(value, variables, sensors, scopes);
            if !scopes.set_existing(name, value.clone()) {
                variables.set(name.clone(), value);
            }
        }
        BrickKind::Speak { text } => {
            // Audio output belongs to the external sound subsystem.
            let spoken = evaluate(text, variables, sensors, scopes).as_text();
            tracing::debug!(text = %spoken, "speak");
        }
        BrickKind::MotorStop { motor } => {
            // Hardware dispatch happens in the external device layer.
            tracing::debug!(?motor, "motor stop");
        }
        BrickKind::MotorTurn { motor, power } => {
            let power = evaluate(power, variables, sensors, scopes).as_number();
            tracing::debug!(?motor, power, "motor turn");
        }
        BrickKind::Repeat { times, body } => {
            let count = evaluate(times, variables, sensors, scopes).as_number();
            let count = if count.is_finite() { count.floor().max(0.0) as u64 } else { 0 };
            for _ in 0..count {
                for child in body {
                    run_brick(child, definitions, look, variables, sensors, scopes)?;
                }
            }
        }
        BrickKind::UserBrick(instance) => {
            if scopes.depth() >= MAX_CALL_DEPTH {
                return Err(StageError::CallDepthExceeded(MAX_CALL_DEPTH));
            }
            let definition = definitions
                .get(instance.definition())
                .ok_or(StageError::DefinitionNotFound(instance.definition()))?;

            // Bindings evaluate in the caller's context, before the new frame
            // exists.
            let frame = {
                let lookup = ScopedVariables { scopes: &*scopes, store: variables };
                instance.evaluate_bindings(definition, &EvalContext::new(&lookup, sensors))
            };

            scopes.push_frame(frame);
            let result = run_script(
                definition.script(),
                definitions,
                look,
                variables,
                sensors,
                scopes,
            );
            scopes.pop_frame();
            result?;
        }
    }
    Ok(())
}

fn evaluate(
    formula: &Formula,
    variables: &VariableStore,
    sensors: Option<&dyn SensorSource>,
    scopes: &CallScopes,
) -> Value {
    let lookup = ScopedVariables { scopes, store: variables };
    formula.evaluate(&EvalContext::new(&lookup, sensors))
}
