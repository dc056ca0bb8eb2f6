//! Brick variants and their dispatch contracts.
//!
//! A brick is one executable unit inside a script. The variant set is closed:
//! primitive motion / variable / sound / hardware bricks, a repeat brick that
//! nests child bricks, and the user brick call site. Every variant answers the
//! same three contracts: produce an independent copy, enumerate its directly
//! owned formulas, and report the hardware capabilities it requires.

pub mod user;

use serde::{Deserialize, Serialize};

use crate::core::types::BrickId;
use crate::formula::Formula;
use crate::resources::{Resource, Resources};

pub use user::{DefinitionTable, UiElement, UserBrickDefinition, UserBrickInstance};

/// Motor ports addressable by the hardware bricks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motor {
    A,
    B,
    C,
    All,
}

/// The closed set of brick variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrickKind {
    /// Move the sprite horizontally by the formula value
    ChangeXByN { delta: Formula },
    /// Move the sprite vertically by the formula value
    ChangeYByN { delta: Formula },
    /// Place the sprite at an absolute position
    PlaceAt { x: Formula, y: Formula },
    /// Assign a sprite variable
    SetVariable { name: String, value: Formula },
    /// Speak the evaluated text (text-to-speech hardware)
    Speak { text: Formula },
    /// Stop a motor port
    MotorStop { motor: Motor },
    /// Run a motor port at the evaluated power
    MotorTurn { motor: Motor, power: Formula },
    /// Run the child bricks a formula-determined number of times
    Repeat { times: Formula, body: Vec<Brick> },
    /// Call site of a user-defined brick
    UserBrick(UserBrickInstance),
}

/// One brick placed in a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brick {
    pub id: BrickId,
    pub kind: BrickKind,
}

impl Brick {
    pub fn new(kind: BrickKind) -> Self {
        Self { id: BrickId::new(), kind }
    }

    pub fn change_x_by(delta: Formula) -> Self {
        Self::new(BrickKind::ChangeXByN { delta })
    }

    pub fn change_y_by(delta: Formula) -> Self {
        Self::new(BrickKind::ChangeYByN { delta })
    }

    pub fn place_at(x: Formula, y: Formula) -> Self {
        Self::new(BrickKind::PlaceAt { x, y })
    }

    pub fn set_variable(name: impl Into<String>, value: Formula) -> Self {
        Self::new(BrickKind::SetVariable { name: name.into(), value })
    }

    pub fn speak(text: Formula) -> Self {
        Self::new(BrickKind::Speak { text })
    }

    pub fn motor_stop(motor: Motor) -> Self {
        Self::new(BrickKind::MotorStop { motor })
    }

    pub fn motor_turn(motor: Motor, power: Formula) -> Self {
        Self::new(BrickKind::MotorTurn { motor, power })
    }

    pub fn repeat(times: Formula, body: Vec<Brick>) -> Self {
        Self::new(BrickKind::Repeat { times, body })
    }

    /// Produce an independent copy of this call site for the same sprite.
    ///
    /// Formulas (and repeat bodies) are deep-copied and every copied brick
    /// gets a fresh id. A user brick keeps the *same* definition handle: the
    /// definition is shared by every call site, never duplicated by a copy.
    /// The handle is only meaningful inside the sprite that owns the
    /// definition table, so the copy must stay within that sprite.
    pub fn copy_for_sprite(&self) -> Brick {
        let kind = match &self.kind {
            BrickKind::Repeat { times, body } => BrickKind::Repeat {
                times: times.clone(),
                body: body.iter().map(|b| b.copy_for_sprite()).collect(),
            },
            other => other.clone(),
        };
        Brick { id: BrickId::new(), kind }
    }

    /// The formulas this brick directly owns, in slot order.
    ///
    /// Child bricks of a repeat enumerate their own formulas; a user brick's
    /// bindings are its directly owned formulas.
    pub fn formulas(&self) -> Vec<&Formula> {
        match &self.kind {
            BrickKind::ChangeXByN { delta } | BrickKind::ChangeYByN { delta } => vec![delta],
            BrickKind::PlaceAt { x, y } => vec![x, y],
            BrickKind::SetVariable { value, .. } => vec![value],
            BrickKind::Speak { text } => vec![text],
            BrickKind::MotorStop { .. } => vec![],
            BrickKind::MotorTurn { power, .. } => vec![power],
            BrickKind::Repeat { times, .. } => vec![times],
            BrickKind::UserBrick(instance) => instance.bindings().iter().collect(),
        }
    }

    pub fn formulas_mut(&mut self) -> Vec<&mut Formula> {
        match &mut self.kind {
            BrickKind::ChangeXByN { delta } | BrickKind::ChangeYByN { delta } => vec![delta],
            BrickKind::PlaceAt { x, y } => vec![x, y],
            BrickKind::SetVariable { value, .. } => vec![value],
            BrickKind::Speak { text } => vec![text],
            BrickKind::MotorStop { .. } => vec![],
            BrickKind::MotorTurn { power, .. } => vec![power],
            BrickKind::Repeat { times, .. } => vec![times],
            BrickKind::UserBrick(instance) => instance.bindings_mut().iter_mut().collect(),
        }
    }

    /// Capabilities this brick requires by itself: its own hardware action
    /// plus any sensors referenced by its formulas. Does not follow user brick
    /// call sites; see [`crate::resources::brick_resources`] for the recursive
    /// query.
    ///
    /// A user brick call site contributes nothing of its own. Resources are a
    /// property of the shared definition, so every call site of one definition
    /// reports the same set regardless of how its bindings are edited.
    pub fn own_resources(&self) -> Resources {
        let mut resources = match &self.kind {
            BrickKind::MotorStop { .. } | BrickKind::MotorTurn { .. } => {
                Resources::single(Resource::Motor)
            }
            BrickKind::Speak { .. } => Resources::single(Resource::TextToSpeech),
            BrickKind::UserBrick(_) => return Resources::NONE,
            _ => Resources::NONE,
        };
        for formula in self.formulas() {
            resources |= formula.required_resources();
        }
        resources
    }

    /// Full capability set, following user brick call sites into their
    /// definitions' internal scripts.
    pub fn required_resources(&self, definitions: &DefinitionTable) -> Resources {
        crate::resources::brick_resources(self, definitions)
    }
}
