//! Project records: the serialization surface for the external persistence
//! layer.
//!
//! Two formats are supported. TOML records are the authoring format: formulas
//! are plain strings, user bricks reference definitions by name, and the
//! loader lowers everything into runtime types (assigning handles, parsing
//! formulas, enforcing the cycle rule). JSON snapshots serialize the runtime
//! types directly and reconstruct the graph without any constructor ordering.
//!
//! Record-level definition names must be unique per sprite; runtime identity
//! remains the [`DefinitionId`](crate::core::types::DefinitionId) handle.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bricks::{Brick, BrickKind, Motor};
use crate::core::error::{Result, StageError};
use crate::core::types::DefinitionId;
use crate::formula::Formula;
use crate::stage::script::Script;
use crate::stage::sprite::Sprite;

/// A project: named collection of sprites. Definitions are per-sprite and
/// never shared across sprites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub sprites: Vec<Sprite>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), sprites: Vec::new() }
    }

    pub fn add_sprite(&mut self, sprite: Sprite) -> usize {
        self.sprites.push(sprite);
        self.sprites.len() - 1
    }

    /// Load a project from a TOML record file
    pub fn load_file(path: &Path) -> Result<Project> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Lower a TOML record into a runtime project
    pub fn from_toml_str(content: &str) -> Result<Project> {
        let record: ProjectRecord = toml::from_str(content)
            .map_err(|e| StageError::ProjectParse(e.to_string()))?;
        record.into_project()
    }

    /// Snapshot the whole runtime graph as JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reconstruct a runtime graph from a JSON snapshot
    pub fn from_json_str(content: &str) -> Result<Project> {
        Ok(serde_json::from_str(content)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectRecord {
    name: String,
    #[serde(default)]
    sprites: Vec<SpriteRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpriteRecord {
    name: String,
    #[serde(default)]
    definitions: Vec<DefinitionRecord>,
    #[serde(default)]
    scripts: Vec<ScriptRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct DefinitionRecord {
    name: String,
    #[serde(default)]
    ui: Vec<UiElementRecord>,
    #[serde(default)]
    bricks: Vec<BrickRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
enum UiElementRecord {
    Text(String),
    Variable(String),
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptRecord {
    #[serde(default)]
    bricks: Vec<BrickRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BrickRecord {
    ChangeXByN { delta: String },
    ChangeYByN { delta: String },
    PlaceAt { x: String, y: String },
    SetVariable { name: String, value: String },
    Speak { text: String },
    MotorStop { motor: Motor },
    MotorTurn { motor: Motor, power: String },
    Repeat { times: String, bricks: Vec<BrickRecord> },
    UserBrick {
        definition: String,
        #[serde(default)]
        bindings: Vec<String>,
    },
}

impl ProjectRecord {
    fn into_project(self) -> Result<Project> {
        let mut project = Project::new(self.name);
        for sprite_record in self.sprites {
            project.add_sprite(sprite_record.into_sprite()?);
        }
        Ok(project)
    }
}

impl SpriteRecord {
    fn into_sprite(self) -> Result<Sprite> {
        let mut sprite = Sprite::new(self.name);

        // Handles first, so definition bodies can reference each other.
        let mut by_name: HashMap<String, DefinitionId> = HashMap::new();
        for definition in &self.definitions {
            if by_name.contains_key(&definition.name) {
                return Err(StageError::ProjectParse(format!(
                    "Duplicate definition name in record: {}",
                    definition.name
                )));
            }
            let id = sprite.define_brick(definition.name.clone());
            by_name.insert(definition.name.clone(), id);
        }

        for definition in &self.definitions {
            let id = by_name[&definition.name];
            for element in &definition.ui {
                match element {
                    UiElementRecord::Text(label) => {
                        sprite.add_definition_text(id, label.clone())?
                    }
                    UiElementRecord::Variable(name) => {
                        sprite.add_definition_variable(id, name.clone())?
                    }
                }
            }
        }

        for definition in &self.definitions {
            let id = by_name[&definition.name];
            for record in &definition.bricks {
                let brick = lower_brick(record, &mut sprite, &by_name)?;
                sprite.add_brick_to_definition(id, brick)?;
            }
        }

        for script_record in self.scripts {
            let mut script = Script::new();
            for record in &script_record.bricks {
                script.add_brick(lower_brick(record, &mut sprite, &by_name)?);
            }
            sprite.add_script(script);
        }

        Ok(sprite)
    }
}

fn lower_brick(
    record: &BrickRecord,
    sprite: &mut Sprite,
    by_name: &HashMap<String, DefinitionId>,
) -> Result<Brick> {
    Ok(match record {
        BrickRecord::ChangeXByN { delta } => Brick::change_x_by(Formula::parse(delta)?),
        BrickRecord::ChangeYByN { delta } => Brick::change_y_by(Formula::parse(delta)?),
        BrickRecord::PlaceAt { x, y } => {
            Brick::place_at(Formula::parse(x)?, Formula::parse(y)?)
        }
        BrickRecord::SetVariable { name, value } => {
            Brick::set_variable(name.clone(), Formula::parse(value)?)
        }
        BrickRecord::Speak { text } => Brick::speak(Formula::parse(text)?),
        BrickRecord::MotorStop { motor } => Brick::motor_stop(*motor),
        BrickRecord::MotorTurn { motor, power } => {
            Brick::motor_turn(*motor, Formula::parse(power)?)
        }
        BrickRecord::Repeat { times, bricks } => {
            let body: Result<Vec<Brick>> = bricks
                .iter()
                .map(|child| lower_brick(child, sprite, by_name))
                .collect();
            Brick::repeat(Formula::parse(times)?, body?)
        }
        BrickRecord::UserBrick { definition, bindings } => {
            let id = by_name.get(definition).copied().ok_or_else(|| {
                StageError::ProjectParse(format!(
                    "User brick references unknown definition: {}",
                    definition
                ))
            })?;
            let mut brick = sprite.instantiate(id)?;
            if let BrickKind::UserBrick(instance) = &mut brick.kind {
                for (ordinal, text) in bindings.iter().enumerate() {
                    let formula = Formula::parse(text)?;
                    if let Some(slot) = instance.bindings_mut().get_mut(ordinal) {
                        *slot = formula;
                    }
                }
            }
            brick
        }
    })
}
