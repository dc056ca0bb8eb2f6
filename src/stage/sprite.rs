//! Sprites: named actors owning scripts, user brick definitions, variables
//! and the slice of visual state primitive bricks touch.
//!
//! The sprite is the single owner of its definition table and of every script
//! that can hold call sites, so it is the one place schema edits and cascading
//! deletes can be applied atomically across all instances.

use serde::{Deserialize, Serialize};

use crate::bricks::{Brick, BrickKind, DefinitionTable, UiElement, UserBrickDefinition,
                    UserBrickInstance};
use crate::core::error::{Result, StageError};
use crate::core::types::{DefinitionId, SpriteId, Vec2};
use crate::formula::SensorSource;
use crate::resources::Resources;
use crate::stage::script::Script;
use crate::stage::variables::VariableStore;

/// Visual state primitive bricks mutate. The rest of the render state lives
/// in the external scene layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Look {
    pub position: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprite {
    pub id: SpriteId,
    pub name: String,
    pub look: Look,
    pub variables: VariableStore,
    scripts: Vec<Script>,
    definitions: DefinitionTable,
}

impl Sprite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SpriteId::new(),
            name: name.into(),
            look: Look::default(),
            variables: VariableStore::new(),
            scripts: Vec::new(),
            definitions: DefinitionTable::new(),
        }
    }

    // ---- scripts ----

    /// Add a script, returning its index
    pub fn add_script(&mut self, script: Script) -> usize {
        self.scripts.push(script);
        self.scripts.len() - 1
    }

    pub fn script(&self, index: usize) -> Option<&Script> {
        self.scripts.get(index)
    }

    pub fn script_mut(&mut self, index: usize) -> Option<&mut Script> {
        self.scripts.get_mut(index)
    }

    pub fn scripts(&self) -> impl Iterator<Item = &Script> {
        self.scripts.iter()
    }

    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    // ---- user brick definitions ----

    pub fn definitions(&self) -> &DefinitionTable {
        &self.definitions
    }

    /// Create a new user brick definition with an empty schema and body
    pub fn define_brick(&mut self, name: impl Into<String>) -> DefinitionId {
        self.definitions.insert(UserBrickDefinition::new(name))
    }

    pub fn definition(&self, id: DefinitionId) -> Option<&UserBrickDefinition> {
        self.definitions.get(id)
    }

    /// Create a call site of `definition`.
    ///
    /// A dangling handle is a hard caller error: instances of a removed
    /// definition must never come into existence.
    pub fn instantiate(&mut self, definition: DefinitionId) -> Result<Brick> {
        let def = self
            .definitions
            .get(definition)
            .ok_or(StageError::DefinitionNotFound(definition))?;
        Ok(Brick::new(BrickKind::UserBrick(UserBrickInstance::new(
            definition, def,
        ))))
    }

    /// Append a brick to a definition's internal script.
    ///
    /// Rejects any user brick whose definition (transitively) calls back into
    /// `definition`: a definition must never contain an instance of itself.
    pub fn add_brick_to_definition(
        &mut self,
        definition: DefinitionId,
        brick: Brick,
    ) -> Result<()> {
        if !self.definitions.contains(definition) {
            return Err(StageError::DefinitionNotFound(definition));
        }
        let mut cycle = false;
        walk_brick(&brick, &mut |b| {
            if let BrickKind::UserBrick(instance) = &b.kind {
                let callee = instance.definition();
                if callee == definition || self.definitions.reaches(callee, definition) {
                    cycle = true;
                }
            }
        });
        if cycle {
            return Err(StageError::RecursiveDefinition(definition));
        }
        // contains() checked above
        self.definitions
            .get_mut(definition)
            .expect("definition checked above")
            .script_mut()
            .add_brick(brick);
        Ok(())
    }

    // ---- schema editing with eager propagation ----

    /// Append a literal text element to a definition's UI schema.
    ///
    /// Text elements carry no binding, so no instance needs touching.
    pub fn add_definition_text(
        &mut self,
        definition: DefinitionId,
        label: impl Into<String>,
    ) -> Result<()> {
        self.definitions
            .get_mut(definition)
            .ok_or(StageError::DefinitionNotFound(definition))?
            .add_text_element(label);
        Ok(())
    }

    /// Append a variable element to a definition's UI schema and give every
    /// existing call site a freshly default-initialized binding for it, so the
    /// binding-count invariant holds across the whole sprite atomically.
    pub fn add_definition_variable(
        &mut self,
        definition: DefinitionId,
        name: impl Into<String>,
    ) -> Result<()> {
        let def = self
            .definitions
            .get_mut(definition)
            .ok_or(StageError::DefinitionNotFound(definition))?;
        def.add_variable_element(name);
        let ordinal = def.variable_count() - 1;

        let touched = self.for_each_instance_mut(definition, |instance| {
            instance.insert_binding(ordinal);
        });
        tracing::debug!(
            definition = definition.0,
            instances = touched,
            "added variable element and propagated bindings"
        );
        Ok(())
    }

    /// Remove a schema element by position. If it was a variable element, the
    /// corresponding binding is removed from every call site.
    pub fn remove_definition_element(
        &mut self,
        definition: DefinitionId,
        index: usize,
    ) -> Result<Option<UiElement>> {
        let def = self
            .definitions
            .get_mut(definition)
            .ok_or(StageError::DefinitionNotFound(definition))?;
        let ordinal = def.variable_ordinal(index);
        let removed = def.remove_element(index);
        if let Some(ordinal) = ordinal {
            self.for_each_instance_mut(definition, |instance| {
                instance.remove_binding(ordinal);
            });
        }
        Ok(removed)
    }

    /// Delete a definition and cascade: every call site of it, in every script
    /// this sprite owns (its own scripts and other definitions' internal
    /// scripts, repeat bodies included), is removed. Idempotent; an unknown
    /// handle removes nothing. Returns how many call sites were removed.
    pub fn remove_definition(&mut self, definition: DefinitionId) -> usize {
        let existed = self.definitions.remove(definition).is_some();
        let mut removed = 0;
        for script in &mut self.scripts {
            removed += script.remove_instances_of(definition);
        }
        for (_, def) in self.definitions.iter_mut() {
            removed += def.script_mut().remove_instances_of(definition);
        }
        if existed || removed > 0 {
            tracing::debug!(
                definition = definition.0,
                instances = removed,
                "removed user brick definition"
            );
        }
        removed
    }

    /// Remove one call site from one of this sprite's scripts, leaving the
    /// definition and every other call site untouched.
    pub fn remove_brick(&mut self, script_index: usize, brick: crate::core::types::BrickId)
        -> Option<Brick>
    {
        self.scripts.get_mut(script_index)?.remove_brick(brick)
    }

    // ---- queries & execution ----

    /// Capabilities the script at `index` requires, recursing through user
    /// brick call sites. Consumed by the external scheduler.
    pub fn script_resources(&self, index: usize) -> Result<Resources> {
        let script = self
            .scripts
            .get(index)
            .ok_or(StageError::ScriptNotFound(index))?;
        Ok(crate::resources::script_resources(script, &self.definitions))
    }

    /// Execute the script at `index` against this sprite's state
    pub fn run_script(&mut self, index: usize) -> Result<()> {
        self.run_script_with_sensors(index, None)
    }

    pub fn run_script_with_sensors(
        &mut self,
        index: usize,
        sensors: Option<&dyn SensorSource>,
    ) -> Result<()> {
        let Sprite { scripts, definitions, look, variables, .. } = self;
        let script = scripts
            .get(index)
            .ok_or(StageError::ScriptNotFound(index))?;
        crate::runtime::execute_script(script, definitions, look, variables, sensors)
    }

    /// Apply `f` to every call site of `definition` owned by this sprite.
    /// Returns the number of instances visited.
    fn for_each_instance_mut(
        &mut self,
        definition: DefinitionId,
        mut f: impl FnMut(&mut UserBrickInstance),
    ) -> usize {
        let mut count = 0;
        let mut visit = |brick: &mut Brick| {
            if let BrickKind::UserBrick(instance) = &mut brick.kind {
                if instance.definition() == definition {
                    f(instance);
                    count += 1;
                }
            }
        };
        for script in &mut self.scripts {
            script.for_each_brick_mut(&mut visit);
        }
        for (_, def) in self.definitions.iter_mut() {
            def.script_mut().for_each_brick_mut(&mut visit);
        }
        count
    }
}

fn walk_brick(brick: &Brick, f: &mut impl FnMut(&Brick)) {
    f(brick);
    if let BrickKind::Repeat { body, .. } = &brick.kind {
        for child in body {
            walk_brick(child, f);
        }
    }
}
