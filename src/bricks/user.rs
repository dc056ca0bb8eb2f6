//! User-defined bricks: shared definitions and per-call-site instances.
//!
//! One [`UserBrickDefinition`] exists per brick type the user created. It owns
//! the ordered UI schema (literal text mixed with named variable inputs) and
//! the internal script implementing the procedure body. Every call site is a
//! [`UserBrickInstance`] holding a non-owning [`DefinitionId`] handle plus its
//! own formula bindings, one per schema variable element, in schema order.
//!
//! Definitions live in the owning sprite's [`DefinitionTable`] and are shared
//! by handle, never copied. Copying an instance copies bindings only.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::bricks::BrickKind;
use crate::core::types::DefinitionId;
use crate::formula::{EvalContext, Formula, Value};
use crate::stage::Script;

/// One element of a definition's ordered UI schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UiElement {
    /// Literal label text shown between inputs
    Text(String),
    /// A named variable input; every instance binds a formula to it
    Variable(String),
}

/// The shared shape of a user-defined brick: UI schema plus procedure body.
///
/// Identified by the [`DefinitionId`] handle the definition table assigned;
/// the display name is not guaranteed unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBrickDefinition {
    name: String,
    ui: Vec<UiElement>,
    script: Script,
}

impl UserBrickDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ui: Vec::new(),
            script: Script::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ui_elements(&self) -> &[UiElement] {
        &self.ui
    }

    /// Append a literal text element to the schema.
    ///
    /// Schema edits change the binding-count invariant of every live instance;
    /// go through the owning sprite's wrappers to keep instances reconciled.
    pub fn add_text_element(&mut self, label: impl Into<String>) {
        self.ui.push(UiElement::Text(label.into()));
    }

    /// Append a named variable element to the schema
    pub fn add_variable_element(&mut self, name: impl Into<String>) {
        self.ui.push(UiElement::Variable(name.into()));
    }

    /// Remove a schema element by position. Returns the removed element.
    pub fn remove_element(&mut self, index: usize) -> Option<UiElement> {
        if index < self.ui.len() {
            Some(self.ui.remove(index))
        } else {
            None
        }
    }

    /// Variable names in schema order
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.ui.iter().filter_map(|element| match element {
            UiElement::Variable(name) => Some(name.as_str()),
            UiElement::Text(_) => None,
        })
    }

    pub fn variable_count(&self) -> usize {
        self.variable_names().count()
    }

    /// Ordinal of the variable at schema position `index`, if it is one.
    ///
    /// The ordinal is the binding index instances use for that variable.
    pub fn variable_ordinal(&self, index: usize) -> Option<usize> {
        match self.ui.get(index) {
            Some(UiElement::Variable(_)) => Some(
                self.ui[..index]
                    .iter()
                    .filter(|e| matches!(e, UiElement::Variable(_)))
                    .count(),
            ),
            _ => None,
        }
    }

    /// The internal script implementing the procedure body
    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn script_mut(&mut self) -> &mut Script {
        &mut self.script
    }
}

/// One call site of a user brick definition.
///
/// Holds the shared definition handle and this call's own formula bindings.
/// Bindings are deep-copied when the brick is copied; the handle is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBrickInstance {
    definition: DefinitionId,
    bindings: Vec<Formula>,
}

impl UserBrickInstance {
    /// Create an instance with one default-initialized binding per schema
    /// variable element, in schema order.
    pub fn new(definition_id: DefinitionId, definition: &UserBrickDefinition) -> Self {
        Self {
            definition: definition_id,
            bindings: (0..definition.variable_count())
                .map(|_| Formula::default())
                .collect(),
        }
    }

    pub fn definition(&self) -> DefinitionId {
        self.definition
    }

    pub fn bindings(&self) -> &[Formula] {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut [Formula] {
        &mut self.bindings
    }

    pub(crate) fn insert_binding(&mut self, ordinal: usize) {
        let at = ordinal.min(self.bindings.len());
        self.bindings.insert(at, Formula::default());
    }

    pub(crate) fn remove_binding(&mut self, ordinal: usize) {
        if ordinal < self.bindings.len() {
            self.bindings.remove(ordinal);
        }
    }

    /// Re-establish `bindings.len() == definition.variable_count()`.
    ///
    /// Safety net for graphs rebuilt from stale records: pads with defaults or
    /// trims from the end rather than failing the script.
    pub fn reconcile(&mut self, definition: &UserBrickDefinition) {
        let expected = definition.variable_count();
        while self.bindings.len() < expected {
            self.bindings.push(Formula::default());
        }
        self.bindings.truncate(expected);
    }

    /// Evaluate every binding against the calling actor's context, pairing
    /// each value with its schema variable name. This is the variable-passing
    /// step: the returned pairs seed the call-frame namespace the definition's
    /// internal script runs under.
    ///
    /// A stale instance self-heals here: a variable element with no binding
    /// yet gets the default value, surplus bindings are ignored.
    pub fn evaluate_bindings(
        &self,
        definition: &UserBrickDefinition,
        ctx: &EvalContext,
    ) -> Vec<(String, Value)> {
        definition
            .variable_names()
            .enumerate()
            .map(|(ordinal, name)| {
                let value = self
                    .bindings
                    .get(ordinal)
                    .map(|formula| formula.evaluate(ctx))
                    .unwrap_or_default();
                (name.to_string(), value)
            })
            .collect()
    }
}

/// Arena of user brick definitions owned by one sprite.
///
/// Instances hold [`DefinitionId`] handles into this table; the table is the
/// single owner of definition values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionTable {
    definitions: AHashMap<DefinitionId, UserBrickDefinition>,
    next_id: u32,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition and return its assigned handle
    pub fn insert(&mut self, definition: UserBrickDefinition) -> DefinitionId {
        let id = DefinitionId(self.next_id);
        self.next_id += 1;
        self.definitions.insert(id, definition);
        id
    }

    pub fn get(&self, id: DefinitionId) -> Option<&UserBrickDefinition> {
        self.definitions.get(&id)
    }

    pub fn get_mut(&mut self, id: DefinitionId) -> Option<&mut UserBrickDefinition> {
        self.definitions.get_mut(&id)
    }

    pub fn remove(&mut self, id: DefinitionId) -> Option<UserBrickDefinition> {
        self.definitions.remove(&id)
    }

    pub fn contains(&self, id: DefinitionId) -> bool {
        self.definitions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DefinitionId, &UserBrickDefinition)> {
        self.definitions.iter().map(|(id, def)| (*id, def))
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (DefinitionId, &mut UserBrickDefinition)> {
        self.definitions.iter_mut().map(|(id, def)| (*id, def))
    }

    /// Whether `from`'s internal script (transitively) contains a call site of
    /// `to`. Used to reject edits that would make a definition call itself.
    pub fn reaches(&self, from: DefinitionId, to: DefinitionId) -> bool {
        let mut stack = vec![from];
        let mut seen = ahash::AHashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(definition) = self.get(current) else {
                continue;
            };
            let mut found = false;
            definition.script().for_each_brick(&mut |brick| {
                if let BrickKind::UserBrick(instance) = &brick.kind {
                    if instance.definition() == to {
                        found = true;
                    } else {
                        stack.push(instance.definition());
                    }
                }
            });
            if found {
                return true;
            }
        }
        false
    }
}
