//! Ordered brick container.
//!
//! A script owns its bricks; insertion order is execution order. Scripts are
//! either owned by a sprite directly or serve as the internal script of a user
//! brick definition (exactly one definition owns such a script).

use serde::{Deserialize, Serialize};

use crate::bricks::{Brick, BrickKind};
use crate::core::types::{BrickId, DefinitionId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    bricks: Vec<Brick>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a brick at the end
    pub fn add_brick(&mut self, brick: Brick) {
        self.bricks.push(brick);
    }

    /// Insert a brick at `index`, shifting later bricks back
    pub fn insert_brick(&mut self, index: usize, brick: Brick) {
        let at = index.min(self.bricks.len());
        self.bricks.insert(at, brick);
    }

    pub fn brick(&self, index: usize) -> Option<&Brick> {
        self.bricks.get(index)
    }

    pub fn brick_mut(&mut self, index: usize) -> Option<&mut Brick> {
        self.bricks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Brick> {
        self.bricks.iter_mut()
    }

    /// Remove the brick with the given id, searching repeat bodies too.
    /// Returns the removed brick, or `None` if the id is not present.
    pub fn remove_brick(&mut self, id: BrickId) -> Option<Brick> {
        remove_from(&mut self.bricks, id)
    }

    /// Visit every brick in order, descending into repeat bodies
    pub fn for_each_brick(&self, f: &mut impl FnMut(&Brick)) {
        fn walk(bricks: &[Brick], f: &mut impl FnMut(&Brick)) {
            for brick in bricks {
                f(brick);
                if let BrickKind::Repeat { body, .. } = &brick.kind {
                    walk(body, f);
                }
            }
        }
        walk(&self.bricks, f)
    }

    /// Mutably visit every brick in order, descending into repeat bodies
    pub fn for_each_brick_mut(&mut self, f: &mut impl FnMut(&mut Brick)) {
        fn walk(bricks: &mut [Brick], f: &mut impl FnMut(&mut Brick)) {
            for brick in bricks {
                f(brick);
                if let BrickKind::Repeat { body, .. } = &mut brick.kind {
                    walk(body, f);
                }
            }
        }
        walk(&mut self.bricks, f)
    }

    /// Remove every call site of `definition` from this script, including
    /// call sites nested inside repeat bodies. Returns how many were removed.
    pub fn remove_instances_of(&mut self, definition: DefinitionId) -> usize {
        fn prune(bricks: &mut Vec<Brick>, definition: DefinitionId) -> usize {
            let before = bricks.len();
            bricks.retain(|brick| {
                !matches!(&brick.kind,
                    BrickKind::UserBrick(instance) if instance.definition() == definition)
            });
            let mut removed = before - bricks.len();
            for brick in bricks.iter_mut() {
                if let BrickKind::Repeat { body, .. } = &mut brick.kind {
                    removed += prune(body, definition);
                }
            }
            removed
        }
        prune(&mut self.bricks, definition)
    }
}

fn remove_from(bricks: &mut Vec<Brick>, id: BrickId) -> Option<Brick> {
    if let Some(index) = bricks.iter().position(|b| b.id == id) {
        return Some(bricks.remove(index));
    }
    for brick in bricks.iter_mut() {
        if let BrickKind::Repeat { body, .. } = &mut brick.kind {
            if let Some(found) = remove_from(body, id) {
                return Some(found);
            }
        }
    }
    None
}
