//! Hardware capability tags and the resource aggregator.
//!
//! The scheduler asks what external hardware a script will touch before it
//! reserves anything. Aggregation walks the brick graph, following user brick
//! call sites into their shared definitions, and unions the capability tags of
//! every primitive brick and sensor reference found. Two call sites of the
//! same definition always aggregate to the same set: resources are a property
//! of the definition, not the caller.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::bricks::{BrickKind, DefinitionTable};
use crate::core::types::DefinitionId;
use crate::stage::Script;

/// One hardware/feature capability a brick or sensor can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Resource {
    Motor = 1 << 0,
    Camera = 1 << 1,
    Microphone = 1 << 2,
    DeviceSensor = 1 << 3,
    TextToSpeech = 1 << 4,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Motor,
        Resource::Camera,
        Resource::Microphone,
        Resource::DeviceSensor,
        Resource::TextToSpeech,
    ];
}

/// Set of required capabilities, stored as a bit-set.
///
/// Union is commutative and idempotent, so aggregation order never matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources(u32);

impl Resources {
    pub const NONE: Resources = Resources(0);

    pub fn single(resource: Resource) -> Self {
        Resources(resource as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, resource: Resource) -> bool {
        self.0 & (resource as u32) != 0
    }

    pub fn insert(&mut self, resource: Resource) {
        self.0 |= resource as u32;
    }

    pub fn union(self, other: Resources) -> Resources {
        Resources(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Resource> + '_ {
        Resource::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

impl std::ops::BitOr for Resources {
    type Output = Resources;
    fn bitor(self, rhs: Resources) -> Resources {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Resources {
    fn bitor_assign(&mut self, rhs: Resources) {
        self.0 |= rhs.0;
    }
}

impl From<Resource> for Resources {
    fn from(resource: Resource) -> Self {
        Resources::single(resource)
    }
}

impl std::fmt::Display for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .iter()
            .map(|r| match r {
                Resource::Motor => "motor",
                Resource::Camera => "camera",
                Resource::Microphone => "microphone",
                Resource::DeviceSensor => "device_sensor",
                Resource::TextToSpeech => "text_to_speech",
            })
            .collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Aggregate the capabilities a script requires, recursing through user brick
/// call sites into their definitions' internal scripts.
///
/// Safe to call on graphs where definitions are shared by many call sites; the
/// visited set keeps shared or cyclic definition graphs from being walked more
/// than once.
pub fn script_resources(script: &Script, definitions: &DefinitionTable) -> Resources {
    let mut visited = AHashSet::new();
    aggregate_script(script, definitions, &mut visited)
}

/// Aggregate the capabilities a single brick requires, recursing into its
/// definition when it is a user brick call site.
pub fn brick_resources(
    brick: &crate::bricks::Brick,
    definitions: &DefinitionTable,
) -> Resources {
    let mut visited = AHashSet::new();
    aggregate_brick(brick, definitions, &mut visited)
}

fn aggregate_script(
    script: &Script,
    definitions: &DefinitionTable,
    visited: &mut AHashSet<DefinitionId>,
) -> Resources {
    let mut total = Resources::NONE;
    for brick in script.iter() {
        total |= aggregate_brick(brick, definitions, visited);
    }
    total
}

fn aggregate_brick(
    brick: &crate::bricks::Brick,
    definitions: &DefinitionTable,
    visited: &mut AHashSet<DefinitionId>,
) -> Resources {
    let mut total = brick.own_resources();
    match &brick.kind {
        BrickKind::UserBrick(instance) => {
            if visited.insert(instance.definition()) {
                if let Some(definition) = definitions.get(instance.definition()) {
                    total |= aggregate_script(definition.script(), definitions, visited);
                }
            }
        }
        BrickKind::Repeat { body, .. } => {
            for child in body {
                total |= aggregate_brick(child, definitions, visited);
            }
        }
        _ => {}
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_is_idempotent() {
        let motor = Resources::single(Resource::Motor);
        assert_eq!(motor | motor, motor);
    }

    #[test]
    fn test_union_is_commutative() {
        let a = Resources::single(Resource::Motor);
        let b = Resources::single(Resource::Camera);
        assert_eq!(a | b, b | a);
    }

    #[test]
    fn test_none_is_identity() {
        let camera = Resources::single(Resource::Camera);
        assert_eq!(camera | Resources::NONE, camera);
        assert!(Resources::NONE.is_empty());
    }

    #[test]
    fn test_contains_after_insert() {
        let mut set = Resources::NONE;
        set.insert(Resource::TextToSpeech);
        assert!(set.contains(Resource::TextToSpeech));
        assert!(!set.contains(Resource::Motor));
    }

    #[test]
    fn test_display() {
        let mut set = Resources::NONE;
        set.insert(Resource::Motor);
        set.insert(Resource::Camera);
        assert_eq!(format!("{}", set), "{motor, camera}");
    }
}
