//! Brickstage - runtime model for a brick-based visual programming language
//!
//! Sprites own scripts, scripts own ordered bricks, and user-defined bricks
//! split into one shared definition per brick type plus per-call-site
//! instances carrying their own formula bindings. The crate covers the
//! definition/instance model, formula evaluation, clone and cascading-delete
//! semantics, script execution, and the resource aggregation the scheduler
//! uses to reserve hardware. Rendering, sensors and persistence are external
//! collaborators behind narrow interfaces.

pub mod bricks;
pub mod core;
pub mod formula;
pub mod resources;
pub mod runtime;
pub mod stage;
