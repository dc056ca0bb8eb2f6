//! Sprites, scripts and the project record layer.

pub mod project;
pub mod script;
pub mod sprite;
pub mod variables;

pub use project::Project;
pub use script::Script;
pub use sprite::{Look, Sprite};
pub use variables::VariableStore;
