use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("User brick definition not found: {0:?}")]
    DefinitionNotFound(crate::core::types::DefinitionId),

    #[error("Script index out of range: {0}")]
    ScriptNotFound(usize),

    #[error("Definition {0:?} would (transitively) call itself")]
    RecursiveDefinition(crate::core::types::DefinitionId),

    #[error("User brick call depth exceeded {0} frames")]
    CallDepthExceeded(usize),

    #[error("Formula error: {0}")]
    FormulaParse(#[from] crate::formula::ParseError),

    #[error("Project parse error: {0}")]
    ProjectParse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StageError>;
