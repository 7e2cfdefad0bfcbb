use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A semester, student, or competency referenced by a request does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Source data violates an invariant the engine relies on.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stored value could not be interpreted.
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        EngineError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}
