use thiserror::Error;

/// Errors from combat and initiative operations
#[derive(Debug, Error)]
pub enum CombatError {
    #[error("combat not found: {0}")]
    CombatNotFound(i64),

    #[error("initiative {initiative_id} not found in combat {combat_id}")]
    InitiativeNotFound { combat_id: i64, initiative_id: i64 },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
