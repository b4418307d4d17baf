use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("concurrent update lost the race: {0}")]
    ConcurrencyConflict(String),
}

/// Stable machine-readable name of a [`GameError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    NotFound,
    Permission,
    State,
    ConcurrencyConflict,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::Config(_) => ErrorKind::Config,
            GameError::NotFound(_) => ErrorKind::NotFound,
            GameError::Permission(_) => ErrorKind::Permission,
            GameError::State(_) => ErrorKind::State,
            GameError::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
        }
    }

    /// Only lost races are worth replaying; every other error is final for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GameError::ConcurrencyConflict(_))
    }
}
