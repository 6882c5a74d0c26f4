use arena_core::{EnergyError, ScoreError, SocialError, TeamError};
use thiserror::Error;

/// Domain rejections raised by repositories.
///
/// Repositories return `anyhow::Result`; callers that need to tell a rejected
/// request apart from an infrastructure failure downcast to this type.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Energy(#[from] EnergyError),
    #[error(transparent)]
    Team(#[from] TeamError),
    #[error(transparent)]
    Social(#[from] SocialError),
    #[error("score cannot be stored: {0}")]
    Score(#[from] ScoreError),
}
