//! Shared error types for the services crate.

use thiserror::Error;

use study_core::model::SessionSummaryError;
use storage::repository::StorageError;

/// Errors emitted by `CardGeneratorService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("card generation is not configured")]
    Disabled,
    #[error("card generation returned an empty response")]
    EmptyResponse,
    #[error("card generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not parse generated cards: {0}")]
    Parse(String),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no cards available for session")]
    Empty,
    #[error("operation does not apply to this card kind")]
    WrongCardKind,
    #[error("selected option {selected} out of {available}")]
    InvalidOption { selected: usize, available: usize },
    #[error("session still has ungraded cards")]
    NotComplete,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
