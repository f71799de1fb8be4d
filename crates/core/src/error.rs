use thiserror::Error;

use crate::model::{LessonError, ProgressError, TierError};

/// Any error the domain layer can produce.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Tier(#[from] TierError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
