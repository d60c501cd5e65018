use thiserror::Error;

use crate::model::{CatalogError, ParseIdError};
use crate::progress::ProgressError;

/// Umbrella error for callers that mix catalog loading and progress updates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
