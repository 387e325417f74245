use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("user id cannot be empty")]
    InvalidUserId,
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),
}
