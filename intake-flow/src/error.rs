use thiserror::Error;

use crate::applicant::Identity;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Applicant not found: {0}")]
    ApplicantNotFound(Identity),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Invalid decision tag: {0}")]
    InvalidDecisionTag(String),

    #[error("Identity {0} is not the configured reviewer")]
    UnauthorizedReviewer(Identity),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
