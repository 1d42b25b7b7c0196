use crate::services::repository::RepositoryError;
use crate::services::resolver::ResolveError;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Bank account already linked to this user")]
    DuplicateAccount,

    #[error("failed to resolve user bank account")]
    Resolution(#[source] ResolveError),

    #[error("failed to add bank account")]
    NameMismatch,

    #[error("Bank account not found")]
    AccountNotFound,

    #[error("Password hashing failed: {0}")]
    Hashing(anyhow::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[source] RepositoryError),
}

impl ServiceError {
    /// True when the caller's input was at fault, false when a dependency was.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_)
                | ServiceError::UserNotFound
                | ServiceError::DuplicateAccount
                | ServiceError::NameMismatch
                | ServiceError::AccountNotFound
        )
    }
}

impl From<ResolveError> for ServiceError {
    fn from(err: ResolveError) -> Self {
        ServiceError::Resolution(err)
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateLink => ServiceError::DuplicateAccount,
            RepositoryError::UserMissing => ServiceError::UserNotFound,
            other => ServiceError::Persistence(other),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::DuplicateAccount => {
                AppError::Conflict(anyhow::anyhow!("Bank account already linked to this user"))
            }
            ServiceError::Resolution(_) => {
                AppError::BadGateway("failed to resolve user bank account".to_string())
            }
            ServiceError::NameMismatch => {
                AppError::Unprocessable(anyhow::anyhow!("failed to add bank account"))
            }
            ServiceError::AccountNotFound => {
                AppError::NotFound(anyhow::anyhow!("Bank account not found"))
            }
            ServiceError::Hashing(e) => AppError::InternalError(e),
            ServiceError::Persistence(e) => AppError::DatabaseError(anyhow::Error::new(e)),
        }
    }
}
