use thiserror::Error;

/// Error contract shared by the billing use cases. Translation into
/// user-facing responses stays with the HTTP layer via `status_code`.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    /// Stored data disagrees with its own components. Never silently
    /// corrected; logged and surfaced.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BillingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BillingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BillingError::Validation(_) => StatusCode::BAD_REQUEST,
            BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillingError::Conflict(_) => StatusCode::CONFLICT,
            BillingError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            BillingError::DataIntegrity(_) | BillingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type BillingResult<T> = std::result::Result<T, BillingError>;
