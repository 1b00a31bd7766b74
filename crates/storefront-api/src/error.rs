//! Errors from resource service calls

/// Errors from storefront service operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected before any request was sent
    #[error("invalid input: {0}")]
    Validation(String),

    /// 2xx response that is missing something the service requires
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Client(#[from] storefront_client::Error),
}

impl Error {
    /// Whether the session is gone and the user must log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::Client(storefront_client::Error::AuthExpired))
    }
}

/// Result alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;
