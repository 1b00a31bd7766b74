//! Error taxonomy for authenticated calls

use crate::transport::TransportError;

/// Errors returned by `AuthenticatedHttpClient` operations.
///
/// `Clone` so a refresh failure can be handed to every waiting caller as
/// the same value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transport failure: timeout, DNS, connection reset. Never retried here.
    #[error("network error: {0}")]
    Network(String),

    /// Authorization failed after one refresh-and-replay, or the refresh
    /// itself failed. The stored credential has been cleared.
    #[error("session expired, log in again")]
    AuthExpired,

    /// Any other non-2xx response, with the server's message when present.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad header, URL or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("credential store error: {0}")]
    Store(String),
}

impl Error {
    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<storefront_auth::Error> for Error {
    fn from(err: storefront_auth::Error) -> Self {
        Error::Store(err.to_string())
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
