//! Authenticated HTTP client for the storefront REST backend
//!
//! Attaches the stored bearer token to every call and recovers from expired
//! access tokens transparently: the first authorization failure triggers one
//! coordinated token refresh, and the rejected request is replayed once with
//! the new token.
//!
//! Request lifecycle:
//! 1. Verb method builds a `PendingRequest` from path, body and `RequestOptions`
//! 2. Stored access token attached (unless `skip_auth`)
//! 3. `Transport::send()` issues the call
//! 4. 401 (or 403 when configured) → `RefreshCoordinator::refresh()`, single-flight
//! 5. Refreshed → replay once; second rejection → credential expired, `AuthExpired`
//! 6. Refresh failure → credential cleared, logout hook fired once, `AuthExpired`

pub mod client;
pub mod error;
pub mod metrics;
pub mod refresh;
pub mod request;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use client::{AuthenticatedHttpClient, ClientBuilder, ClientConfig};
pub use error::{Error, Result};
pub use refresh::{LogoutHook, RefreshCoordinator, RefreshOutcome};
pub use request::{MAX_REPLAYS, PendingRequest, RequestOptions};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
