//! Storefront authentication primitives
//!
//! Holds the credential pair, the stores it lives in, and the wire types of
//! the backend's `/auth/*` endpoints. Nothing here talks HTTP; the
//! authenticated client in `storefront-client` drives these types.
//!
//! Credential lifecycle:
//! 1. Login returns a `LoginResponse`, converted with `LoginResponse::credential()`
//! 2. Credential stored via `CredentialStore::set()`
//! 3. On 401 the client exchanges the refresh token (`RefreshRequest`)
//! 4. `TokenResponse::into_credential()` builds the replacement pair, swapped in one `set()`
//! 5. Logout or refresh failure calls `CredentialStore::clear()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{Error, Result};
pub use token::{LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, TokenResponse};
