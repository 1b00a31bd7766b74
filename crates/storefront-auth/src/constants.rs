//! Backend auth endpoint paths
//!
//! Paths are relative to the configured API base URL.

/// Exchanges email + password for a credential pair
pub const LOGIN_PATH: &str = "/auth/login";

/// Exchanges a refresh token for a new credential pair
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Server-side session teardown (best effort)
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Account creation
pub const REGISTER_PATH: &str = "/auth/register";

/// Scheme prefix for the Authorization header
pub const BEARER_PREFIX: &str = "Bearer ";
