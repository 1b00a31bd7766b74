//! Wire types for the backend's `/auth/*` endpoints
//!
//! Login, refresh, and register bodies. Tokens are wrapped in `Secret` as
//! soon as they are deserialized so they never reach a log line in clear.

use common::Secret;
use serde::{Deserialize, Serialize};

use crate::credentials::Credential;

/// `POST /auth/login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Secret<String>,
}

/// `POST /auth/register` body.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: Secret<String>,
}

/// `POST /auth/login` response.
///
/// Some backend builds return the user under `user`, others under `data`;
/// both are accepted.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access_token: Secret<String>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default, alias = "data")]
    pub user: Option<serde_json::Value>,
}

impl LoginResponse {
    /// Credential pair to store after a successful login.
    pub fn credential(&self) -> Credential {
        Credential {
            access: self.access_token.clone(),
            refresh: self.refresh_token.clone(),
        }
    }
}

/// `POST /auth/refresh-token` body. The refresh token travels in the JSON
/// body, not a cookie.
#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: Secret<String>,
}

/// `POST /auth/refresh-token` response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Secret<String>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
}

impl TokenResponse {
    /// Build the replacement pair.
    ///
    /// A response without a refresh token keeps the previous one, so the
    /// swap is still a single whole-pair `set()`.
    pub fn into_credential(self, previous_refresh: Option<Secret<String>>) -> Credential {
        Credential {
            access: self.access_token,
            refresh: self.refresh_token.or(previous_refresh),
        }
    }
}
