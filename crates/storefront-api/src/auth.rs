//! Login, registration and logout
//!
//! Login and register are sent with `skip_auth`: they never carry a stale
//! token and a 401 from them is a plain "wrong password", not an expiry.

use storefront_auth::{LOGIN_PATH, LoginRequest, LoginResponse, REGISTER_PATH, RegisterRequest};
use storefront_client::{AuthenticatedHttpClient, RequestOptions};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::User;

pub struct AuthService {
    client: AuthenticatedHttpClient,
}

impl AuthService {
    pub fn new(client: AuthenticatedHttpClient) -> Self {
        Self { client }
    }

    /// Exchange email + password for a credential pair and store it.
    ///
    /// Returns the user when the backend includes one in the response.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::Validation("email is required".into()));
        }
        if password.is_empty() {
            return Err(Error::Validation("password is required".into()));
        }

        let request = LoginRequest {
            email: email.to_string(),
            password: password.into(),
        };
        let response: LoginResponse = self
            .client
            .post(LOGIN_PATH, &request, RequestOptions::new().skip_auth())
            .await
            .map_err(|e| match e {
                storefront_client::Error::Decode(msg) => {
                    Error::InvalidResponse(format!("login response: {msg}"))
                }
                other => Error::Client(other),
            })?;

        if response.access_token.is_empty() {
            return Err(Error::InvalidResponse("login response has an empty access token".into()));
        }
        if response.refresh_token.is_none() {
            warn!("login response has no refresh token, session cannot be refreshed");
        }

        self.client.store_credential(response.credential()).await?;
        info!(email, "logged in");

        Ok(response.user.and_then(|value| decode_user(value, "login")))
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Option<User>> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation("name, email and password are required".into()));
        }

        let request = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.into(),
        };
        let response: serde_json::Value = self
            .client
            .post(REGISTER_PATH, &request, RequestOptions::new().skip_auth())
            .await?;
        info!(email = %request.email, "registered account");

        // Some builds wrap the user as {"user": {...}} or {"data": {...}}
        let user = ["user", "data"]
            .iter()
            .find_map(|key| response.get(*key).cloned())
            .unwrap_or(response);
        Ok(decode_user(user, "register"))
    }

    /// Best-effort server logout; the local credential is always cleared.
    pub async fn logout(&self) {
        self.client.logout().await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.is_authenticated().await
    }
}

fn decode_user(value: serde_json::Value, context: &str) -> Option<User> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, context, "ignoring unrecognized user payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::client;
    use storefront_auth::{Credential, CredentialStore};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn login_stores_credential_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(serde_json::json!({"email": "admin@shop.test", "password": "s3cret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Login successful",
                "access_token": "A1",
                "refresh_token": "R1",
                "user": {"id": 1, "name": "Admin", "email": "admin@shop.test", "roles": ["admin"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, store) = client(&server, false);
        let auth = AuthService::new(client);
        let user = auth.login(" admin@shop.test ", "s3cret").await.unwrap().unwrap();

        assert!(user.is_admin());
        assert!(auth.is_authenticated().await);
        assert_eq!(
            store.get().await.unwrap(),
            Credential::new("A1", Some("R1".into()))
        );
    }

    #[tokio::test]
    async fn login_never_sends_stale_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "A5", "refresh_token": "R5"
            })))
            .mount(&server)
            .await;

        let (client, _) = client(&server, true);
        AuthService::new(client).login("a@b.c", "pw").await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_api_error_not_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let (client, store) = client(&server, false);
        let err = AuthService::new(client).login("a@b.c", "wrong").await.unwrap_err();
        assert!(!err.is_auth_expired());
        assert_eq!(err.to_string(), "API error (401): Invalid credentials");
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn login_without_access_token_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "ok"})))
            .mount(&server)
            .await;

        let (client, store) = client(&server, false);
        let err = AuthService::new(client).login("a@b.c", "pw").await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn login_validates_before_sending() {
        let server = MockServer::start().await;
        let (client, _) = client(&server, false);
        let auth = AuthService::new(client);

        assert!(matches!(auth.login("", "pw").await, Err(Error::Validation(_))));
        assert!(matches!(auth.login("a@b.c", "").await, Err(Error::Validation(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_returns_created_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(serde_json::json!({"name": "Ana", "email": "ana@shop.test", "password": "pw"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "user": {"id": 4, "name": "Ana", "email": "ana@shop.test", "roles": ["user"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, store) = client(&server, false);
        let user = AuthService::new(client)
            .register("Ana", "ana@shop.test", "pw")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, Some(4));
        assert!(store.get().await.is_none(), "register must not log in");
    }

    #[tokio::test]
    async fn logout_clears_local_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let (client, store) = client(&server, true);
        let auth = AuthService::new(client);
        auth.logout().await;
        assert!(!auth.is_authenticated().await);
        assert!(store.get().await.is_none());
    }
}
