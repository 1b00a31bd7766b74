//! The authenticated client
//!
//! Verb methods build a `PendingRequest`, attach the stored access token,
//! and send it. An authorization failure hands off to the
//! `RefreshCoordinator`; the request is replayed at most `MAX_REPLAYS`
//! times, after which the credential is expired and the caller gets
//! `Error::AuthExpired`. Everything else (network failures, non-auth error
//! statuses, decode failures) is returned as-is without retry.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::Secret;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storefront_auth::{Credential, CredentialStore, LOGOUT_PATH, MemoryCredentialStore, REFRESH_PATH};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::refresh::{LogoutHook, RefreshCoordinator, RefreshOutcome};
use crate::request::{PendingRequest, RequestOptions};
use crate::transport::{ReqwestTransport, Transport, TransportError, TransportResponse};

/// Default bound for every call, including the refresh exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest server error body echoed into `Error::Api`
const MAX_ERROR_BODY: usize = 512;

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all paths are appended to, e.g. `http://localhost:3000/api`
    pub base_url: String,
    pub timeout: Duration,
    /// Treat 403 like 401 (refresh and replay). 401 always triggers refresh.
    pub refresh_on_forbidden: bool,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            refresh_on_forbidden: true,
        }
    }
}

/// Assembles an `AuthenticatedHttpClient`.
///
/// Defaults: `ReqwestTransport`, `MemoryCredentialStore`, no logout hook.
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn CredentialStore>>,
    logout_hook: Option<LogoutHook>,
}

impl ClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn logout_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.logout_hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<AuthenticatedHttpClient> {
        let base = self.config.base_url.trim_end_matches('/');
        Url::parse(base)
            .map_err(|e| Error::InvalidRequest(format!("base url {base:?}: {e}")))?;
        if self.config.timeout.is_zero() {
            return Err(Error::InvalidRequest("timeout must be greater than 0".into()));
        }
        let refresh_url = Url::parse(&format!("{base}{REFRESH_PATH}"))
            .map_err(|e| Error::InvalidRequest(format!("refresh url: {e}")))?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::default()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        let refresh = RefreshCoordinator::new(
            store.clone(),
            transport.clone(),
            refresh_url,
            self.config.timeout,
            self.logout_hook,
        );

        info!(base_url = %self.config.base_url, "authenticated client ready");
        Ok(AuthenticatedHttpClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
                store,
                refresh,
            }),
        })
    }
}

/// HTTP client that attaches bearer tokens and recovers from expiry.
///
/// Cheap to clone; clones share the credential store and refresh state.
#[derive(Clone)]
pub struct AuthenticatedHttpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresh: RefreshCoordinator,
}

impl AuthenticatedHttpClient {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: None,
            store: None,
            logout_hook: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.execute(PendingRequest::new(Method::GET, path, None, options)?)
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.execute(PendingRequest::new(Method::POST, path, Some(body), options)?)
            .await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.execute(PendingRequest::new(Method::PUT, path, Some(body), options)?)
            .await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.execute(PendingRequest::new(Method::PATCH, path, Some(body), options)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.execute(PendingRequest::new(Method::DELETE, path, None, options)?)
            .await
    }

    /// Store a credential pair obtained from login.
    pub async fn store_credential(&self, credential: Credential) -> Result<()> {
        self.inner.store.set(credential).await?;
        debug!("credential stored");
        Ok(())
    }

    /// Whether an access token is currently stored.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.store.get().await.is_some()
    }

    /// Best-effort server logout, then local teardown.
    ///
    /// The local credential is cleared and the logout hook fired whatever
    /// the server answers. The logout call itself never triggers a refresh.
    pub async fn logout(&self) {
        let Some(credential) = self.inner.store.get().await else {
            debug!("logout without a stored credential");
            return;
        };

        let request_id = new_request_id();
        let attempt = PendingRequest::new(Method::POST, LOGOUT_PATH, None, RequestOptions::new());
        match attempt {
            Ok(mut pending) => {
                match self.dispatch(&mut pending, Some(credential.access), &request_id).await {
                    Ok(response) if response.status.is_success() => debug!("server logout succeeded"),
                    Ok(response) => {
                        warn!(status = response.status.as_u16(), "server logout rejected, clearing locally")
                    }
                    Err(e) => warn!(error = %e, "server logout failed, clearing locally"),
                }
            }
            Err(e) => warn!(error = %e, "could not build logout request"),
        }

        self.inner.refresh.clear().await;
        info!("logged out");
    }

    async fn execute<T: DeserializeOwned>(&self, mut pending: PendingRequest) -> Result<T> {
        let request_id = new_request_id();
        let response = self.send_with_refresh(&mut pending, &request_id).await?;
        decode_response(response)
    }

    /// Send, and on authorization failure refresh and replay within the
    /// request's replay budget.
    #[instrument(skip_all, fields(request_id = %request_id, method = %pending.method(), path = %pending.path()))]
    async fn send_with_refresh(
        &self,
        pending: &mut PendingRequest,
        request_id: &str,
    ) -> Result<TransportResponse> {
        let mut token = if pending.skip_auth() {
            None
        } else {
            self.inner.store.get().await.map(|c| c.access)
        };

        loop {
            let response = self.dispatch(pending, token, request_id).await?;
            if pending.skip_auth() || !self.is_auth_failure(response.status) {
                return Ok(response);
            }

            if !pending.can_replay() {
                warn!(
                    status = response.status.as_u16(),
                    replays = pending.replays(),
                    "rejected again after refresh"
                );
                self.inner.refresh.expire(pending.sent_with()).await;
                return Err(Error::AuthExpired);
            }

            match self.inner.refresh.refresh(pending.sent_with()).await {
                RefreshOutcome::Refreshed(new_token) => {
                    pending.mark_replayed();
                    crate::metrics::record_replay();
                    debug!("replaying with refreshed token");
                    token = Some(new_token);
                }
                RefreshOutcome::Failed(reason) => {
                    debug!(reason = %reason, "refresh unavailable");
                    return Err(Error::AuthExpired);
                }
            }
        }
    }

    /// One round trip, no refresh logic.
    async fn dispatch(
        &self,
        pending: &mut PendingRequest,
        token: Option<Secret<String>>,
        request_id: &str,
    ) -> Result<TransportResponse> {
        let mut request =
            pending.to_transport(&self.inner.config.base_url, token, self.inner.config.timeout)?;
        let id = HeaderValue::from_str(request_id)
            .map_err(|e| Error::InvalidRequest(format!("request id: {e}")))?;
        request
            .headers
            .insert(HeaderName::from_static("x-request-id"), id);

        let method = request.method.clone();
        let timeout = request.timeout;
        // Bounded here as well, for transports that ignore `request.timeout`
        let sent = tokio::time::timeout(timeout, self.inner.transport.send(request))
            .await
            .unwrap_or(Err(TransportError::Timeout));
        match sent {
            Ok(response) => {
                crate::metrics::record_request(method.as_str(), response.status.as_u16());
                debug!(status = response.status.as_u16(), "response received");
                Ok(response)
            }
            Err(e) => {
                crate::metrics::record_network_error();
                warn!(error = %e, "transport failure");
                Err(e.into())
            }
        }
    }

    fn is_auth_failure(&self, status: StatusCode) -> bool {
        status == StatusCode::UNAUTHORIZED
            || (status == StatusCode::FORBIDDEN && self.inner.config.refresh_on_forbidden)
    }
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Bytes> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| Error::InvalidRequest(format!("serializing body: {e}")))
}

/// Decode a 2xx body, or turn a non-2xx into `Error::Api`.
///
/// An empty body decodes as JSON `null`, so `()` and `Option<T>` work for
/// bodiless responses.
fn decode_response<T: DeserializeOwned>(response: TransportResponse) -> Result<T> {
    let status = response.status;
    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            message: error_message(status, &response.body),
        });
    }

    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };
    serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}

/// Server message for an error response.
///
/// Accepts `{"message": "..."}`, `{"message": ["...", "..."]}` (validation
/// errors), `{"error": "..."}`, or plain text; falls back to the status
/// reason phrase.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        match value.get("message") {
            Some(serde_json::Value::String(message)) => return message.clone(),
            Some(serde_json::Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                if !parts.is_empty() {
                    return parts.join(", ");
                }
            }
            _ => {}
        }
        if let Some(serde_json::Value::String(error)) = value.get("error") {
            return error.clone();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.chars().take(MAX_ERROR_BODY).collect();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}
