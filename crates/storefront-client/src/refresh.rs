//! Single-flight access-token refresh
//!
//! When any number of requests see an authorization failure at once, exactly
//! one of them exchanges the refresh token; the rest attach to the same
//! shared future and observe the same outcome.
//!
//! State transitions of the refresh slot:
//! - idle → in-flight: first caller whose token is still the stored one
//! - in-flight → settled: under the slot lock, the spawned refresh task
//!   swaps (or clears) the credential and fires the logout hook on failure,
//!   then empties the slot before its outcome is published to waiters. If
//!   the store no longer holds the refreshed pair (logout or a new login
//!   meanwhile), the exchange result is discarded and nothing is notified
//! - settled → idle: the slot is empty again
//!
//! Expiry episodes are keyed on the access token: a caller whose request was
//! sent with a token that is no longer stored never starts a refresh. It
//! replays with the stored token, or fails if the store was cleared.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::Secret;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use storefront_auth::{Credential, CredentialStore, RefreshRequest, TokenResponse};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportRequest};

/// Invoked with no arguments when the stored credential becomes invalid.
/// Called at most once per expiry episode.
pub type LogoutHook = Arc<dyn Fn() + Send + Sync>;

/// Result of a refresh, shared by every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New access token to replay with
    Refreshed(Secret<String>),
    /// Refresh impossible or rejected; credential already cleared
    Failed(String),
}

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Coordinates token refreshes so at most one is in flight.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    in_flight: Mutex<Option<SharedRefresh>>,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    refresh_url: Url,
    timeout: Duration,
    logout_hook: Option<LogoutHook>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        refresh_url: Url,
        timeout: Duration,
        logout_hook: Option<LogoutHook>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                in_flight: Mutex::new(None),
                store,
                transport,
                refresh_url,
                timeout,
                logout_hook,
            }),
        }
    }

    /// Obtain a usable access token after a request sent with `sent_with`
    /// was rejected.
    ///
    /// Joins the in-flight refresh if there is one, otherwise starts it. The
    /// refresh runs on its own task, so dropping this future (caller
    /// cancellation) never cancels it for the other waiters.
    pub async fn refresh(&self, sent_with: Option<&Secret<String>>) -> RefreshOutcome {
        let shared = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(in_flight) if in_flight.peek().is_none() => {
                    debug!("joining in-flight token refresh");
                    in_flight.clone()
                }
                _ => {
                    let credential = match self.inner.store.get().await {
                        Some(credential) => credential,
                        None => {
                            debug!("no stored credential, nothing to refresh");
                            return RefreshOutcome::Failed("not logged in".into());
                        }
                    };

                    let same_episode = sent_with
                        .map(|token| credential.has_access_token(token.expose()))
                        .unwrap_or(false);
                    if !same_episode {
                        debug!("stored token changed since the request was sent, reusing it");
                        return RefreshOutcome::Refreshed(credential.access);
                    }

                    info!("access token rejected, starting token refresh");
                    let inner = self.inner.clone();
                    let task = tokio::spawn(inner.run(credential));
                    let shared = async move {
                        task.await.unwrap_or_else(|e| {
                            RefreshOutcome::Failed(format!("refresh task aborted: {e}"))
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Clear the credential after a replayed request was rejected again.
    ///
    /// Compare-and-clear: only acts when `sent_with` is still the stored
    /// token, so concurrent replays that all fail fire the logout hook once.
    pub async fn expire(&self, sent_with: Option<&Secret<String>>) {
        let _slot = self.inner.in_flight.lock().await;
        let Some(token) = sent_with else {
            return;
        };
        match self.inner.store.get().await {
            Some(current) if current.has_access_token(token.expose()) => {
                warn!("refreshed token rejected, clearing credential");
                self.inner.clear_and_notify().await;
            }
            _ => debug!("credential already replaced or cleared"),
        }
    }

    /// Clear the credential unconditionally (explicit logout).
    ///
    /// Returns whether a credential was present. The logout hook only fires
    /// in that case.
    pub async fn clear(&self) -> bool {
        let _slot = self.inner.in_flight.lock().await;
        if self.inner.store.get().await.is_some() {
            self.inner.clear_and_notify().await;
            true
        } else {
            false
        }
    }

    /// Whether a refresh is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .await
            .as_ref()
            .map(|s| s.peek().is_none())
            .unwrap_or(false)
    }
}

impl Inner {
    /// Owner side of the refresh. Runs on a spawned task.
    ///
    /// The network exchange runs unlocked; the swap and the settle happen
    /// under the slot lock, and only if the store still holds the pair that
    /// was refreshed. A logout or login that lands mid-exchange wins.
    async fn run(self: Arc<Self>, credential: Credential) -> RefreshOutcome {
        let exchanged = self.exchange(&credential).await;

        let mut slot = self.in_flight.lock().await;
        let outcome = match self.store.get().await {
            None => {
                debug!("credential cleared during refresh, discarding result");
                crate::metrics::record_refresh("discarded");
                RefreshOutcome::Failed("logged out during refresh".into())
            }
            Some(current) if !current.has_access_token(credential.access.expose()) => {
                debug!("credential replaced during refresh, discarding result");
                crate::metrics::record_refresh("discarded");
                RefreshOutcome::Refreshed(current.access)
            }
            Some(_) => self.settle(exchanged).await,
        };

        // Callers arriving after this point see the new store state and take
        // the changed-token path instead of refreshing again.
        *slot = None;
        outcome
    }

    /// Apply an exchange result to a store still holding the refreshed pair.
    async fn settle(&self, exchanged: Result<Credential, String>) -> RefreshOutcome {
        let outcome = match exchanged {
            Ok(replacement) => {
                let access = replacement.access.clone();
                match self.store.set(replacement).await {
                    Ok(()) => RefreshOutcome::Refreshed(access),
                    Err(e) => RefreshOutcome::Failed(format!("storing refreshed credential: {e}")),
                }
            }
            Err(reason) => RefreshOutcome::Failed(reason),
        };

        match &outcome {
            RefreshOutcome::Refreshed(_) => {
                info!("token refresh succeeded");
                crate::metrics::record_refresh("success");
            }
            RefreshOutcome::Failed(reason) => {
                warn!(error = %reason, "token refresh failed, logging out");
                crate::metrics::record_refresh("failure");
                self.clear_and_notify().await;
            }
        }
        outcome
    }

    /// Exchange the refresh token for a new pair.
    async fn exchange(&self, credential: &Credential) -> Result<Credential, String> {
        let refresh = credential
            .refresh
            .clone()
            .ok_or_else(|| String::from("no refresh token stored"))?;

        let body = serde_json::to_vec(&RefreshRequest {
            refresh_token: refresh.clone(),
        })
        .map_err(|e| format!("serializing refresh request: {e}"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let request = TransportRequest {
            method: Method::POST,
            url: self.refresh_url.clone(),
            headers,
            body: Some(Bytes::from(body)),
            timeout: self.timeout,
        };

        // The transport enforces the timeout too; this bound holds even for
        // transports that ignore it.
        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| format!("refresh timed out after {}ms", self.timeout.as_millis()))?
            .map_err(|e| format!("refresh request failed: {e}"))?;

        if !response.status.is_success() {
            return Err(format!("refresh endpoint returned {}", response.status));
        }

        let tokens: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| format!("invalid refresh response: {e}"))?;
        Ok(tokens.into_credential(Some(refresh)))
    }

    async fn clear_and_notify(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear credential store");
        }
        if let Some(hook) = &self.logout_hook {
            hook();
        }
    }
}
