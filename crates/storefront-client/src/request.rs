//! Per-call options and the replayable request description

use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use common::Secret;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use std::str::FromStr;
use storefront_auth::BEARER_PREFIX;

use crate::error::{Error, Result};
use crate::transport::TransportRequest;

/// How many times a rejected request may be re-sent after a refresh.
pub const MAX_REPLAYS: u8 = 1;

/// Per-call configuration.
///
/// ```ignore
/// let opts = RequestOptions::new().query("page", 2).query("category", "Consoles");
/// let orders: Vec<Order> = client.get("/orders", opts).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Do not attach a token and never enter the refresh path (login, register)
    pub skip_auth: bool,
    /// Query parameters, in insertion order
    pub query: Vec<(String, String)>,
    /// Extra headers; `Authorization` is always overwritten when a token is attached
    pub headers: Vec<(String, String)>,
    /// Overrides the client's default timeout for this call
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// Add a query parameter. Accepts strings and numbers alike.
    pub fn query(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A call captured so it can be replayed after a token refresh.
///
/// Carries its own replay count instead of a mutable flag on a shared
/// request object, and remembers which access token it was last sent with
/// so the refresh coordinator can tell a fresh expiry from one that has
/// already been handled.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    skip_auth: bool,
    timeout: Option<Duration>,
    replays: u8,
    sent_with: Option<Secret<String>>,
}

impl PendingRequest {
    /// Validate and capture a call. Header names/values are checked here so
    /// nothing malformed ever reaches the transport.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        body: Option<Bytes>,
        options: RequestOptions,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in &options.headers {
            let name = HeaderName::from_str(name)
                .map_err(|e| Error::InvalidRequest(format!("header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidRequest(format!("header value for {name}: {e}")))?;
            headers.insert(name, value);
        }

        Ok(Self {
            method,
            path: path.into(),
            query: options.query,
            headers,
            body,
            skip_auth: options.skip_auth,
            timeout: options.timeout,
            replays: 0,
            sent_with: None,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn skip_auth(&self) -> bool {
        self.skip_auth
    }

    pub fn replays(&self) -> u8 {
        self.replays
    }

    pub fn can_replay(&self) -> bool {
        self.replays < MAX_REPLAYS
    }

    pub fn mark_replayed(&mut self) {
        self.replays += 1;
    }

    /// Access token attached on the most recent send, if any.
    pub fn sent_with(&self) -> Option<&Secret<String>> {
        self.sent_with.as_ref()
    }

    /// Resolve against `base_url` and attach `token` for the next send.
    ///
    /// `skip_auth` requests never carry a token, even if one is passed.
    pub fn to_transport(
        &mut self,
        base_url: &str,
        token: Option<Secret<String>>,
        default_timeout: Duration,
    ) -> Result<TransportRequest> {
        let url = resolve_url(base_url, &self.path, &self.query)?;

        let mut headers = self.headers.clone();
        self.sent_with = if self.skip_auth { None } else { token };
        if let Some(token) = &self.sent_with {
            let value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{}", token.expose()))
                .map_err(|e| Error::InvalidRequest(format!("access token is not a valid header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(TransportRequest {
            method: self.method.clone(),
            url,
            headers,
            body: self.body.clone(),
            timeout: self.timeout.unwrap_or(default_timeout),
        })
    }
}

/// Join base URL and path by string concatenation (so a base path such as
/// `/api` is kept), then append query pairs.
fn resolve_url(base_url: &str, path: &str, query: &[(String, String)]) -> Result<Url> {
    let joined = if path.is_empty() {
        base_url.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };
    let mut url =
        Url::parse(&joined).map_err(|e| Error::InvalidRequest(format!("url {joined:?}: {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
