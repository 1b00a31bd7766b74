//! Client-side metrics
//!
//! - `storefront_client_requests_total` (counter): labels `method`, `status`
//! - `storefront_client_network_errors_total` (counter)
//! - `storefront_client_token_refresh_total` (counter): label `outcome`
//! - `storefront_client_replays_total` (counter)
//!
//! No recorder is installed here; the embedding binary decides whether to
//! export them.

/// Record a completed round trip.
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "storefront_client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a transport failure (no status).
pub fn record_network_error() {
    metrics::counter!("storefront_client_network_errors_total").increment(1);
}

/// Record a settled token refresh. `outcome` is "success", "failure", or
/// "discarded" when the credential changed while the exchange ran.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("storefront_client_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a request replayed after a refresh.
pub fn record_replay() {
    metrics::counter!("storefront_client_replays_total").increment(1);
}
