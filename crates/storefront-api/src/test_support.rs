//! Shared setup for service tests against a mock backend

use std::sync::Arc;

use storefront_auth::{Credential, MemoryCredentialStore};
use storefront_client::{AuthenticatedHttpClient, ClientConfig};
use wiremock::MockServer;

/// Client pointed at `server`, optionally logged in as A1/R1.
pub fn client(server: &MockServer, logged_in: bool) -> (AuthenticatedHttpClient, Arc<MemoryCredentialStore>) {
    let store = Arc::new(if logged_in {
        MemoryCredentialStore::with_credential(Credential::new("A1", Some("R1".into())))
    } else {
        MemoryCredentialStore::new()
    });
    let client = AuthenticatedHttpClient::builder(ClientConfig::new(server.uri()))
        .credential_store(store.clone())
        .build()
        .unwrap();
    (client, store)
}
