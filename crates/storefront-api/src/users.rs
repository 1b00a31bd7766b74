//! Current-user lookups

use storefront_client::{AuthenticatedHttpClient, RequestOptions};

use crate::error::Result;
use crate::models::User;

pub struct UserService {
    client: AuthenticatedHttpClient,
}

impl UserService {
    pub fn new(client: AuthenticatedHttpClient) -> Self {
        Self { client }
    }

    /// `GET /users/me`
    pub async fn me(&self) -> Result<User> {
        Ok(self.client.get("/users/me", RequestOptions::new()).await?)
    }
}
