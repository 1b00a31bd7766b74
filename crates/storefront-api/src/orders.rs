//! Orders

use serde::Serialize;
use storefront_client::{AuthenticatedHttpClient, RequestOptions};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{NewOrder, Order, OrderStatus};

#[derive(Serialize)]
struct StatusUpdate<'a> {
    status: &'a OrderStatus,
}

pub struct OrderService {
    client: AuthenticatedHttpClient,
}

impl OrderService {
    pub fn new(client: AuthenticatedHttpClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.client.get("/orders", RequestOptions::new()).await?)
    }

    pub async fn get(&self, id: u64) -> Result<Order> {
        Ok(self.client.get(&order_path(id)?, RequestOptions::new()).await?)
    }

    pub async fn create(&self, order: &NewOrder) -> Result<Order> {
        if order.items.is_empty() {
            return Err(Error::Validation("add at least one product to the order".into()));
        }
        let created: Order = self
            .client
            .post("/orders", order, RequestOptions::new())
            .await?;
        info!(id = created.id, total = created.total_amount, "order created");
        Ok(created)
    }

    /// Replace an order wholesale (`PUT /orders/{id}`).
    pub async fn update(&self, id: u64, order: &Order) -> Result<Order> {
        Ok(self
            .client
            .put(&order_path(id)?, order, RequestOptions::new())
            .await?)
    }

    /// `PATCH /orders/{id}/status`
    pub async fn update_status(&self, id: u64, status: &OrderStatus) -> Result<Order> {
        let path = format!("{}/status", order_path(id)?);
        let updated: Order = self
            .client
            .patch(&path, &StatusUpdate { status }, RequestOptions::new())
            .await?;
        info!(id, status = %updated.status, "order status updated");
        Ok(updated)
    }
}

fn order_path(id: u64) -> Result<String> {
    if id == 0 {
        return Err(Error::Validation("order id is required".into()));
    }
    Ok(format!("/orders/{id}"))
}
