//! Backend resource shapes
//!
//! Field names follow the backend's JSON: order fields are camelCase,
//! while `created_at`, `updated_at` and `quantity_stock` are snake_case.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Authenticated account as returned by `/users/me` and login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub quantity_stock: u32,
}

/// Create/update body for products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub quantity_stock: u32,
}

impl ProductInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("product name is required".into()));
        }
        if self.category.trim().is_empty() {
            return Err(Error::Validation("product category is required".into()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::Validation(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

/// Order status as the backend spells it.
///
/// Unknown values are kept verbatim so a newer backend never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "Pendente",
            OrderStatus::Processing => "Em processamento",
            OrderStatus::Shipped => "Enviado",
            OrderStatus::Delivered => "Entregue",
            OrderStatus::Completed => "Concluído",
            OrderStatus::Cancelled => "Cancelado",
            OrderStatus::Other(s) => s,
        }
    }

    /// Completed orders no longer accept status changes.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Parse user input: wire spelling or English name, case-insensitive.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "pendente" | "pending" => OrderStatus::Pending,
            "em processamento" | "processing" => OrderStatus::Processing,
            "enviado" | "shipped" => OrderStatus::Shipped,
            "entregue" | "delivered" => OrderStatus::Delivered,
            "concluído" | "concluido" | "completed" => OrderStatus::Completed,
            "cancelado" | "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(input.trim().to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pendente" => OrderStatus::Pending,
            "Em processamento" => OrderStatus::Processing,
            "Enviado" => OrderStatus::Shipped,
            "Entregue" => OrderStatus::Delivered,
            "Concluído" => OrderStatus::Completed,
            "Cancelado" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: u64,
    pub order_id: u64,
    pub product_id: u64,
    #[serde(default)]
    pub product_name: String,
    pub unit_price: f64,
    pub total_price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    pub status: OrderStatus,
    #[serde(default)]
    pub customer_name: String,
    pub total_amount: f64,
    #[serde(rename = "created_at", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updated_at", default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// A product in the cart being turned into an order.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: u64,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: u64,
    pub quantity: u32,
}

/// `POST /orders` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Build a pending order from cart lines, totalling `quantity * unit_price`.
    ///
    /// Lines for the same product are merged. Empty carts, blank customer
    /// names and zero quantities are rejected.
    pub fn from_cart(customer_name: &str, lines: &[CartLine]) -> Result<Self> {
        let customer_name = customer_name.trim();
        if customer_name.is_empty() {
            return Err(Error::Validation("customer name is required".into()));
        }
        if lines.is_empty() {
            return Err(Error::Validation("add at least one product to the order".into()));
        }

        let mut items: Vec<NewOrderItem> = Vec::with_capacity(lines.len());
        let mut total = 0.0;
        for line in lines {
            if line.quantity == 0 {
                return Err(Error::Validation(format!(
                    "quantity for product {} must be at least 1",
                    line.product_id
                )));
            }
            total += f64::from(line.quantity) * line.unit_price;
            match items.iter_mut().find(|i| i.product_id == line.product_id) {
                Some(existing) => existing.quantity += line.quantity,
                None => items.push(NewOrderItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                }),
            }
        }

        Ok(Self {
            customer_name: customer_name.to_string(),
            status: OrderStatus::Pending,
            total_amount: total,
            items,
        })
    }
}
