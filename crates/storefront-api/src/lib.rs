//! Typed resource services for the storefront REST backend
//!
//! Each service borrows an `AuthenticatedHttpClient` and maps one backend
//! resource onto typed calls. Token handling (attach, refresh, replay,
//! logout on expiry) stays in the client; services only validate input and
//! pick paths.

pub mod auth;
pub mod error;
pub mod models;
pub mod orders;
pub mod products;
pub mod users;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use error::{Error, Result};
pub use models::{
    CartLine, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, Product, ProductInput, User,
};
pub use orders::OrderService;
pub use products::ProductService;
pub use users::UserService;
