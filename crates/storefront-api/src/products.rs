//! Product catalogue

use serde::Deserialize;
use storefront_client::{AuthenticatedHttpClient, RequestOptions};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Product, ProductInput};

/// `GET /products` answers either a bare array or a page envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProductList {
    Plain(Vec<Product>),
    Page { data: Vec<Product> },
}

pub struct ProductService {
    client: AuthenticatedHttpClient,
}

impl ProductService {
    pub fn new(client: AuthenticatedHttpClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Product>> {
        let list: ProductList = self.client.get("/products", RequestOptions::new()).await?;
        Ok(match list {
            ProductList::Plain(products) => products,
            ProductList::Page { data } => data,
        })
    }

    pub async fn get(&self, id: u64) -> Result<Product> {
        let path = product_path(id)?;
        Ok(self.client.get(&path, RequestOptions::new()).await?)
    }

    pub async fn create(&self, input: &ProductInput) -> Result<Product> {
        input.validate()?;
        let product: Product = self
            .client
            .post("/products", input, RequestOptions::new())
            .await?;
        info!(id = product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn update(&self, id: u64, input: &ProductInput) -> Result<Product> {
        let path = product_path(id)?;
        input.validate()?;
        Ok(self.client.put(&path, input, RequestOptions::new()).await?)
    }

    /// The response body, if any, is ignored.
    pub async fn delete(&self, id: u64) -> Result<()> {
        let path = product_path(id)?;
        let _: serde_json::Value = self.client.delete(&path, RequestOptions::new()).await?;
        info!(id, "product deleted");
        Ok(())
    }
}

fn product_path(id: u64) -> Result<String> {
    if id == 0 {
        return Err(Error::Validation("product id is required".into()));
    }
    Ok(format!("/products/{id}"))
}
