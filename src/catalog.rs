//! Product catalog lookup.
//!
//! The catalog is small and read-only, so the default store serves it
//! straight from configuration. The trait exists so tests (and any future
//! remote catalog) can swap the source without touching handlers.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ProductConfig;

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub permalink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<u32>,
    #[serde(skip)]
    pub owner_email: Option<String>,
}

impl From<&ProductConfig> for Product {
    fn from(p: &ProductConfig) -> Self {
        Product {
            id: p.id,
            name: p.name.clone(),
            permalink: p.permalink.clone(),
            calendar_id: p.calendar_id,
            owner_email: p.owner_email.clone(),
        }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(&self, id: u64) -> Option<Product>;

    /// Reverse lookup: the product a calendar belongs to, if any.
    async fn product_for_calendar(&self, calendar_id: u32) -> Option<Product>;
}

/// Configuration-backed catalog.
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: &[ProductConfig]) -> Self {
        Self {
            products: products.iter().map(Product::from).collect(),
        }
    }
}

#[async_trait]
impl CatalogStore for StaticCatalog {
    async fn product(&self, id: u64) -> Option<Product> {
        self.products.iter().find(|p| p.id == id).cloned()
    }

    async fn product_for_calendar(&self, calendar_id: u32) -> Option<Product> {
        self.products
            .iter()
            .find(|p| p.calendar_id == Some(calendar_id))
            .cloned()
    }
}
