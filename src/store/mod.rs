//! Persistence store abstraction.
//!
//! Five independent collections keyed by generated ids. Every method is a
//! single round-trip; multi-step workflows live in `services`. Mutations that
//! race with workflows (stock, rating, partial updates) are expressed as
//! targeted updates so the store can apply them atomically.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use crate::domain::aggregates::{Category, CategoryPatch, Order, Product, ProductPatch, Review, ReviewPatch, User};
use crate::domain::value_objects::{CategoryId, OrderId, ProductId, Rating, ReviewId, Sku, UserId};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field `{field}`")]
    Duplicate { field: &'static str },

    /// Transient backend failure (connection, timeout, pool exhaustion).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A persisted record could not be decoded into the domain model.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of an atomic conditional stock change.
#[derive(Debug, Clone, PartialEq)]
pub enum StockChange {
    Applied(Product),
    Insufficient { available: u32 },
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    /// Only `true` narrows the result; `false` is the same as unset.
    pub in_stock: bool,
    /// Any-of match. An empty set matches nothing.
    pub tags: Option<Vec<String>>,
}

impl ProductFilter {
    pub fn matches(&self, p: &Product) -> bool {
        self.category_id.map_or(true, |c| p.category_id == c)
            && self.min_price.map_or(true, |min| p.price.amount() >= min)
            && self.max_price.map_or(true, |max| p.price.amount() <= max)
            && self.brand.as_ref().map_or(true, |b| p.brand.as_ref() == Some(b))
            && (!self.in_stock || p.is_in_stock())
            && self.tags.as_ref().map_or(true, |tags| p.tags.iter().any(|t| tags.contains(t)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortField { Name, Price, CreatedAt, Rating }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder { #[default] Asc, Desc }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl ProductSort {
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ord = match self.field {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Price => a.price.cmp(&b.price),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Rating => a.rating.average.total_cmp(&b.rating.average),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Offset pagination. A `limit` of zero means "no limit".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn unbounded() -> Self { Self { limit: 0, offset: 0 } }
}

impl Default for Page {
    fn default() -> Self { Self { limit: Self::DEFAULT_LIMIT, offset: 0 } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: Option<ProductSort>,
    pub page: Page,
}

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn users(&self) -> StoreResult<Vec<User>>;

    // categories
    async fn insert_category(&self, category: &Category) -> StoreResult<()>;
    async fn update_category(&self, id: CategoryId, patch: &CategoryPatch) -> StoreResult<Option<Category>>;
    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool>;
    async fn category(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    async fn categories(&self) -> StoreResult<Vec<Category>>;
    /// Children of `parent`; `None` selects top-level categories.
    async fn child_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<Category>>;

    // products
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn update_product(&self, id: ProductId, patch: &ProductPatch) -> StoreResult<Option<Product>>;
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>>;
    async fn query_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;
    async fn search_products(&self, text: &str) -> StoreResult<Vec<Product>>;
    /// Add `delta` to stock only if the result stays non-negative.
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> StoreResult<StockChange>;
    async fn set_rating(&self, id: ProductId, rating: Rating) -> StoreResult<bool>;

    // orders
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn save_order(&self, order: &Order) -> StoreResult<bool>;
    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>>;
    async fn orders(&self) -> StoreResult<Vec<Order>>;
    async fn orders_for_user(&self, user: UserId) -> StoreResult<Vec<Order>>;

    // reviews
    async fn insert_review(&self, review: &Review) -> StoreResult<()>;
    async fn update_review(&self, id: ReviewId, patch: &ReviewPatch) -> StoreResult<Option<Review>>;
    async fn delete_review(&self, id: ReviewId) -> StoreResult<Option<Review>>;
    async fn review(&self, id: ReviewId) -> StoreResult<Option<Review>>;
    async fn reviews_for_product(&self, product: ProductId) -> StoreResult<Vec<Review>>;
    async fn reviews_for_user(&self, user: UserId) -> StoreResult<Vec<Review>>;

    /// Drop every record in every collection.
    async fn clear(&self) -> StoreResult<()>;
}
