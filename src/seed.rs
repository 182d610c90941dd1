//! Sample data import.
//!
//! Replaces everything in a store with the contents of a JSON document. Users
//! carry a plain-text `password` that is hashed on the way in; every other
//! record is a complete document with its id, so orders and reviews can refer
//! to the users and products of the same file.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use tracing::info;

use crate::domain::aggregates::{Category, Order, Product, Review, Role, User};
use crate::domain::value_objects::{Address, ProductId, Rating, UserId};
use crate::services::accounts::hash_password;
use crate::store::Store;
use crate::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    pub address: Option<Address>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SampleData {
    pub users: Vec<SeedUser>,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub categories: usize,
    pub products: usize,
    pub orders: usize,
    pub reviews: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} users, {} categories, {} products, {} orders, {} reviews",
            self.users, self.categories, self.products, self.orders, self.reviews
        )
    }
}

impl SeedUser {
    async fn into_user(self) -> Result<User> {
        let mut user = User::register(self.username, self.email.to_lowercase(), hash_password(self.password).await?, self.first_name, self.last_name);
        user.id = self.id;
        user.role = self.role;
        user.address = self.address;
        user.phone = self.phone;
        Ok(user)
    }
}

/// Clear the store, then insert users, categories, products, orders and
/// reviews in that order. Product ratings are recomputed from the imported
/// reviews.
pub async fn import(store: &dyn Store, data: SampleData) -> Result<ImportSummary> {
    store.clear().await?;
    info!("cleared existing data");

    let mut summary = ImportSummary::default();
    for seed in data.users {
        store.insert_user(&seed.into_user().await?).await?;
        summary.users += 1;
    }
    info!(count = summary.users, "imported users");

    for category in &data.categories {
        store.insert_category(category).await?;
    }
    summary.categories = data.categories.len();
    info!(count = summary.categories, "imported categories");

    for product in &data.products {
        store.insert_product(product).await?;
    }
    summary.products = data.products.len();
    info!(count = summary.products, "imported products");

    for order in &data.orders {
        store.insert_order(order).await?;
    }
    summary.orders = data.orders.len();
    info!(count = summary.orders, "imported orders");

    let mut scores: HashMap<ProductId, Vec<_>> = HashMap::new();
    for review in &data.reviews {
        store.insert_review(review).await?;
        scores.entry(review.product_id).or_default().push(review.rating);
    }
    summary.reviews = data.reviews.len();
    for (product, ratings) in scores {
        store.set_rating(product, Rating::from_scores(ratings)).await?;
    }
    info!(count = summary.reviews, "imported reviews");

    Ok(summary)
}
