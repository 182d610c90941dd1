//! Catalog & order management service
//!
//! Users, categories, products, orders and reviews behind an HTTP/JSON API.
//!
//! ## Features
//! - Product catalog with filtered, sorted, paginated listing and text search
//! - Category tree with cycle protection
//! - Order placement with atomic stock reservation and price snapshots
//! - Cancellation with stock restoration
//! - Review aggregation into a per-product rating
//! - Token-based authentication

use std::fmt::Display;

use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod seed;
pub mod services;
pub mod store;

use domain::aggregates::OrderStatus;
use domain::value_objects::ValueError;
use store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock { product: String, requested: u32, available: u32 },

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("validation failed: {0}")]
    Validation(String),

    /// Backend failure; unlike the variants above, retrying may succeed.
    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { field } => Self::Validation(format!("{field} already exists")),
            other => Self::Store(other),
        }
    }
}

impl From<ValueError> for CatalogError {
    fn from(e: ValueError) -> Self { Self::Validation(e.to_string()) }
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
