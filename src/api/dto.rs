//! Request and response bodies, and their mapping onto service inputs.

use axum::extract::{FromRequest, FromRequestParts};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::domain::aggregates::{CategoryPatch, NewProduct, OrderStatus, ProductPatch};
use crate::domain::value_objects::{Address, CategoryId, Price, ProductId, Sku, Specifications};
use crate::services::{NewCategory, NewReview, OrderLine, OrderRequest};
use crate::store::{Page, ProductFilter, ProductQuery, ProductSort, SortField, SortOrder};
use crate::{CatalogError, Result};

/// `axum::Json` with rejections reported as validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(CatalogError))]
pub struct Body<T>(pub T);

/// `axum::extract::Path` with the same error body as every other failure.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CatalogError))]
pub struct PathParam<T>(pub T);

/// `axum::extract::Query` with the same error body as every other failure.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CatalogError))]
pub struct QueryParams<T>(pub T);

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub category_id: CategoryId,
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: u32,
    pub sku: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub specifications: Option<Specifications>,
}

impl TryFrom<CreateProductRequest> for NewProduct {
    type Error = CatalogError;

    fn try_from(r: CreateProductRequest) -> Result<Self> {
        r.validate()?;
        Ok(NewProduct {
            name: r.name.trim().to_string(),
            description: r.description,
            price: Price::new(r.price)?,
            discount_price: r.discount_price.map(Price::new).transpose()?,
            category_id: r.category_id,
            brand: r.brand,
            images: r.images,
            stock: r.stock,
            sku: Sku::new(r.sku)?,
            tags: r.tags,
            specifications: r.specifications,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub specifications: Option<Specifications>,
    pub is_active: Option<bool>,
}

impl TryFrom<UpdateProductRequest> for ProductPatch {
    type Error = CatalogError;

    fn try_from(r: UpdateProductRequest) -> Result<Self> {
        Ok(ProductPatch {
            name: r.name,
            description: r.description,
            price: r.price.map(Price::new).transpose()?,
            discount_price: r.discount_price.map(Price::new).transpose()?,
            category_id: r.category_id,
            brand: r.brand,
            images: r.images,
            stock: r.stock,
            tags: r.tags,
            specifications: r.specifications,
            is_active: r.is_active,
        })
    }
}

/// Listing parameters. `tags` is comma separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductParams {
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    pub in_stock: Option<bool>,
    pub tags: Option<String>,
    pub sort_field: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ProductParams> for ProductQuery {
    fn from(p: ProductParams) -> Self {
        let tags = p.tags.map(|raw| {
            raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect()
        });
        ProductQuery {
            filter: ProductFilter {
                category_id: p.category_id,
                min_price: p.min_price,
                max_price: p.max_price,
                brand: p.brand,
                in_stock: p.in_stock.unwrap_or(false),
                tags,
            },
            sort: p.sort_field.map(|field| ProductSort { field, order: p.sort_order.unwrap_or_default() }),
            page: Page { limit: p.limit.unwrap_or(Page::DEFAULT_LIMIT), offset: p.offset.unwrap_or(0) },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl From<CreateCategoryRequest> for NewCategory {
    fn from(r: CreateCategoryRequest) -> Self {
        NewCategory { name: r.name, description: r.description, parent_id: r.parent_id }
    }
}

/// `parentId: null` detaches the category; an absent `parentId` leaves it alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<CategoryId>>,
}

impl From<UpdateCategoryRequest> for CategoryPatch {
    fn from(r: UpdateCategoryRequest) -> Self {
        CategoryPatch { name: r.name, description: r.description, parent_id: r.parent_id }
    }
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Address,
    pub payment_method: String,
    pub notes: Option<String>,
}

impl From<CreateOrderRequest> for OrderRequest {
    fn from(r: CreateOrderRequest) -> Self {
        OrderRequest {
            items: r.items.into_iter().map(|i| OrderLine { product_id: i.product_id, quantity: i.quantity }).collect(),
            shipping_address: r.shipping_address,
            payment_method: r.payment_method,
            notes: r.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: ProductId,
    pub rating: i64,
    pub comment: Option<String>,
    pub title: Option<String>,
}

impl From<CreateReviewRequest> for NewReview {
    fn from(r: CreateReviewRequest) -> Self {
        NewReview { product_id: r.product_id, rating: r.rating, comment: r.comment, title: r.title }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub title: Option<String>,
}
