use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{Body, CreateProductRequest, Deleted, PathParam, ProductParams, QueryParams, SearchParams, UpdateProductRequest};
use crate::api::AppState;
use crate::domain::aggregates::{NewProduct, Product, ProductPatch, Review};
use crate::domain::value_objects::ProductId;
use crate::store::ProductQuery;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/sku/:sku", get(product_by_sku))
        .route("/:id", get(get_product).patch(update_product).delete(delete_product))
        .route("/:id/reviews", get(product_reviews))
}

async fn list_products(State(s): State<AppState>, QueryParams(p): QueryParams<ProductParams>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.services.catalog.products(&ProductQuery::from(p)).await?))
}

async fn search_products(State(s): State<AppState>, QueryParams(p): QueryParams<SearchParams>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.services.catalog.search_products(&p.query).await?))
}

async fn product_by_sku(State(s): State<AppState>, PathParam(sku): PathParam<String>) -> Result<Json<Product>> {
    Ok(Json(s.services.catalog.product_by_sku(&sku).await?))
}

async fn get_product(State(s): State<AppState>, PathParam(id): PathParam<ProductId>) -> Result<Json<Product>> {
    Ok(Json(s.services.catalog.product(id).await?))
}

async fn create_product(State(s): State<AppState>, Body(r): Body<CreateProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    let product = s.services.catalog.create_product(NewProduct::try_from(r)?).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(s): State<AppState>,
    PathParam(id): PathParam<ProductId>,
    Body(r): Body<UpdateProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(s.services.catalog.update_product(id, ProductPatch::try_from(r)?).await?))
}

async fn delete_product(State(s): State<AppState>, PathParam(id): PathParam<ProductId>) -> Result<Json<Deleted>> {
    Ok(Json(Deleted { deleted: s.services.catalog.delete_product(id).await? }))
}

async fn product_reviews(State(s): State<AppState>, PathParam(id): PathParam<ProductId>) -> Result<Json<Vec<Review>>> {
    Ok(Json(s.services.reviews.reviews_for_product(id).await?))
}
