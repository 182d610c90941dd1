use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{Body, CreateCategoryRequest, Deleted, PathParam, UpdateCategoryRequest};
use crate::api::AppState;
use crate::domain::aggregates::{Category, Product};
use crate::domain::value_objects::CategoryId;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/top", get(top_categories))
        .route("/:id", get(get_category).patch(update_category).delete(delete_category))
        .route("/:id/subcategories", get(subcategories))
        .route("/:id/products", get(category_products))
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.services.catalog.categories().await?))
}

async fn top_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.services.catalog.top_categories().await?))
}

async fn get_category(State(s): State<AppState>, PathParam(id): PathParam<CategoryId>) -> Result<Json<Category>> {
    Ok(Json(s.services.catalog.category(id).await?))
}

async fn create_category(State(s): State<AppState>, Body(r): Body<CreateCategoryRequest>) -> Result<(StatusCode, Json<Category>)> {
    let category = s.services.catalog.create_category(r.into()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(s): State<AppState>,
    PathParam(id): PathParam<CategoryId>,
    Body(r): Body<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    Ok(Json(s.services.catalog.update_category(id, r.into()).await?))
}

async fn delete_category(State(s): State<AppState>, PathParam(id): PathParam<CategoryId>) -> Result<Json<Deleted>> {
    Ok(Json(Deleted { deleted: s.services.catalog.delete_category(id).await? }))
}

async fn subcategories(State(s): State<AppState>, PathParam(id): PathParam<CategoryId>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.services.catalog.subcategories(id).await?))
}

async fn category_products(State(s): State<AppState>, PathParam(id): PathParam<CategoryId>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.services.catalog.products_in_category(id).await?))
}
