use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::auth::AuthUser;
use crate::api::dto::{Body, CreateOrderRequest, PathParam, UpdateStatusRequest};
use crate::api::AppState;
use crate::domain::aggregates::Order;
use crate::domain::value_objects::OrderId;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", patch(update_status))
        .route("/:id/cancel", post(cancel_order))
}

async fn list_orders(State(s): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.services.orders.orders().await?))
}

async fn get_order(State(s): State<AppState>, PathParam(id): PathParam<OrderId>) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.order(id).await?))
}

async fn create_order(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Body(r): Body<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = s.services.orders.create(user, r.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn update_status(
    State(s): State<AppState>,
    PathParam(id): PathParam<OrderId>,
    Body(r): Body<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.update_status(id, r.status, r.tracking_number).await?))
}

async fn cancel_order(State(s): State<AppState>, PathParam(id): PathParam<OrderId>) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.cancel(id).await?))
}
