use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::AuthUser;
use crate::api::dto::{Body, LoginRequest, PathParam, TokenResponse};
use crate::api::AppState;
use crate::domain::aggregates::{Order, Review, User};
use crate::domain::value_objects::UserId;
use crate::services::Registration;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/orders", get(user_orders))
        .route("/users/:id/reviews", get(user_reviews))
        .route("/me", get(me))
        .route("/me/orders", get(my_orders))
}

async fn register(State(s): State<AppState>, Body(r): Body<Registration>) -> Result<(StatusCode, Json<User>)> {
    let user = s.services.accounts.register(r).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(State(s): State<AppState>, Body(r): Body<LoginRequest>) -> Result<Json<TokenResponse>> {
    let token = s.services.accounts.login(&r.email, &r.password).await?;
    Ok(Json(TokenResponse { token }))
}

async fn list_users(State(s): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(s.services.accounts.users().await?))
}

async fn get_user(State(s): State<AppState>, PathParam(id): PathParam<UserId>) -> Result<Json<User>> {
    Ok(Json(s.services.accounts.user(id).await?))
}

async fn user_orders(State(s): State<AppState>, PathParam(id): PathParam<UserId>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.services.orders.orders_for_user(id).await?))
}

async fn user_reviews(State(s): State<AppState>, PathParam(id): PathParam<UserId>) -> Result<Json<Vec<Review>>> {
    Ok(Json(s.services.reviews.reviews_for_user(id).await?))
}

async fn me(State(s): State<AppState>, AuthUser(id): AuthUser) -> Result<Json<User>> {
    Ok(Json(s.services.accounts.user(id).await?))
}

async fn my_orders(State(s): State<AppState>, AuthUser(id): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.services.orders.orders_for_user(id).await?))
}
