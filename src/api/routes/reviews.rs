use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::AuthUser;
use crate::api::dto::{Body, CreateReviewRequest, Deleted, PathParam, UpdateReviewRequest};
use crate::api::AppState;
use crate::domain::aggregates::Review;
use crate::domain::value_objects::ReviewId;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/:id", get(get_review).patch(update_review).delete(delete_review))
}

async fn create_review(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Body(r): Body<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = s.services.reviews.create(user, r.into()).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn get_review(State(s): State<AppState>, PathParam(id): PathParam<ReviewId>) -> Result<Json<Review>> {
    Ok(Json(s.services.reviews.review(id).await?))
}

async fn update_review(
    State(s): State<AppState>,
    PathParam(id): PathParam<ReviewId>,
    Body(r): Body<UpdateReviewRequest>,
) -> Result<Json<Review>> {
    Ok(Json(s.services.reviews.update(id, r.rating, r.comment, r.title).await?))
}

async fn delete_review(State(s): State<AppState>, PathParam(id): PathParam<ReviewId>) -> Result<Json<Deleted>> {
    Ok(Json(Deleted { deleted: s.services.reviews.delete(id).await? }))
}
