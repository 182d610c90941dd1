use axum::Router;

use crate::api::AppState;

pub mod categories;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

/// Everything under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
}
