use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use catalog_orders::api::{router, AppState};
use catalog_orders::config::{Config, WorkflowMode};
use catalog_orders::domain::events::EventPublisher;
use catalog_orders::services::Services;
use catalog_orders::store::{InMemoryStore, Store};

fn app_with(mode: WorkflowMode) -> Router {
    let config = Config { workflow_mode: mode, ..Config::default() };
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    router(AppState::new(Services::new(store, EventPublisher::disabled(), &config)), config.request_timeout)
}

fn app() -> Router {
    app_with(WorkflowMode::Strict)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

/// Registers and logs in a user, returning `(user id, token)`.
async fn sign_up(app: &Router, username: &str) -> (String, String) {
    let email = format!("{username}@example.com");
    let (status, user) = post(
        app,
        "/api/v1/auth/register",
        None,
        json!({"username": username, "email": email, "password": "secret-pw", "firstName": "Test", "lastName": "User"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    assert!(user.get("passwordHash").is_none());

    let (status, login) = post(app, "/api/v1/auth/login", None, json!({"email": email, "password": "secret-pw"})).await;
    assert_eq!(status, StatusCode::OK);
    (user["id"].as_str().unwrap().to_string(), login["token"].as_str().unwrap().to_string())
}

async fn category(app: &Router, name: &str, parent: Option<&str>) -> String {
    let (status, body) = post(app, "/api/v1/categories", None, json!({"name": name, "parentId": parent})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn product(app: &Router, category_id: &str, sku: &str, price: f64, stock: u32, tags: &[&str]) -> String {
    let (status, body) = post(
        app,
        "/api/v1/products",
        None,
        json!({
            "name": format!("Product {sku}"),
            "description": "integration test product",
            "price": price,
            "categoryId": category_id,
            "stock": stock,
            "sku": sku,
            "tags": tags,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

fn order_body(product_id: &str, quantity: u32) -> Value {
    json!({
        "items": [{"productId": product_id, "quantity": quantity}],
        "shippingAddress": {"street": "1 Main St", "city": "Springfield", "state": "IL", "zipCode": "62701", "country": "US"},
        "paymentMethod": "credit_card"
    })
}

async fn stock_of(app: &Router, product_id: &str) -> u64 {
    let (_, body) = get(app, &format!("/api/v1/products/{product_id}")).await;
    body["stock"].as_u64().unwrap()
}

#[tokio::test]
async fn health_endpoint() {
    let (status, body) = get(&app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn order_lifecycle_moves_stock() {
    let app = app();
    let (user_id, token) = sign_up(&app, "buyer").await;
    let cat = category(&app, "Audio", None).await;
    let pid = product(&app, &cat, "hp-1", 100.0, 5, &["audio"]).await;

    let (status, order) = post(&app, "/api/v1/orders", Some(&token), order_body(&pid, 2)).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["userId"], user_id.as_str());
    assert_eq!(order["totalAmount"].as_f64(), Some(200.0));
    assert_eq!(stock_of(&app, &pid).await, 3);

    let order_id = order["id"].as_str().unwrap();
    let (status, mine) = send(&app, Method::GET, "/api/v1/me/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, processing) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/orders/{order_id}/status"),
        None,
        Some(json!({"status": "PROCESSING"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processing["status"], "PROCESSING");

    let (status, cancelled) = post(&app, &format!("/api/v1/orders/{order_id}/cancel"), None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(stock_of(&app, &pid).await, 5);

    let (status, err) = post(&app, &format!("/api/v1/orders/{order_id}/cancel"), None, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "invalid_transition");
    assert_eq!(stock_of(&app, &pid).await, 5);
}

#[tokio::test]
async fn lenient_mode_double_cancel_restores_twice() {
    let app = app_with(WorkflowMode::Lenient);
    let (_, token) = sign_up(&app, "buyer").await;
    let cat = category(&app, "Audio", None).await;
    let pid = product(&app, &cat, "hp-1", 10.0, 5, &[]).await;

    let (_, order) = post(&app, "/api/v1/orders", Some(&token), order_body(&pid, 2)).await;
    let cancel = format!("/api/v1/orders/{}/cancel", order["id"].as_str().unwrap());
    assert_eq!(post(&app, &cancel, None, json!({})).await.0, StatusCode::OK);
    assert_eq!(post(&app, &cancel, None, json!({})).await.0, StatusCode::OK);
    assert_eq!(stock_of(&app, &pid).await, 7);
}

#[tokio::test]
async fn ordering_requires_authentication() {
    let app = app();
    let cat = category(&app, "Audio", None).await;
    let pid = product(&app, &cat, "hp-1", 10.0, 5, &[]).await;

    let (status, body) = post(&app, "/api/v1/orders", None, order_body(&pid, 1)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = post(&app, "/api/v1/orders", Some("not-a-token"), order_body(&pid, 1)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(stock_of(&app, &pid).await, 5);

    let (status, _) = get(&app, "/api/v1/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversell_is_rejected() {
    let app = app();
    let (_, token) = sign_up(&app, "buyer").await;
    let cat = category(&app, "Audio", None).await;
    let pid = product(&app, &cat, "hp-1", 10.0, 1, &[]).await;

    let (status, body) = post(&app, "/api/v1/orders", Some(&token), order_body(&pid, 2)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(stock_of(&app, &pid).await, 1);

    let (status, _) = post(&app, "/api/v1/orders", Some(&token), order_body(&pid, 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reviews_drive_product_rating() {
    let app = app();
    let (user_id, token) = sign_up(&app, "critic").await;
    let cat = category(&app, "Audio", None).await;
    let pid = product(&app, &cat, "hp-1", 10.0, 1, &[]).await;

    for rating in [5, 2] {
        let (status, body) = post(&app, "/api/v1/reviews", Some(&token), json!({"productId": pid, "rating": rating})).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
    let (_, product) = get(&app, &format!("/api/v1/products/{pid}")).await;
    assert_eq!(product["rating"], json!({"average": 3.5, "count": 2}));

    let (status, body) = post(&app, "/api/v1/reviews", Some(&token), json!({"productId": pid, "rating": 7})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (_, reviews) = get(&app, &format!("/api/v1/products/{pid}/reviews")).await;
    let first = reviews[0]["id"].as_str().unwrap().to_string();
    let (status, deleted) = send(&app, Method::DELETE, &format!("/api/v1/reviews/{first}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"deleted": true}));

    let (_, product) = get(&app, &format!("/api/v1/products/{pid}")).await;
    assert_eq!(product["rating"], json!({"average": 2.0, "count": 1}));

    let (_, by_user) = get(&app, &format!("/api/v1/users/{user_id}/reviews")).await;
    assert_eq!(by_user.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn product_listing_filters_and_sorts() {
    let app = app();
    let audio = category(&app, "Audio", None).await;
    let kitchen = category(&app, "Kitchen", None).await;
    product(&app, &audio, "a-1", 20.0, 3, &["audio"]).await;
    product(&app, &audio, "a-2", 80.0, 0, &["audio", "wireless"]).await;
    product(&app, &audio, "a-3", 50.0, 2, &["wireless"]).await;
    product(&app, &kitchen, "k-1", 35.0, 9, &["steel"]).await;

    let (status, body) = get(&app, "/api/v1/products?minPrice=30&sortField=PRICE&sortOrder=DESC").await;
    assert_eq!(status, StatusCode::OK);
    let skus: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["sku"].as_str().unwrap()).collect();
    assert_eq!(skus, vec!["A-2", "A-3", "K-1"]);

    let (_, body) = get(&app, &format!("/api/v1/products?categoryId={audio}&inStock=true&tags=wireless,steel")).await;
    let skus: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["sku"].as_str().unwrap()).collect();
    assert_eq!(skus, vec!["A-3"]);

    let (_, body) = get(&app, "/api/v1/products?sortField=NAME&limit=2&offset=1").await;
    let skus: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["sku"].as_str().unwrap()).collect();
    assert_eq!(skus, vec!["A-2", "A-3"]);

    let (_, body) = get(&app, "/api/v1/products/search?query=WIRELESS").await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get(&app, "/api/v1/products/sku/k-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!(["steel"]));

    let (_, body) = get(&app, &format!("/api/v1/categories/{kitchen}/products")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn category_tree_endpoints() {
    let app = app();
    let root = category(&app, "Electronics", None).await;
    let audio = category(&app, "Audio", Some(&root)).await;

    let (_, top) = get(&app, "/api/v1/categories/top").await;
    assert_eq!(top.as_array().unwrap().len(), 1);
    let (_, subs) = get(&app, &format!("/api/v1/categories/{root}/subcategories")).await;
    assert_eq!(subs[0]["id"], audio.as_str());

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/categories/{root}"),
        None,
        Some(json!({"parentId": audio})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = send(&app, Method::PATCH, &format!("/api/v1/categories/{audio}"), None, Some(json!({"parentId": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["parentId"], Value::Null);

    let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/categories/{audio}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": true}));
}

#[tokio::test]
async fn error_responses() {
    let app = app();
    let (status, body) = get(&app, "/api/v1/products/0190a000-0000-7000-8000-00000000abcd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = post(&app, "/api/v1/auth/login", None, json!({"email": "nobody@example.com", "password": "x"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, body) = post(&app, "/api/v1/categories", None, json!({"description": "missing name"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = post(&app, "/api/v1/products", None, json!({
        "name": "Orphan", "description": "no category", "price": 1, "categoryId": "0190a000-0000-7000-8000-00000000abcd", "sku": "X"
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn malformed_paths_and_queries_get_json_errors() {
    let app = app();
    let (status, body) = get(&app, "/api/v1/orders/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].is_string());

    let (status, body) = get(&app, "/api/v1/products?sortField=BOGUS").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = get(&app, "/api/v1/products?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn prices_outside_the_stored_range_are_rejected() {
    let app = app();
    let cat = category(&app, "Luxury", None).await;
    for price in [json!(7e28), json!(19.999), json!(1e12)] {
        let (status, body) = post(&app, "/api/v1/products", None, json!({
            "name": "Yacht", "description": "too pricey", "price": price, "categoryId": cat, "sku": "YACHT-1"
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{price}: {body}");
        assert_eq!(body["error"], "validation_error");
        assert!(body["message"].as_str().unwrap().contains("price"), "{body}");
    }
    product(&app, &cat, "YACHT-1", 19.99, 1, &[]).await;
    let (status, listed) = get(&app, "/api/v1/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
