//! HTTP surface: router, shared state and the handlers per resource.

pub mod auth;
pub mod cart;
pub mod error;
pub mod messages;
pub mod orders;
pub mod products;
pub mod profile;
pub mod ratings;
pub mod users;

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::orders::OrderLifecycle;
use crate::store::{DynCartStore, DynUserStore, Page};
use auth::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub orders: OrderLifecycle,
    pub users: DynUserStore,
    pub carts: DynCartStore,
    pub keys: JwtKeys,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub fn page(&self) -> Page { Page::new(self.page, self.per_page) }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/orders", orders::routes())
        .nest("/products", products::routes())
        .nest("/cart", cart::routes())
        .nest("/ratings", ratings::routes())
        .nest("/messages", messages::routes())
        .nest("/admin", users::routes())
        .nest("/auth", profile::routes());

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
