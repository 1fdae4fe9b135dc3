//! Catalog endpoints. Reads are public, writes need the admin role.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use super::{AppState, ListParams, MessageResponse, PaginatedResponse};
use crate::domain::aggregates::{Product, ProductInput};
use crate::domain::policy::{authorize, Action, Identity, Resource};
use crate::{EcommerceError, Result};

/// Catalog size for the admin dashboard.
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total: i64,
    pub by_category: BTreeMap<String, i64>,
}

impl ProductStats {
    pub fn from_counts(counts: impl IntoIterator<Item = (String, i64)>) -> Self {
        let mut stats = Self::default();
        for (category, count) in counts {
            stats.total += count;
            *stats.by_category.entry(category).or_default() += count;
        }
        stats
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/admin/product-stats", get(product_stats))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

fn not_found() -> EcommerceError { EcommerceError::NotFound("Product not found".to_string()) }

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Product>>> {
    let page = p.page();
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(page.limit()).bind(page.offset()).fetch_all(&s.db).await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&s.db).await?;
    Ok(Json(PaginatedResponse { data: products, total: total.0, page: page.page }))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&s.db).await?.map(Json).ok_or_else(not_found)
}

async fn product_stats(State(s): State<AppState>, identity: Identity) -> Result<Json<ProductStats>> {
    authorize(Some(&identity), Action::ViewProductStats, Resource::Unowned)?;
    let counts: Vec<(String, i64)> = sqlx::query_as("SELECT category, COUNT(*) FROM products GROUP BY category").fetch_all(&s.db).await?;
    Ok(Json(ProductStats::from_counts(counts)))
}

async fn create_product(State(s): State<AppState>, identity: Identity, Json(r): Json<ProductInput>) -> Result<(StatusCode, Json<Product>)> {
    authorize(Some(&identity), Action::ManageCatalog, Resource::Unowned)?;
    let r = r.normalized();
    r.validate()?;
    let p = sqlx::query_as::<_, Product>("INSERT INTO products (id, name, price, description, category, image_url, gallery, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name).bind(r.price).bind(&r.description).bind(&r.category).bind(&r.image_url).bind(&r.gallery)
        .fetch_one(&s.db).await?;
    tracing::info!(product_id = %p.id, "product created");
    Ok((StatusCode::CREATED, Json(p)))
}

async fn update_product(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>, Json(r): Json<ProductInput>) -> Result<Json<Product>> {
    authorize(Some(&identity), Action::ManageCatalog, Resource::Unowned)?;
    let r = r.normalized();
    r.validate()?;
    let p = sqlx::query_as::<_, Product>("UPDATE products SET name = $2, price = $3, description = $4, category = $5, image_url = $6, gallery = $7, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(&r.name).bind(r.price).bind(&r.description).bind(&r.category).bind(&r.image_url).bind(&r.gallery)
        .fetch_optional(&s.db).await?.ok_or_else(not_found)?;
    Ok(Json(p))
}

async fn delete_product(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>) -> Result<Json<MessageResponse>> {
    authorize(Some(&identity), Action::ManageCatalog, Resource::Unowned)?;
    let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 {
        return Err(not_found());
    }
    Ok(Json(MessageResponse { message: "Product deleted" }))
}

#[cfg(test)]
mod tests {
    use super::ProductStats;
    use crate::domain::value_objects::Role;
    use crate::http::testing::Harness;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn shirt() -> serde_json::Value {
        json!({"name": "Shirt", "price": 450, "category": "men", "imageUrl": "/uploads/products/shirt.jpg"})
    }

    // Authorization is decided before the catalog table is touched.
    #[tokio::test]
    async fn test_catalog_writes_are_admin_only() {
        let h = Harness::new();
        let (_, moderator) = h.login("Moderator", Role::Moderator).await;
        let (_, user) = h.login("Customer", Role::User).await;

        assert_eq!(h.call(Method::POST, "/api/products", None, Some(shirt())).await.0, StatusCode::UNAUTHORIZED);
        let (status, body) = h.call(Method::POST, "/api/products", Some(&moderator), Some(shirt())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Admin access only");

        let uri = format!("/api/products/{}", uuid::Uuid::new_v4());
        assert_eq!(h.call(Method::DELETE, &uri, Some(&user), None).await.0, StatusCode::FORBIDDEN);
        assert_eq!(h.call(Method::PUT, &uri, Some(&user), Some(shirt())).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_product_stats_are_admin_only() {
        let h = Harness::new();
        let (_, moderator) = h.login("Moderator", Role::Moderator).await;
        assert_eq!(h.call(Method::GET, "/api/products/admin/product-stats", None, None).await.0, StatusCode::UNAUTHORIZED);
        let (status, body) = h.call(Method::GET, "/api/products/admin/product-stats", Some(&moderator), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Admin access only");
    }

    #[test]
    fn test_stats_from_category_counts() {
        let stats = ProductStats::from_counts([("sneakers".to_string(), 3), ("hoodie".to_string(), 2), ("pant".to_string(), 1)]);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.by_category["hoodie"], 2);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json, json!({"total": 6, "byCategory": {"hoodie": 2, "pant": 1, "sneakers": 3}}));
        assert_eq!(ProductStats::from_counts(Vec::<(String, i64)>::new()), ProductStats::default());
    }
}
