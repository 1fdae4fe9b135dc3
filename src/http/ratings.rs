//! Product ratings: one per user and product.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AppState, MessageResponse};
use crate::domain::policy::{authorize, Action, Identity, Resource};
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i32,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub total: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(rate_product))
        .route("/:product_id", get(get_rating))
}

async fn rate_product(State(s): State<AppState>, identity: Identity, Json(r): Json<RateRequest>) -> Result<(StatusCode, Json<MessageResponse>)> {
    authorize(Some(&identity), Action::RateProduct, Resource::Unowned)?;
    r.validate()?;
    let known: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1").bind(r.product_id).fetch_optional(&s.db).await?;
    if known.is_none() {
        return Err(EcommerceError::NotFound("Product not found".to_string()));
    }
    let done = sqlx::query("INSERT INTO ratings (id, product_id, user_id, rating, created_at) VALUES ($1, $2, $3, $4, NOW()) ON CONFLICT (product_id, user_id) DO NOTHING")
        .bind(Uuid::now_v7()).bind(r.product_id).bind(identity.user_id).bind(r.rating)
        .execute(&s.db).await?;
    if done.rows_affected() == 0 {
        return Err(EcommerceError::Validation("You already rated this product".to_string()));
    }
    Ok((StatusCode::CREATED, Json(MessageResponse { message: "Rating submitted" })))
}

async fn get_rating(State(s): State<AppState>, Path(product_id): Path<Uuid>) -> Result<Json<RatingSummary>> {
    authorize(None, Action::ReadRatings, Resource::Unowned)?;
    let (avg, total): (f64, i64) = sqlx::query_as("SELECT COALESCE(AVG(rating)::float8, 0), COUNT(*) FROM ratings WHERE product_id = $1")
        .bind(product_id).fetch_one(&s.db).await?;
    Ok(Json(RatingSummary { avg_rating: (avg * 10.0).round() / 10.0, total }))
}

#[cfg(test)]
mod tests {
    use crate::domain::value_objects::Role;
    use crate::http::testing::Harness;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_rating_bounds() {
        let h = Harness::new();
        let (_, token) = h.login("Customer", Role::User).await;
        let product = uuid::Uuid::new_v4();
        for rating in [0, 6] {
            let (status, _) = h.call(Method::POST, "/api/ratings", Some(&token), Some(json!({"productId": product, "rating": rating}))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        let (status, _) = h.call(Method::POST, "/api/ratings", None, Some(json!({"productId": product, "rating": 4}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_summary_wire_format() {
        let json = serde_json::to_value(super::RatingSummary { avg_rating: 4.5, total: 2 }).unwrap();
        assert_eq!(json, json!({"avgRating": 4.5, "total": 2}));
    }
}
