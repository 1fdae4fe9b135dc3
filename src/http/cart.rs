//! Cart endpoints and checkout.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::orders::OrderView;
use super::{AppState, MessageResponse};
use crate::domain::aggregates::{Cart, ShippingInfo};
use crate::domain::policy::{authorize, Action, Identity, Resource};
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "one", alias = "qty")]
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 1, message = "size is required"))]
    pub size: String,
}

fn one() -> i32 { 1 }

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub shipping: ShippingInfo,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/add", post(add_to_cart))
        .route("/checkout", post(checkout))
}

async fn get_cart(State(s): State<AppState>, identity: Identity) -> Result<Json<Cart>> {
    authorize(Some(&identity), Action::UseCart, Resource::Unowned)?;
    Ok(Json(s.carts.load(identity.user_id).await?))
}

async fn add_to_cart(State(s): State<AppState>, identity: Identity, Json(r): Json<AddToCartRequest>) -> Result<Json<Cart>> {
    authorize(Some(&identity), Action::UseCart, Resource::Unowned)?;
    let size = r.size.trim();
    if size.is_empty() {
        return Err(EcommerceError::Validation("size is required".to_string()));
    }
    r.validate()?;
    s.carts
        .add(identity.user_id, r.product_id, size, r.quantity)
        .await?
        .map(Json)
        .ok_or_else(|| EcommerceError::NotFound("Product not found".to_string()))
}

async fn clear_cart(State(s): State<AppState>, identity: Identity) -> Result<Json<MessageResponse>> {
    authorize(Some(&identity), Action::UseCart, Resource::Unowned)?;
    s.carts.clear(identity.user_id).await?;
    Ok(Json(MessageResponse { message: "Cart cleared" }))
}

/// The cart is emptied before the order is placed, so a cart turns into at
/// most one order. A failed placement puts the lines back.
async fn checkout(State(s): State<AppState>, identity: Identity, Json(r): Json<CheckoutRequest>) -> Result<(StatusCode, Json<OrderView>)> {
    authorize(Some(&identity), Action::UseCart, Resource::Unowned)?;
    let cart = s.carts.take(identity.user_id).await?;
    if cart.is_empty() {
        return Err(EcommerceError::Validation("Cart is empty".to_string()));
    }
    match s.orders.create_order(Some(&identity), cart.to_line_items(), r.shipping).await {
        Ok(order) => {
            tracing::info!(order_id = %order.id(), items = cart.items().len(), "checked out cart");
            Ok((StatusCode::CREATED, Json(OrderView::from(&order))))
        }
        Err(e) => {
            if let Err(restore) = s.carts.restore(&cart).await {
                tracing::error!(user_id = %identity.user_id, "cart lost after failed checkout: {}", restore);
            }
            Err(e)
        }
    }
}
