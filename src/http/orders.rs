//! Order endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppState, ListParams, MessageResponse, PaginatedResponse};
use crate::domain::aggregates::{CancelRequest, LineItem, Order, OrderStatus, ShippingInfo};
use crate::domain::policy::Identity;
use crate::services::orders::OrderStats;
use crate::{EcommerceError, Result};

/// Wire shape of an order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user: Option<Uuid>,
    pub is_guest: bool,
    pub guest_phone: Option<String>,
    pub items: Vec<LineItem>,
    pub shipping: ShippingInfo,
    pub total: i64,
    pub status: OrderStatus,
    pub cancel_request: Option<CancelRequest>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id(),
            user: o.user_id(),
            is_guest: o.is_guest(),
            guest_phone: o.guest_phone().map(|p| p.to_string()),
            items: o.items().to_vec(),
            shipping: o.shipping().clone(),
            total: o.total(),
            status: o.status(),
            cancel_request: o.cancel_request().cloned(),
            version: o.version(),
            created_at: o.created_at(),
            updated_at: o.updated_at(),
        }
    }
}

fn views(orders: &[Order]) -> Vec<OrderView> { orders.iter().map(OrderView::from).collect() }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "qty")]
    pub quantity: i32,
    pub price: i64,
    #[serde(default)]
    pub size: String,
}

impl From<LineItemRequest> for LineItem {
    fn from(r: LineItemRequest) -> Self {
        LineItem { product_id: r.product_id, name: r.name, quantity: r.quantity, unit_price: r.price, size: r.size }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub shipping: ShippingInfo,
}

#[derive(Debug, Deserialize)]
pub struct GuestOrderRequest {
    /// Falls back to the shipping phone when absent.
    pub phone: Option<String>,
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub shipping: ShippingInfo,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequestBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct OrderActionResponse {
    pub message: &'static str,
    pub order: OrderView,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_order))
        .route("/guest-create", post(create_guest_order))
        .route("/my-orders", get(my_orders))
        .route("/guest-orders/:phone", get(guest_orders))
        .route("/guest-invoice/:id", get(guest_invoice))
        .route("/cancel-request/:id", post(request_cancellation))
        .route("/user/:id", get(orders_by_user))
        .route("/admin/all-orders", get(all_orders))
        .route("/admin/update-status/:id", put(update_status))
        .route("/admin/delete/:id", delete(delete_order))
        .route("/admin/cancel-request/approve/:id", put(approve_cancel_request))
        .route("/admin/cancel-request/decline/:id", put(decline_cancel_request))
        .route("/admin/pending-count", get(pending_count))
        .route("/admin/order-stats", get(order_stats))
        .route("/:id", get(get_order))
}

async fn create_order(State(s): State<AppState>, identity: Identity, Json(r): Json<CreateOrderRequest>) -> Result<(StatusCode, Json<OrderView>)> {
    let items = r.items.into_iter().map(LineItem::from).collect();
    let order = s.orders.create_order(Some(&identity), items, r.shipping).await?;
    Ok((StatusCode::CREATED, Json(OrderView::from(&order))))
}

async fn create_guest_order(State(s): State<AppState>, Json(r): Json<GuestOrderRequest>) -> Result<(StatusCode, Json<OrderView>)> {
    let phone = r.phone.filter(|p| !p.trim().is_empty()).unwrap_or_else(|| r.shipping.phone.clone());
    let items = r.items.into_iter().map(LineItem::from).collect();
    let order = s.orders.create_guest_order(&phone, items, r.shipping).await?;
    Ok((StatusCode::CREATED, Json(OrderView::from(&order))))
}

async fn my_orders(State(s): State<AppState>, identity: Identity) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(views(&s.orders.own_orders(Some(&identity)).await?)))
}

async fn guest_orders(State(s): State<AppState>, Path(phone): Path<String>) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(views(&s.orders.guest_orders(&phone).await?)))
}

async fn get_order(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>) -> Result<Json<OrderView>> {
    Ok(Json(OrderView::from(&s.orders.order_by_id(Some(&identity), id).await?)))
}

async fn guest_invoice(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderView>> {
    Ok(Json(OrderView::from(&s.orders.guest_invoice(id).await?)))
}

async fn all_orders(State(s): State<AppState>, identity: Identity, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<OrderView>>> {
    let page = p.page();
    let (orders, total) = s.orders.list_orders(Some(&identity), page).await?;
    Ok(Json(PaginatedResponse { data: views(&orders), total, page: page.page }))
}

async fn orders_by_user(State(s): State<AppState>, identity: Identity, Path(user_id): Path<Uuid>) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(views(&s.orders.orders_by_user(Some(&identity), user_id).await?)))
}

async fn update_status(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<OrderActionResponse>> {
    let status = r.status.parse::<OrderStatus>().map_err(|e| EcommerceError::Validation(e.to_string()))?;
    let order = s.orders.update_status(Some(&identity), id, status).await?;
    Ok(Json(OrderActionResponse { message: "Order status updated", order: OrderView::from(&order) }))
}

async fn delete_order(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>) -> Result<Json<MessageResponse>> {
    s.orders.delete_order(Some(&identity), id).await?;
    Ok(Json(MessageResponse { message: "Order deleted" }))
}

async fn request_cancellation(
    State(s): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequestBody>>,
) -> Result<Json<OrderActionResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let order = s.orders.request_cancellation(Some(&identity), id, &body.reason).await?;
    Ok(Json(OrderActionResponse { message: "Cancel request sent", order: OrderView::from(&order) }))
}

async fn approve_cancel_request(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>) -> Result<Json<OrderActionResponse>> {
    let order = s.orders.approve_cancel_request(Some(&identity), id).await?;
    Ok(Json(OrderActionResponse { message: "Cancel request approved", order: OrderView::from(&order) }))
}

async fn decline_cancel_request(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>) -> Result<Json<OrderActionResponse>> {
    let order = s.orders.decline_cancel_request(Some(&identity), id).await?;
    Ok(Json(OrderActionResponse { message: "Cancel request declined", order: OrderView::from(&order) }))
}

async fn pending_count(State(s): State<AppState>, identity: Identity) -> Result<Json<CountResponse>> {
    Ok(Json(CountResponse { count: s.orders.pending_count(Some(&identity)).await? }))
}

async fn order_stats(State(s): State<AppState>, identity: Identity) -> Result<Json<OrderStats>> {
    Ok(Json(s.orders.stats(Some(&identity)).await?))
}

#[cfg(test)]
mod tests {
    use crate::domain::value_objects::Role;
    use crate::http::testing::Harness;
    use crate::store::UserStore;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    fn order_body() -> serde_json::Value {
        json!({
            "items": [{"productId": Uuid::new_v4(), "name": "Panjabi", "qty": 2, "price": 500, "size": "M"}],
            "shipping": {"name": "Karim", "phone": "+8801700000000", "address": "House 7, Road 3", "city": "Dhaka"}
        })
    }

    #[tokio::test]
    async fn test_guest_checkout_and_lookup() {
        let h = Harness::new();
        let (status, created) = h.call(Method::POST, "/api/orders/guest-create", None, Some(order_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["isGuest"], true);
        assert_eq!(created["status"], "pending");
        assert_eq!(created["total"], 1000);

        let (status, list) = h.call(Method::GET, "/api/orders/guest-orders/+8801700000000", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], created["id"]);

        let uri = format!("/api/orders/guest-invoice/{}", created["id"].as_str().unwrap());
        let (status, invoice) = h.call(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(invoice["items"][0]["size"], "M");
    }

    #[tokio::test]
    async fn test_guest_checkout_rejects_overflowing_total() {
        let h = Harness::new();
        let body = json!({
            "phone": "+8801700000000",
            "items": [{"productId": Uuid::new_v4(), "qty": 2, "price": i64::MAX}]
        });
        let (status, body) = h.call(Method::POST, "/api/orders/guest-create", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Order total is too large");
        let (_, list) = h.call(Method::GET, "/api/orders/guest-orders/+8801700000000", None, None).await;
        assert_eq!(list.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let h = Harness::new();
        let (status, body) = h.call(Method::GET, "/api/orders/my-orders", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authentication required");
        let (status, _) = h.call(Method::POST, "/api/orders/create", Some("not-a-jwt"), Some(order_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_owner_cancel_and_admin_approve() {
        let h = Harness::new();
        let (_, customer) = h.login("Customer", Role::User).await;
        let (_, admin) = h.login("Admin", Role::Admin).await;

        let (status, order) = h.call(Method::POST, "/api/orders/create", Some(&customer), Some(order_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = order["id"].as_str().unwrap().to_string();

        let (status, _) = h
            .call(Method::PUT, &format!("/api/orders/admin/update-status/{id}"), Some(&admin), Some(json!({"status": "confirmed"})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = h
            .call(Method::POST, &format!("/api/orders/cancel-request/{id}"), Some(&customer), Some(json!({"reason": "wrong size"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["cancelRequest"]["status"], "pending");
        assert_eq!(body["order"]["status"], "confirmed");

        let (status, body) = h.call(Method::PUT, &format!("/api/orders/admin/cancel-request/approve/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["status"], "cancelled");
        assert_eq!(body["order"]["cancelRequest"]["status"], "approved");
    }

    #[tokio::test]
    async fn test_moderator_cannot_delete() {
        let h = Harness::new();
        let (_, customer) = h.login("Customer", Role::User).await;
        let (_, moderator) = h.login("Moderator", Role::Moderator).await;
        let (_, admin) = h.login("Admin", Role::Admin).await;
        let (_, order) = h.call(Method::POST, "/api/orders/create", Some(&customer), Some(order_body())).await;
        let id = order["id"].as_str().unwrap().to_string();

        let (status, body) = h.call(Method::DELETE, &format!("/api/orders/admin/delete/{id}"), Some(&moderator), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Admin access only");

        let (status, _) = h.call(Method::DELETE, &format!("/api/orders/admin/delete/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = h.call(Method::GET, &format!("/api/orders/{id}"), Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stranger_cannot_view_order() {
        let h = Harness::new();
        let (_, owner) = h.login("Owner", Role::User).await;
        let (_, stranger) = h.login("Stranger", Role::User).await;
        let (_, order) = h.call(Method::POST, "/api/orders/create", Some(&owner), Some(order_body())).await;
        let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

        assert_eq!(h.call(Method::GET, &uri, Some(&owner), None).await.0, StatusCode::OK);
        assert_eq!(h.call(Method::GET, &uri, Some(&stranger), None).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_role_change_applies_to_next_request() {
        let h = Harness::new();
        let (user_id, token) = h.login("Promoted", Role::User).await;
        assert_eq!(h.call(Method::GET, "/api/orders/admin/pending-count", Some(&token), None).await.0, StatusCode::FORBIDDEN);

        assert!(h.users.set_role(user_id, Role::Moderator).await.unwrap());
        let (status, body) = h.call(Method::GET, "/api/orders/admin/pending-count", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_invalid_status_and_stats() {
        let h = Harness::new();
        let (_, customer) = h.login("Customer", Role::User).await;
        let (_, moderator) = h.login("Moderator", Role::Moderator).await;
        let (_, order) = h.call(Method::POST, "/api/orders/create", Some(&customer), Some(order_body())).await;
        let id = order["id"].as_str().unwrap().to_string();

        let (status, _) = h
            .call(Method::PUT, &format!("/api/orders/admin/update-status/{id}"), Some(&moderator), Some(json!({"status": "lost"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h
            .call(Method::PUT, &format!("/api/orders/admin/update-status/{id}"), Some(&moderator), Some(json!({"status": "delivered"})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, stats) = h.call(Method::GET, "/api/orders/admin/order-stats", Some(&moderator), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["delivered"], 1);
        assert_eq!(stats["outForDelivery"], 0);

        let (status, page) = h.call(Method::GET, "/api/orders/admin/all-orders?page=1&perPage=5", Some(&moderator), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
        assert_eq!(page["data"][0]["status"], "delivered");
    }
}
