//! Postgres store backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CartStore, OrderStore, Page, ProfileUpdate, StoreError, UserStore, UserSummary};
use crate::domain::aggregates::{CancelRequest, Cart, CartItem, LineItem, Order, OrderStatus, Owner, ShippingInfo};
use crate::domain::value_objects::{ContactPhone, Role};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Option<Uuid>,
    is_guest: bool,
    guest_phone: Option<String>,
    items: Json<Vec<LineItem>>,
    shipping: Json<ShippingInfo>,
    total: i64,
    status: String,
    cancel_request: Option<Json<CancelRequest>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt { id: row.id, reason };
        let owner = match (row.is_guest, row.user_id, &row.guest_phone) {
            (false, Some(user_id), None) => Owner::Registered { user_id },
            (true, None, Some(phone)) => Owner::Guest { phone: ContactPhone::new(phone.as_str()).map_err(|e| corrupt(e.to_string()))? },
            _ => return Err(corrupt("owner columns disagree with is_guest".to_string())),
        };
        let status = row.status.parse::<OrderStatus>().map_err(|e| corrupt(e.to_string()))?;
        Ok(Order {
            id: row.id,
            owner,
            items: row.items.0,
            shipping: row.shipping.0,
            total: row.total,
            status,
            cancel_request: row.cancel_request.map(|j| j.0),
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            events: vec![],
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
    rows.into_iter().map(Order::try_from).collect()
}

#[derive(Clone)]
pub struct PgOrderStore {
    db: PgPool,
}

impl PgOrderStore {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (id, user_id, is_guest, guest_phone, items, shipping, total, status, cancel_request, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11) RETURNING *",
        )
        .bind(order.id())
        .bind(order.user_id())
        .bind(order.is_guest())
        .bind(order.guest_phone().map(ContactPhone::as_str))
        .bind(Json(order.items()))
        .bind(Json(order.shipping()))
        .bind(order.total())
        .bind(order.status().as_str())
        .bind(order.cancel_request().map(Json))
        .bind(order.created_at())
        .bind(order.updated_at())
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn find_by_owner(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        into_orders(rows)
    }

    async fn find_guest_by_phone(&self, phone: &ContactPhone) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE is_guest AND guest_phone = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(phone.as_str())
        .fetch_all(&self.db)
        .await?;
        into_orders(rows)
    }

    async fn list(&self, page: Page) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2")
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.db)
            .await?;
        into_orders(rows)
    }

    async fn count_all(&self) -> Result<i64, StoreError> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&self.db).await?;
        Ok(total.0)
    }

    async fn count_by_owner(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(total.0)
    }

    async fn count_by_status(&self) -> Result<HashMap<OrderStatus, i64>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
            .fetch_all(&self.db)
            .await?;
        rows.into_iter()
            .map(|(status, count)| {
                let status = status.parse::<OrderStatus>().map_err(|e| StoreError::Backend(e.to_string()))?;
                Ok((status, count))
            })
            .collect()
    }

    async fn update(&self, order: &Order) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "UPDATE orders SET status = $3, cancel_request = $4, updated_at = $5, version = version + 1 \
             WHERE id = $1 AND version = $2 RETURNING *",
        )
        .bind(order.id())
        .bind(order.version())
        .bind(order.status().as_str())
        .bind(order.cancel_request().map(Json))
        .bind(order.updated_at())
        .fetch_optional(&self.db)
        .await?;
        match row {
            Some(row) => row.try_into(),
            None => {
                let exists: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                    .bind(order.id())
                    .fetch_one(&self.db)
                    .await?;
                Err(if exists.0 { StoreError::Conflict } else { StoreError::NotFound })
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, StoreError> {
        let role: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        role.map(|(role,)| role.parse::<Role>().map_err(|e| StoreError::Corrupt { id: user_id, reason: e.to_string() }))
            .transpose()
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<UserSummary>, StoreError> {
        let user = sqlx::query_as::<_, UserSummary>("SELECT id, name, email, phone, city, address, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<UserSummary>, StoreError> {
        let users = sqlx::query_as::<_, UserSummary>("SELECT id, name, email, phone, city, address, role FROM users ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Option<UserSummary>, StoreError> {
        let user = sqlx::query_as::<_, UserSummary>(
            "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone), address = COALESCE($4, address), city = COALESCE($5, city) \
             WHERE id = $1 RETURNING id, name, email, phone, city, address, role",
        )
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.city)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[derive(Clone)]
pub struct PgCartStore {
    db: PgPool,
}

impl PgCartStore {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

// Quantity merges stop short of INTEGER overflow; a blocked merge updates no row.
const UPSERT_LINE: &str = "INSERT INTO cart_items (user_id, product_id, name, size, quantity, unit_price, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
     ON CONFLICT (user_id, product_id, size) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
     WHERE cart_items.quantity <= 2147483647 - EXCLUDED.quantity";

fn too_large() -> StoreError { StoreError::Rejected("Cart quantity is too large".to_string()) }

#[async_trait]
impl CartStore for PgCartStore {
    async fn load(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT product_id, name, size, quantity, unit_price FROM cart_items WHERE user_id = $1 ORDER BY created_at, product_id, size",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Cart::with_items(user_id, items).map_err(|e| StoreError::Corrupt { id: user_id, reason: e.to_string() })
    }

    async fn add(&self, user_id: Uuid, product_id: Uuid, size: &str, quantity: i32) -> Result<Option<Cart>, StoreError> {
        let listing: Option<(String, i64)> = sqlx::query_as("SELECT name, price FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?;
        let Some((name, price)) = listing else {
            return Ok(None);
        };
        let done = sqlx::query(UPSERT_LINE)
            .bind(user_id)
            .bind(product_id)
            .bind(&name)
            .bind(size)
            .bind(quantity)
            .bind(price)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(too_large());
        }
        let cart = self.load(user_id).await?;
        Ok(Some(cart))
    }

    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&self.db).await?;
        Ok(())
    }

    async fn take(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        // A racing DELETE waits on the row locks and then finds nothing left.
        let mut tx = self.db.begin().await?;
        let items = sqlx::query_as::<_, CartItem>(
            "DELETE FROM cart_items WHERE user_id = $1 RETURNING product_id, name, size, quantity, unit_price",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        // Rolls back on overflow so the lines stay in the cart.
        let cart = Cart::with_items(user_id, items)?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn restore(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        for item in cart.items() {
            let done = sqlx::query(UPSERT_LINE)
                .bind(cart.user_id())
                .bind(item.product_id)
                .bind(&item.name)
                .bind(&item.size)
                .bind(item.quantity)
                .bind(item.unit_price)
                .execute(&mut *tx)
                .await?;
            if done.rows_affected() == 0 {
                return Err(too_large());
            }
        }
        tx.commit().await?;
        Ok(())
    }
}
