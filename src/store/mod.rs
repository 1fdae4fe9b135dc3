//! Persistence for orders, carts and the user directory.
//!
//! The stores are traits so the lifecycle engine and the HTTP layer can run
//! against Postgres in production and against the in-memory backends in
//! tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Cart, CartOverflow, Order, OrderStatus};
use crate::domain::value_objects::{ContactPhone, Role};

pub use memory::{MemoryCartStore, MemoryOrderStore, MemoryUserStore};
pub use postgres::{PgCartStore, PgOrderStore, PgUserStore};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The record changed since it was read.
    #[error("version conflict")]
    Conflict,

    #[error("record not found")]
    NotFound,

    /// The write would break a limit of the stored data.
    #[error("{0}")]
    Rejected(String),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<CartOverflow> for StoreError {
    fn from(e: CartOverflow) -> Self {
        Self::Rejected(e.to_string())
    }
}

/// Page window for listings, 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(Self::DEFAULT_PER_PAGE).clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.per_page) }
    pub fn limit(&self) -> i64 { i64::from(self.per_page) }
}

impl Default for Page {
    fn default() -> Self { Self::new(None, None) }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a freshly placed order and returns it as stored.
    async fn insert(&self, order: &Order) -> Result<Order, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Newest first.
    async fn find_by_owner(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;

    /// Guest orders placed with `phone`, newest first.
    async fn find_guest_by_phone(&self, phone: &ContactPhone) -> Result<Vec<Order>, StoreError>;

    /// All orders newest first, windowed by `page`.
    async fn list(&self, page: Page) -> Result<Vec<Order>, StoreError>;

    async fn count_all(&self) -> Result<i64, StoreError>;

    async fn count_by_owner(&self, user_id: Uuid) -> Result<i64, StoreError>;

    /// Statuses with no orders are absent from the map.
    async fn count_by_status(&self) -> Result<HashMap<OrderStatus, i64>, StoreError>;

    /// Writes the mutable part of `order` (status, cancel request, updated
    /// timestamp) if the stored version still equals `order.version()`.
    /// Returns the stored order with its bumped version.
    async fn update(&self, order: &Order) -> Result<Order, StoreError>;

    /// Hard delete. `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

pub type DynOrderStore = Arc<dyn OrderStore>;

/// Directory entry for a registered user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// Contact details users edit on their own profile. `None` keeps the stored
/// value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 32, message = "phone is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 500, message = "address is too long"))]
    pub address: Option<String>,
    #[validate(length(max = 100, message = "city is too long"))]
    pub city: Option<String>,
}

impl ProfileUpdate {
    /// Trims every present field.
    pub fn normalized(self) -> Self {
        let trim = |v: Option<String>| v.map(|v| v.trim().to_string());
        Self { name: trim(self.name), phone: trim(self.phone), address: trim(self.address), city: trim(self.city) }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Current role of the user, `None` when the user is unknown.
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, StoreError>;

    async fn find(&self, user_id: Uuid) -> Result<Option<UserSummary>, StoreError>;

    async fn list(&self) -> Result<Vec<UserSummary>, StoreError>;

    /// `false` when the user does not exist.
    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<bool, StoreError>;

    /// Applies the present fields. `None` when the user does not exist.
    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Option<UserSummary>, StoreError>;
}

pub type DynUserStore = Arc<dyn UserStore>;

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> Result<Cart, StoreError>;

    /// Adds `quantity` of a product in `size`. A new line snapshots the
    /// current catalog name and price. `None` when the product is unknown.
    async fn add(&self, user_id: Uuid, product_id: Uuid, size: &str, quantity: i32) -> Result<Option<Cart>, StoreError>;

    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError>;

    /// Empties the cart and returns what it held, in one step. Two callers
    /// racing on the same cart never both receive a line.
    async fn take(&self, user_id: Uuid) -> Result<Cart, StoreError>;

    /// Puts taken lines back, merging with anything added since.
    async fn restore(&self, cart: &Cart) -> Result<(), StoreError>;
}

pub type DynCartStore = Arc<dyn CartStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamps() {
        assert_eq!(Page::default(), Page { page: 1, per_page: 20 });
        let page = Page::new(Some(0), Some(500));
        assert_eq!(page, Page { page: 1, per_page: 100 });
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
    }
}
