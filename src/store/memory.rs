//! In-memory store backends.
//!
//! Same semantics as the Postgres stores, including the version check on
//! update, with data held in a `HashMap` behind a `tokio` read-write lock.
//! Used by the test-suite and handy for local development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CartStore, OrderStore, Page, ProfileUpdate, StoreError, UserStore, UserSummary};
use crate::domain::aggregates::{Cart, CartItem, Order, OrderStatus};
use crate::domain::value_objects::{ContactPhone, Role};

#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self { Self::default() }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    orders
}

/// Stored copies never carry pending events.
fn stored(order: &Order) -> Order {
    let mut copy = order.clone();
    copy.events.clear();
    copy
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Conflict);
        }
        let copy = stored(order);
        orders.insert(copy.id, copy.clone());
        Ok(copy)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_owner(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(newest_first(orders.values().filter(|o| o.user_id() == Some(user_id)).cloned().collect()))
    }

    async fn find_guest_by_phone(&self, phone: &ContactPhone) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(newest_first(orders.values().filter(|o| o.guest_phone() == Some(phone)).cloned().collect()))
    }

    async fn list(&self, page: Page) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let all = newest_first(orders.values().cloned().collect());
        Ok(all.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect())
    }

    async fn count_all(&self) -> Result<i64, StoreError> {
        Ok(self.orders.read().await.len() as i64)
    }

    async fn count_by_owner(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|o| o.user_id() == Some(user_id)).count() as i64)
    }

    async fn count_by_status(&self) -> Result<HashMap<OrderStatus, i64>, StoreError> {
        let orders = self.orders.read().await;
        let mut counts = HashMap::new();
        for order in orders.values() {
            *counts.entry(order.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn update(&self, order: &Order) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        let current = orders.get_mut(&order.id).ok_or(StoreError::NotFound)?;
        if current.version != order.version {
            return Err(StoreError::Conflict);
        }
        current.status = order.status;
        current.cancel_request = order.cancel_request.clone();
        current.updated_at = order.updated_at;
        current.version += 1;
        Ok(current.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.orders.write().await.remove(&id).is_some())
    }
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, UserSummary>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self { Self::default() }

    /// Registers a user with placeholder contact details and returns its id.
    pub async fn add_user(&self, name: &str, role: Role) -> Uuid {
        let id = Uuid::now_v7();
        let user = UserSummary {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: String::new(),
            city: String::new(),
            address: String::new(),
            role,
        };
        self.users.write().await.insert(id, user);
        id
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, StoreError> {
        Ok(self.users.read().await.get(&user_id).map(|u| u.role))
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<UserSummary>, StoreError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn list(&self) -> Result<Vec<UserSummary>, StoreError> {
        let mut users: Vec<_> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<bool, StoreError> {
        match self.users.write().await.get_mut(&user_id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Option<UserSummary>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(None);
        };
        for (field, value) in [
            (&mut user.name, &update.name),
            (&mut user.phone, &update.phone),
            (&mut user.address, &update.address),
            (&mut user.city, &update.city),
        ] {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }
        Ok(Some(user.clone()))
    }
}

/// Catalog name and price a new cart line copies.
#[derive(Clone, Debug)]
struct Listing {
    name: String,
    price: i64,
}

/// Carts keyed by user, with a small catalog of its own standing in for the
/// products table.
#[derive(Clone, Default)]
pub struct MemoryCartStore {
    catalog: Arc<RwLock<HashMap<Uuid, Listing>>>,
    carts: Arc<RwLock<HashMap<Uuid, Cart>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self { Self::default() }

    /// Lists a product, or changes its name and price.
    pub async fn put_product(&self, product_id: Uuid, name: &str, price: i64) {
        self.catalog.write().await.insert(product_id, Listing { name: name.to_string(), price });
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn load(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        Ok(self.carts.read().await.get(&user_id).cloned().unwrap_or_else(|| Cart::for_user(user_id)))
    }

    async fn add(&self, user_id: Uuid, product_id: Uuid, size: &str, quantity: i32) -> Result<Option<Cart>, StoreError> {
        let Some(listing) = self.catalog.read().await.get(&product_id).cloned() else {
            return Ok(None);
        };
        let mut carts = self.carts.write().await;
        let cart = carts.entry(user_id).or_insert_with(|| Cart::for_user(user_id));
        cart.add_item(CartItem { product_id, name: listing.name, size: size.to_string(), quantity, unit_price: listing.price })?;
        Ok(Some(cart.clone()))
    }

    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.carts.write().await.remove(&user_id);
        Ok(())
    }

    async fn take(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        Ok(self.carts.write().await.remove(&user_id).unwrap_or_else(|| Cart::for_user(user_id)))
    }

    async fn restore(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut carts = self.carts.write().await;
        let mut merged = carts.get(&cart.user_id()).cloned().unwrap_or_else(|| Cart::for_user(cart.user_id()));
        for item in cart.items() {
            merged.add_item(item.clone())?;
        }
        carts.insert(cart.user_id(), merged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{LineItem, Owner, ShippingInfo, TransitionPolicy};

    fn order_for(owner: Owner) -> Order {
        let item = LineItem { product_id: Uuid::new_v4(), name: "Saree".into(), quantity: 1, unit_price: 1200, size: "Free".into() };
        Order::place(owner, vec![item], ShippingInfo::default()).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_newest_first() {
        let store = MemoryOrderStore::new();
        let user = Uuid::new_v4();
        let first = store.insert(&order_for(Owner::Registered { user_id: user })).await.unwrap();
        let second = store.insert(&order_for(Owner::Registered { user_id: user })).await.unwrap();
        store.insert(&order_for(Owner::Registered { user_id: Uuid::new_v4() })).await.unwrap();

        let mine = store.find_by_owner(user).await.unwrap();
        assert_eq!(mine.iter().map(Order::id).collect::<Vec<_>>(), vec![second.id(), first.id()]);
        assert_eq!(store.count_by_owner(user).await.unwrap(), 2);
        assert_eq!(store.count_all().await.unwrap(), 3);
        assert_eq!(store.list(Page::new(Some(2), Some(2))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_guest_lookup_matches_phone_only() {
        let store = MemoryOrderStore::new();
        let phone = ContactPhone::new("+8801700000000").unwrap();
        store.insert(&order_for(Owner::Guest { phone: phone.clone() })).await.unwrap();
        store.insert(&order_for(Owner::Guest { phone: ContactPhone::new("+8801800000000").unwrap() })).await.unwrap();

        let found = store.find_guest_by_phone(&phone).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].guest_phone(), Some(&phone));
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = MemoryOrderStore::new();
        let saved = store.insert(&order_for(Owner::Registered { user_id: Uuid::new_v4() })).await.unwrap();

        let mut first = saved.clone();
        first.set_status(OrderStatus::Confirmed, TransitionPolicy::Open).unwrap();
        let updated = store.update(&first).await.unwrap();
        assert_eq!(updated.version(), 1);

        let mut stale = saved;
        stale.set_status(OrderStatus::Shipped, TransitionPolicy::Open).unwrap();
        assert!(matches!(store.update(&stale).await, Err(StoreError::Conflict)));

        assert!(store.delete(updated.id()).await.unwrap());
        assert!(matches!(store.update(&updated).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_user_roles() {
        let users = MemoryUserStore::new();
        let id = users.add_user("Rahim", Role::User).await;
        assert_eq!(users.role_of(id).await.unwrap(), Some(Role::User));
        assert!(users.set_role(id, Role::Moderator).await.unwrap());
        assert_eq!(users.role_of(id).await.unwrap(), Some(Role::Moderator));
        assert!(!users.set_role(Uuid::new_v4(), Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_profile_update_keeps_absent_fields() {
        let users = MemoryUserStore::new();
        let id = users.add_user("Rahim", Role::User).await;
        let update = ProfileUpdate { city: Some("Sylhet".into()), phone: Some("+8801900000000".into()), ..Default::default() };
        let user = users.update_profile(id, &update).await.unwrap().unwrap();
        assert_eq!(user.name, "Rahim");
        assert_eq!(user.city, "Sylhet");
        assert_eq!(user.phone, "+8801900000000");
        assert_eq!(users.find(id).await.unwrap(), Some(user));
        assert_eq!(users.update_profile(Uuid::new_v4(), &update).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cart_take_is_once() {
        let carts = MemoryCartStore::new();
        let (user, product) = (Uuid::new_v4(), Uuid::new_v4());
        carts.put_product(product, "Hoodie", 1800).await;
        assert!(carts.add(user, Uuid::new_v4(), "M", 1).await.unwrap().is_none());
        carts.add(user, product, "L", 2).await.unwrap().unwrap();

        let taken = carts.take(user).await.unwrap();
        assert_eq!(taken.subtotal(), 3600);
        assert!(carts.take(user).await.unwrap().is_empty());

        carts.add(user, product, "L", 1).await.unwrap();
        carts.restore(&taken).await.unwrap();
        let cart = carts.load(user).await.unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_cart_quantity_overflow_is_rejected() {
        let carts = MemoryCartStore::new();
        let (user, product) = (Uuid::new_v4(), Uuid::new_v4());
        carts.put_product(product, "Cap", 100).await;
        carts.add(user, product, "Free", i32::MAX).await.unwrap();
        assert!(matches!(carts.add(user, product, "Free", 1).await, Err(StoreError::Rejected(_))));
        assert_eq!(carts.load(user).await.unwrap().items()[0].quantity, i32::MAX);
    }
}
