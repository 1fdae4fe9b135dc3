//! Order lifecycle engine.
//!
//! Every operation authorizes the caller through the access policy, loads the
//! order, applies the change on the aggregate and writes it back in a single
//! version-checked update. Events raised by the aggregate are published once
//! the write has succeeded.

use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::aggregates::{LineItem, Order, OrderError, OrderStatus, Owner, ShippingInfo, TransitionPolicy};
use crate::domain::events::OrderEvent;
use crate::domain::policy::{authorize, Action, Identity, Resource};
use crate::domain::value_objects::ContactPhone;
use crate::publisher::EventPublisher;
use crate::store::{DynOrderStore, Page};
use crate::{EcommerceError, Result};

/// Order counts per status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub shipped: i64,
    pub out_for_delivery: i64,
    pub delivered: i64,
    pub returned: i64,
    pub cancelled: i64,
}

#[derive(Clone)]
pub struct OrderLifecycle {
    store: DynOrderStore,
    transitions: TransitionPolicy,
    publisher: EventPublisher,
}

fn resource_of(order: &Order) -> Resource {
    match order.user_id() {
        Some(user_id) => Resource::OwnedBy(user_id),
        None => Resource::Guest,
    }
}

fn not_found() -> EcommerceError { EcommerceError::NotFound("Order not found".to_string()) }

impl OrderLifecycle {
    pub fn new(store: DynOrderStore, transitions: TransitionPolicy, publisher: EventPublisher) -> Self {
        Self { store, transitions, publisher }
    }

    pub fn transitions(&self) -> TransitionPolicy { self.transitions }

    #[instrument(skip_all, fields(user_id = ?identity.map(|i| i.user_id), items = items.len()))]
    pub async fn create_order(&self, identity: Option<&Identity>, items: Vec<LineItem>, shipping: ShippingInfo) -> Result<Order> {
        authorize(identity, Action::CreateOrder, Resource::Unowned)?;
        let identity = identity.ok_or(EcommerceError::Unauthorized)?;
        let order = Order::place(Owner::Registered { user_id: identity.user_id }, items, shipping)?;
        self.insert(order).await
    }

    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn create_guest_order(&self, phone: &str, items: Vec<LineItem>, shipping: ShippingInfo) -> Result<Order> {
        authorize(None, Action::CreateGuestOrder, Resource::Guest)?;
        let phone = ContactPhone::new(phone).map_err(|e| OrderError::InvalidPhone(e.to_string()))?;
        let order = Order::place(Owner::Guest { phone }, items, shipping)?;
        self.insert(order).await
    }

    pub async fn own_orders(&self, identity: Option<&Identity>) -> Result<Vec<Order>> {
        authorize(identity, Action::ViewOwnOrders, Resource::Unowned)?;
        let identity = identity.ok_or(EcommerceError::Unauthorized)?;
        Ok(self.store.find_by_owner(identity.user_id).await?)
    }

    /// Guest orders by phone. Knowing the phone number is the only check.
    pub async fn guest_orders(&self, phone: &str) -> Result<Vec<Order>> {
        authorize(None, Action::ViewGuestOrders, Resource::Guest)?;
        let phone = ContactPhone::new(phone).map_err(|e| OrderError::InvalidPhone(e.to_string()))?;
        Ok(self.store.find_guest_by_phone(&phone).await?)
    }

    pub async fn order_by_id(&self, identity: Option<&Identity>, id: Uuid) -> Result<Order> {
        if identity.is_none() {
            return Err(EcommerceError::Unauthorized);
        }
        let order = self.load(id).await?;
        authorize(identity, Action::ViewOrder, resource_of(&order))?;
        Ok(order)
    }

    /// Invoice of a guest order; registered orders are reported as missing.
    pub async fn guest_invoice(&self, id: Uuid) -> Result<Order> {
        authorize(None, Action::ViewGuestInvoice, Resource::Guest)?;
        match self.store.find(id).await? {
            Some(order) if order.is_guest() => Ok(order),
            _ => Err(EcommerceError::NotFound("Invoice not found".to_string())),
        }
    }

    pub async fn list_orders(&self, identity: Option<&Identity>, page: Page) -> Result<(Vec<Order>, i64)> {
        authorize(identity, Action::ListOrders, Resource::Unowned)?;
        let orders = self.store.list(page).await?;
        let total = self.store.count_all().await?;
        Ok((orders, total))
    }

    pub async fn orders_by_user(&self, identity: Option<&Identity>, user_id: Uuid) -> Result<Vec<Order>> {
        authorize(identity, Action::ViewUserOrders, Resource::Unowned)?;
        Ok(self.store.find_by_owner(user_id).await?)
    }

    /// Number of orders placed by `user_id`. Callers authorize.
    pub async fn order_count_for(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.store.count_by_owner(user_id).await?)
    }

    #[instrument(skip(self, identity), fields(user_id = ?identity.map(|i| i.user_id)))]
    pub async fn update_status(&self, identity: Option<&Identity>, id: Uuid, status: OrderStatus) -> Result<Order> {
        authorize(identity, Action::UpdateOrderStatus, Resource::Unowned)?;
        let mut order = self.load(id).await?;
        order.set_status(status, self.transitions)?;
        self.save(order).await
    }

    #[instrument(skip(self, identity), fields(user_id = ?identity.map(|i| i.user_id)))]
    pub async fn delete_order(&self, identity: Option<&Identity>, id: Uuid) -> Result<()> {
        authorize(identity, Action::DeleteOrder, Resource::Unowned)?;
        if !self.store.delete(id).await? {
            return Err(not_found());
        }
        tracing::info!(order_id = %id, "order deleted");
        self.publisher.publish(vec![OrderEvent::Deleted { order_id: id }]).await;
        Ok(())
    }

    #[instrument(skip(self, identity, reason), fields(user_id = ?identity.map(|i| i.user_id)))]
    pub async fn request_cancellation(&self, identity: Option<&Identity>, id: Uuid, reason: &str) -> Result<Order> {
        if identity.is_none() {
            return Err(EcommerceError::Unauthorized);
        }
        let mut order = self.load(id).await?;
        authorize(identity, Action::RequestCancellation, resource_of(&order))?;
        order.request_cancellation(reason)?;
        self.save(order).await
    }

    #[instrument(skip(self, identity), fields(user_id = ?identity.map(|i| i.user_id)))]
    pub async fn approve_cancel_request(&self, identity: Option<&Identity>, id: Uuid) -> Result<Order> {
        authorize(identity, Action::ApproveCancellation, Resource::Unowned)?;
        let mut order = self.load_with_request(id).await?;
        order.approve_cancellation()?;
        self.save(order).await
    }

    #[instrument(skip(self, identity), fields(user_id = ?identity.map(|i| i.user_id)))]
    pub async fn decline_cancel_request(&self, identity: Option<&Identity>, id: Uuid) -> Result<Order> {
        authorize(identity, Action::DeclineCancellation, Resource::Unowned)?;
        let mut order = self.load_with_request(id).await?;
        order.decline_cancellation()?;
        self.save(order).await
    }

    pub async fn pending_count(&self, identity: Option<&Identity>) -> Result<i64> {
        authorize(identity, Action::ViewPendingCount, Resource::Unowned)?;
        let counts = self.store.count_by_status().await?;
        Ok(counts.get(&OrderStatus::Pending).copied().unwrap_or(0))
    }

    pub async fn stats(&self, identity: Option<&Identity>) -> Result<OrderStats> {
        authorize(identity, Action::ViewOrderStats, Resource::Unowned)?;
        let counts = self.store.count_by_status().await?;
        let mut stats = OrderStats::default();
        for status in OrderStatus::ALL {
            let count = counts.get(&status).copied().unwrap_or(0);
            stats.total += count;
            *match status {
                OrderStatus::Pending => &mut stats.pending,
                OrderStatus::Confirmed => &mut stats.confirmed,
                OrderStatus::Shipped => &mut stats.shipped,
                OrderStatus::OutForDelivery => &mut stats.out_for_delivery,
                OrderStatus::Delivered => &mut stats.delivered,
                OrderStatus::Returned => &mut stats.returned,
                OrderStatus::Cancelled => &mut stats.cancelled,
            } = count;
        }
        Ok(stats)
    }

    async fn load(&self, id: Uuid) -> Result<Order> {
        self.store.find(id).await?.ok_or_else(not_found)
    }

    /// Missing orders and orders without a request read the same to staff.
    async fn load_with_request(&self, id: Uuid) -> Result<Order> {
        self.store.find(id).await?.ok_or_else(|| OrderError::NoPendingCancelRequest.into())
    }

    async fn insert(&self, mut order: Order) -> Result<Order> {
        let events = order.take_events();
        let saved = self.store.insert(&order).await?;
        tracing::info!(order_id = %saved.id(), guest = saved.is_guest(), total = saved.total(), "order placed");
        self.publisher.publish(events).await;
        Ok(saved)
    }

    async fn save(&self, mut order: Order) -> Result<Order> {
        let events = order.take_events();
        let saved = match self.store.update(&order).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(order_id = %order.id(), "order update failed: {}", e);
                return Err(e.into());
            }
        };
        tracing::info!(order_id = %saved.id(), status = %saved.status(), version = saved.version(), "order updated");
        self.publisher.publish(events).await;
        Ok(saved)
    }
}
