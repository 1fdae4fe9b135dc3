//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::OrderEvent;
use crate::domain::value_objects::ContactPhone;

/// Longest cancellation reason accepted from a customer.
pub const MAX_REASON_LEN: usize = 500;

#[derive(Clone, Debug)]
pub struct Order {
    pub(crate) id: Uuid,
    pub(crate) owner: Owner,
    pub(crate) items: Vec<LineItem>,
    pub(crate) shipping: ShippingInfo,
    pub(crate) total: i64,
    pub(crate) status: OrderStatus,
    pub(crate) cancel_request: Option<CancelRequest>,
    pub(crate) version: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) events: Vec<OrderEvent>,
}

/// Who placed the order. A guest order has no user reference, only the
/// phone it was placed with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Owner {
    Registered { user_id: Uuid },
    Guest { phone: ContactPhone },
}

/// Product, price and size as they were when the order was placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub size: String,
}

impl LineItem {
    /// `None` when the line does not fit in an `i64`.
    pub fn line_total(&self) -> Option<i64> { self.unit_price.checked_mul(i64::from(self.quantity)) }
}

/// Sum of the line totals, `None` on overflow.
pub(crate) fn checked_total(lines: impl IntoIterator<Item = Option<i64>>) -> Option<i64> {
    lines.into_iter().try_fold(0i64, |acc, line| acc.checked_add(line?))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub note: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    OutForDelivery,
    Delivered,
    Returned,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::Pending, Self::Confirmed, Self::Shipped, Self::OutForDelivery,
        Self::Delivered, Self::Returned, Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out-for-delivery",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
        }
    }

    /// States in which the customer may still ask for a cancellation.
    pub fn is_cancellable(&self) -> bool { matches!(self, Self::Pending | Self::Confirmed) }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelRequestStatus { #[default] Pending, Approved, Declined }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub requested: bool,
    pub reason: String,
    pub status: CancelRequestStatus,
    pub requested_at: DateTime<Utc>,
}

impl CancelRequest {
    pub fn is_pending(&self) -> bool { self.requested && self.status == CancelRequestStatus::Pending }
}

/// Which status changes an admin or moderator may apply directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may follow any status.
    #[default]
    Open,
    /// Orders move forward along the fulfilment graph; cancelled and
    /// returned are final.
    Strict,
}

impl TransitionPolicy {
    pub fn permits(&self, from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;
        if from == to { return true; }
        match self {
            Self::Open => true,
            Self::Strict => matches!(
                (from, to),
                (Pending, Confirmed) | (Pending, Cancelled)
                    | (Confirmed, Shipped) | (Confirmed, Cancelled)
                    | (Shipped, OutForDelivery) | (Shipped, Returned)
                    | (OutForDelivery, Delivered) | (OutForDelivery, Returned)
                    | (Delivered, Returned)
            ),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown transition policy '{other}' (expected open or strict)")),
        }
    }
}

impl Order {
    /// Places a new pending order. Line items are validated and the total is
    /// fixed here; nothing re-reads the catalog afterwards.
    pub fn place(owner: Owner, items: Vec<LineItem>, shipping: ShippingInfo) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::EmptyItems); }
        for item in &items {
            if item.quantity < 1 {
                return Err(OrderError::InvalidQuantity { product_id: item.product_id, quantity: item.quantity });
            }
            if item.unit_price < 0 { return Err(OrderError::NegativePrice { product_id: item.product_id }); }
        }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let total = checked_total(items.iter().map(LineItem::line_total)).ok_or(OrderError::TotalOverflow)?;
        let mut order = Self {
            id, owner, items, shipping, total, status: OrderStatus::Pending, cancel_request: None,
            version: 0, created_at: now, updated_at: now, events: vec![],
        };
        let created = OrderEvent::Created { order_id: id, user_id: order.user_id(), is_guest: order.is_guest(), total };
        order.raise_event(created);
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn owner(&self) -> &Owner { &self.owner }
    pub fn is_guest(&self) -> bool { matches!(self.owner, Owner::Guest { .. }) }
    pub fn user_id(&self) -> Option<Uuid> {
        match &self.owner { Owner::Registered { user_id } => Some(*user_id), Owner::Guest { .. } => None }
    }
    pub fn guest_phone(&self) -> Option<&ContactPhone> {
        match &self.owner { Owner::Guest { phone } => Some(phone), Owner::Registered { .. } => None }
    }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn shipping(&self) -> &ShippingInfo { &self.shipping }
    pub fn total(&self) -> i64 { self.total }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn cancel_request(&self) -> Option<&CancelRequest> { self.cancel_request.as_ref() }
    pub fn version(&self) -> i64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Staff status change. Whether `next` may follow the current status is
    /// up to `policy`.
    pub fn set_status(&mut self, next: OrderStatus, policy: TransitionPolicy) -> Result<(), OrderError> {
        let from = self.status;
        if !policy.permits(from, next) { return Err(OrderError::TransitionNotAllowed { from, to: next }); }
        self.status = next;
        self.touch();
        self.raise_event(OrderEvent::StatusChanged { order_id: self.id, from, to: next });
        Ok(())
    }

    pub fn request_cancellation(&mut self, reason: &str) -> Result<(), OrderError> {
        let reason = reason.trim();
        if reason.chars().count() > MAX_REASON_LEN { return Err(OrderError::ReasonTooLong(MAX_REASON_LEN)); }
        if !self.status.is_cancellable() { return Err(OrderError::NotCancellable(self.status)); }
        if self.cancel_request.as_ref().is_some_and(CancelRequest::is_pending) {
            return Err(OrderError::CancelAlreadyPending);
        }
        self.cancel_request = Some(CancelRequest {
            requested: true,
            reason: reason.to_string(),
            status: CancelRequestStatus::Pending,
            requested_at: Utc::now(),
        });
        self.touch();
        self.raise_event(OrderEvent::CancelRequested { order_id: self.id, reason: reason.to_string() });
        Ok(())
    }

    /// Approving cancels the order in the same change as the request.
    pub fn approve_cancellation(&mut self) -> Result<(), OrderError> {
        if !self.cancel_request.as_ref().is_some_and(CancelRequest::is_pending) {
            return Err(OrderError::NoPendingCancelRequest);
        }
        if !self.status.is_cancellable() { return Err(OrderError::NotCancellable(self.status)); }
        self.pending_cancel_request()?.status = CancelRequestStatus::Approved;
        let from = self.status;
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(OrderEvent::CancelApproved { order_id: self.id, previous_status: from });
        Ok(())
    }

    pub fn decline_cancellation(&mut self) -> Result<(), OrderError> {
        self.pending_cancel_request()?.status = CancelRequestStatus::Declined;
        self.touch();
        self.raise_event(OrderEvent::CancelDeclined { order_id: self.id });
        Ok(())
    }

    fn pending_cancel_request(&mut self) -> Result<&mut CancelRequest, OrderError> {
        self.cancel_request.as_mut().filter(|r| r.is_pending()).ok_or(OrderError::NoPendingCancelRequest)
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    EmptyItems,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: Uuid, quantity: i32 },

    #[error("Negative price for product {product_id}")]
    NegativePrice { product_id: Uuid },

    #[error("Order total is too large")]
    TotalOverflow,

    #[error("{0}")]
    InvalidPhone(String),

    #[error("Cancellation reason longer than {0} characters")]
    ReasonTooLong(usize),

    #[error("Order cannot be cancelled while {0}")]
    NotCancellable(OrderStatus),

    #[error("A cancel request is already pending")]
    CancelAlreadyPending,

    #[error("Cancel request not found")]
    NoPendingCancelRequest,

    #[error("Status change from {from} to {to} is not allowed")]
    TransitionNotAllowed { from: OrderStatus, to: OrderStatus },
}
