//! Domain events
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: Option<Uuid>, is_guest: bool, total: i64 },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    CancelRequested { order_id: Uuid, reason: String },
    CancelApproved { order_id: Uuid, previous_status: OrderStatus },
    CancelDeclined { order_id: Uuid },
    Deleted { order_id: Uuid },
}

impl OrderEvent {
    /// Subject suffix the event is published under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::StatusChanged { .. } => "status_changed",
            Self::CancelRequested { .. } => "cancel_requested",
            Self::CancelApproved { .. } => "cancel_approved",
            Self::CancelDeclined { .. } => "cancel_declined",
            Self::Deleted { .. } => "deleted",
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            Self::Created { order_id, .. }
            | Self::StatusChanged { order_id, .. }
            | Self::CancelRequested { order_id, .. }
            | Self::CancelApproved { order_id, .. }
            | Self::CancelDeclined { order_id }
            | Self::Deleted { order_id } => *order_id,
        }
    }
}
