//! Publishes order events to NATS when a connection is configured.

use crate::domain::events::OrderEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// A publisher that drops every event.
    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub fn subject(event: &OrderEvent) -> String { format!("orders.{}", event.name()) }

    /// Delivery is best effort: failures are logged and never reach the caller.
    pub async fn publish(&self, events: Vec<OrderEvent>) {
        let Some(client) = &self.nats else {
            return;
        };
        for event in events {
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(order_id = %event.order_id(), "failed to encode order event: {}", e);
                    continue;
                }
            };
            if let Err(e) = client.publish(Self::subject(&event), payload.into()).await {
                tracing::warn!(order_id = %event.order_id(), event = event.name(), "failed to publish order event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_subjects() {
        let id = Uuid::new_v4();
        assert_eq!(EventPublisher::subject(&OrderEvent::Deleted { order_id: id }), "orders.deleted");
        assert_eq!(EventPublisher::subject(&OrderEvent::CancelDeclined { order_id: id }), "orders.cancel_declined");
    }

    #[tokio::test]
    async fn test_disabled_publisher_drops_events() {
        let publisher = EventPublisher::disabled();
        assert!(!publisher.is_enabled());
        publisher.publish(vec![OrderEvent::Deleted { order_id: Uuid::new_v4() }]).await;
    }

    #[test]
    fn test_event_payload_shape() {
        let id = Uuid::nil();
        let json = serde_json::to_value(OrderEvent::CancelRequested { order_id: id, reason: "wrong size".into() }).unwrap();
        assert_eq!(json["type"], "cancel_requested");
        assert_eq!(json["reason"], "wrong size");
    }
}
