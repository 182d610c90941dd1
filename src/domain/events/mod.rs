//! Domain events
//!
//! Workflows emit these after a change is persisted. When a NATS client is
//! configured they are published as JSON on `catalog.<name>`; otherwise they
//! are only traced.

use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::{OrderId, ProductId, Rating, ReviewId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    #[serde(rename_all = "camelCase")]
    OrderPlaced { order_id: OrderId, user_id: UserId, total_amount: Decimal },
    #[serde(rename_all = "camelCase")]
    OrderStatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus },
    #[serde(rename_all = "camelCase")]
    OrderCancelled { order_id: OrderId, restored_items: usize },
    #[serde(rename_all = "camelCase")]
    ReviewPosted { review_id: ReviewId, product_id: ProductId },
    #[serde(rename_all = "camelCase")]
    ReviewRemoved { review_id: ReviewId, product_id: ProductId },
    #[serde(rename_all = "camelCase")]
    ProductRatingChanged { product_id: ProductId, rating: Rating },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order_placed",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::ReviewPosted { .. } => "review_posted",
            Self::ReviewRemoved { .. } => "review_removed",
            Self::ProductRatingChanged { .. } => "product_rating_changed",
        }
    }

    pub fn subject(&self) -> String { format!("catalog.{}", self.name()) }
}

/// Fire-and-forget event sink. Publishing failures are logged, never returned:
/// the change the event describes is already committed.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn publish(&self, event: DomainEvent) {
        tracing::debug!(event = event.name(), "domain event");
        let Some(client) = &self.nats else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(event = event.name(), error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject(), payload.into()).await {
            tracing::warn!(event = event.name(), error = %e, "failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = DomainEvent::OrderCancelled { order_id: OrderId::new(), restored_items: 2 };
        assert_eq!(event.subject(), "catalog.order_cancelled");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "orderCancelled");
        assert_eq!(json["restoredItems"], 2);
    }
}
