//! Order workflow: placement with stock reservation, status changes and
//! cancellation with stock restoration.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::config::WorkflowMode;
use crate::domain::aggregates::{Order, OrderItem, OrderStatus};
use crate::domain::events::{DomainEvent, EventPublisher};
use crate::domain::value_objects::{Address, OrderId, ProductId, Quantity, UserId};
use crate::services::KeyedLocks;
use crate::store::{StockChange, Store};
use crate::{CatalogError, Result};

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub items: Vec<OrderLine>,
    pub shipping_address: Address,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct OrderWorkflow {
    store: Arc<dyn Store>,
    events: EventPublisher,
    mode: WorkflowMode,
    locks: Arc<KeyedLocks<OrderId>>,
}

impl OrderWorkflow {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, mode: WorkflowMode) -> Self {
        Self { store, events, mode, locks: Arc::new(KeyedLocks::new()) }
    }

    /// Place an order.
    ///
    /// Every line reserves stock through the store's conditional decrement, so
    /// concurrent orders can never drive a product below zero. If any line
    /// fails, or the order itself cannot be persisted, the lines already
    /// reserved are released again before the error is returned.
    #[instrument(skip(self, request), fields(user = %user_id, lines = request.items.len()))]
    pub async fn create(&self, user_id: UserId, request: OrderRequest) -> Result<Order> {
        let lines = validate_request(&request)?;

        let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
        for (product_id, quantity) in lines {
            match self.reserve(product_id, quantity).await {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.release(&items).await;
                    return Err(e);
                }
            }
        }

        let order = match Order::place(user_id, items.clone(), request.shipping_address, request.payment_method, request.notes) {
            Ok(order) => order,
            Err(e) => {
                self.release(&items).await;
                return Err(e.into());
            }
        };
        if let Err(e) = self.store.insert_order(&order).await {
            warn!(error = %e, "order not persisted; releasing reserved stock");
            self.release(&order.items).await;
            return Err(e.into());
        }

        info!(order = %order.id, total = %order.total_amount, "order placed");
        self.events
            .publish(DomainEvent::OrderPlaced { order_id: order.id, user_id, total_amount: order.total_amount })
            .await;
        Ok(order)
    }

    /// Cancel an order and put its items back on the shelf.
    ///
    /// Strict mode rejects orders that are already delivered or cancelled.
    /// Lenient mode does not, so cancelling twice restores stock twice.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId) -> Result<Order> {
        self.cancel_with_tracking(id, None).await
    }

    async fn cancel_with_tracking(&self, id: OrderId, tracking_number: Option<String>) -> Result<Order> {
        let _guard = self.locks.lock(id).await;
        let mut order = self.load(id).await?;
        let from = order.status;
        if self.mode == WorkflowMode::Strict && !from.can_transition_to(OrderStatus::Cancelled) {
            return Err(CatalogError::InvalidTransition { from, to: OrderStatus::Cancelled });
        }

        let restored = self.restore(&order.items).await?;
        order.set_status(OrderStatus::Cancelled);
        if let Some(tracking) = tracking_number.filter(|t| !t.trim().is_empty()) {
            order.set_tracking_number(tracking);
        }
        self.persist(&order).await?;

        info!(order = %id, %from, restored, "order cancelled");
        self.events.publish(DomainEvent::OrderCancelled { order_id: id, restored_items: restored }).await;
        Ok(order)
    }

    /// Move an order to `status`, optionally recording a tracking number.
    ///
    /// In strict mode the move must follow the status graph and a move to
    /// CANCELLED goes through [`cancel`](Self::cancel), so stock is restored.
    /// In lenient mode the status is overwritten as given.
    #[instrument(skip(self, tracking_number))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus, tracking_number: Option<String>) -> Result<Order> {
        if self.mode == WorkflowMode::Strict && status == OrderStatus::Cancelled {
            return self.cancel_with_tracking(id, tracking_number).await;
        }

        let _guard = self.locks.lock(id).await;
        let mut order = self.load(id).await?;
        let from = order.status;
        if self.mode == WorkflowMode::Strict && !from.can_transition_to(status) {
            return Err(CatalogError::InvalidTransition { from, to: status });
        }

        order.set_status(status);
        if let Some(tracking) = tracking_number.filter(|t| !t.trim().is_empty()) {
            order.set_tracking_number(tracking);
        }
        self.persist(&order).await?;

        info!(order = %id, %from, to = %status, "order status changed");
        self.events.publish(DomainEvent::OrderStatusChanged { order_id: id, from, to: status }).await;
        Ok(order)
    }

    pub async fn order(&self, id: OrderId) -> Result<Order> {
        self.load(id).await
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.orders().await?)
    }

    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }

    async fn load(&self, id: OrderId) -> Result<Order> {
        self.store.order(id).await?.ok_or_else(|| CatalogError::not_found("order", id))
    }

    async fn persist(&self, order: &Order) -> Result<()> {
        if self.store.save_order(order).await? {
            Ok(())
        } else {
            Err(CatalogError::not_found("order", order.id))
        }
    }

    /// Reserve one line: snapshot the effective price, then take the stock.
    async fn reserve(&self, product_id: ProductId, quantity: Quantity) -> Result<OrderItem> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("product", product_id))?;
        let requested = quantity.value();
        let insufficient = |available| CatalogError::InsufficientStock { product: product.name.clone(), requested, available };
        if product.stock < requested {
            return Err(insufficient(product.stock));
        }

        match self.store.adjust_stock(product_id, -i64::from(requested)).await? {
            StockChange::Applied(after) => {
                debug!(product = %product_id, requested, remaining = after.stock, "stock reserved");
                Ok(OrderItem { product_id, quantity, price: product.effective_price() })
            }
            StockChange::Insufficient { available } => Err(insufficient(available)),
            StockChange::Missing => Err(CatalogError::not_found("product", product_id)),
        }
    }

    /// Compensation for a failed placement. Failures are logged; the original
    /// error is what the caller sees.
    async fn release(&self, items: &[OrderItem]) {
        for item in items {
            match self.store.adjust_stock(item.product_id, i64::from(item.quantity.value())).await {
                Ok(StockChange::Applied(_)) => {}
                Ok(other) => warn!(product = %item.product_id, ?other, "could not release reserved stock"),
                Err(e) => warn!(product = %item.product_id, error = %e, "could not release reserved stock"),
            }
        }
    }

    /// Returns how many lines were restored. Products deleted since the order
    /// was placed are skipped.
    async fn restore(&self, items: &[OrderItem]) -> Result<usize> {
        let mut restored = 0;
        for item in items {
            match self.store.adjust_stock(item.product_id, i64::from(item.quantity.value())).await? {
                StockChange::Applied(_) => restored += 1,
                StockChange::Missing => debug!(product = %item.product_id, "product gone; nothing to restore"),
                StockChange::Insufficient { .. } => {}
            }
        }
        Ok(restored)
    }
}

/// Checks everything that does not need the store, before any stock moves.
fn validate_request(request: &OrderRequest) -> Result<Vec<(ProductId, Quantity)>> {
    if request.items.is_empty() {
        return Err(CatalogError::validation("an order needs at least one item"));
    }
    request.shipping_address.validate()?;
    if request.payment_method.trim().is_empty() {
        return Err(CatalogError::validation("payment method is required"));
    }
    request
        .items
        .iter()
        .map(|line| -> Result<(ProductId, Quantity)> { Ok((line.product_id, Quantity::new(line.quantity)?)) })
        .collect()
}
