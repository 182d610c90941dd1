//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::{Address, OrderId, Price, ProductId, Quantity, UserId, ValueError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: Address,
    pub payment_method: String,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order line. `price` is the unit price at the time the order was placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Price,
}

impl OrderItem {
    pub fn line_total(&self) -> Option<Decimal> { self.price.times(self.quantity) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl OrderStatus {
    /// Statuses reachable in one step.
    pub fn successors(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool { self.successors().contains(&next) }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl Order {
    /// New PENDING order; the total is summed once here and never recomputed.
    /// Fails when the total does not fit the range a price can take.
    pub fn place(
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: Address,
        payment_method: impl Into<String>,
        notes: Option<String>,
    ) -> Result<Self, ValueError> {
        let now = Utc::now();
        let total_amount = items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_total()?))
            .filter(|total| *total <= Price::MAX)
            .ok_or(ValueError::TotalOutOfRange { max: Price::MAX })?;
        Ok(Self {
            id: OrderId::new(), user_id, items, total_amount,
            status: OrderStatus::Pending, payment_status: PaymentStatus::Pending,
            shipping_address, payment_method: payment_method.into(), tracking_number: None,
            notes, created_at: now, updated_at: now,
        })
    }

    pub fn set_status(&mut self, status: OrderStatus) { self.status = status; self.touch(); }

    pub fn set_tracking_number(&mut self, tracking: String) { self.tracking_number = Some(tracking); self.touch(); }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
