//! Value Objects for the catalog

use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("SKU must not be empty")]
    EmptySku,
    #[error("SKU must be at most {max} characters")]
    SkuTooLong { max: usize },
    #[error("price must not be negative")]
    NegativePrice,
    #[error("price must be at most {max} with at most {scale} decimal places")]
    PriceOutOfRange { max: Decimal, scale: u32 },
    #[error("order total exceeds {max}")]
    TotalOutOfRange { max: Decimal },
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
    #[error("invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Time-ordered (UUIDv7) identifier.
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn as_uuid(&self) -> &Uuid { &self.0 }
        }

        impl Default for $name {
            fn default() -> Self { Self::new() }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&self.0, f) }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self { Self(value) }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self { value.0 }
        }

        impl FromStr for $name {
            type Err = ValueError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s)
                    .map(Self)
                    .map_err(|_| ValueError::InvalidId { kind: $kind, value: s.to_string() })
            }
        }
    };
}

uuid_id!(UserId, "user");
uuid_id!(CategoryId, "category");
uuid_id!(ProductId, "product");
uuid_id!(OrderId, "order");
uuid_id!(ReviewId, "review");

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(ValueError::EmptySku); }
        if value.len() > Self::MAX_LEN { return Err(ValueError::SkuTooLong { max: Self::MAX_LEN }); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Sku {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self { value.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Non-negative monetary amount in the store currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);
    pub const SCALE: u32 = 2;
    /// 999999999999.99, the largest value a `NUMERIC(14, 2)` column holds.
    pub const MAX: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

    pub fn new(amount: Decimal) -> Result<Self, ValueError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(ValueError::NegativePrice); }
        if amount > Self::MAX || amount.normalize().scale() > Self::SCALE {
            return Err(ValueError::PriceOutOfRange { max: Self::MAX, scale: Self::SCALE });
        }
        Ok(Self(amount))
    }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    /// `None` on overflow.
    pub fn times(&self, qty: Quantity) -> Option<Decimal> { self.0.checked_mul(Decimal::from(qty.value())) }
}

impl TryFrom<Decimal> for Price {
    type Error = ValueError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self { value.0 }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Order line quantity, always at least one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self, ValueError> {
        if value == 0 { return Err(ValueError::ZeroQuantity); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
}

impl TryFrom<u32> for Quantity {
    type Error = ValueError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self { value.0 }
}

/// Star rating attached to a review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Stars(u8);

impl Stars {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, ValueError> {
        if !(i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            return Err(ValueError::RatingOutOfRange(value));
        }
        Ok(Self(value as u8))
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<i64> for Stars {
    type Error = ValueError;
    fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Stars> for u8 {
    fn from(value: Stars) -> Self { value.0 }
}

/// Aggregate rating of a product, derived from its reviews.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub average: f64,
    pub count: u32,
}

impl Rating {
    /// Arithmetic mean over every score; an empty set yields `{0, 0}`.
    pub fn from_scores(scores: impl IntoIterator<Item = Stars>) -> Self {
        let (sum, count) = scores
            .into_iter()
            .fold((0u64, 0u32), |(sum, count), s| (sum + u64::from(s.value()), count + 1));
        if count == 0 { return Self::default(); }
        Self { average: sum as f64 / f64::from(count), count }
    }
}

/// Postal address, embedded in orders and user profiles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "zip code is required"))]
    pub zip_code: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
}

/// Free-form physical attributes of a product.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifications {
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
}
