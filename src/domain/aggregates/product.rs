//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{CategoryId, Price, ProductId, Rating, Sku, Specifications};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub discount_price: Option<Price>,
    pub category_id: CategoryId,
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: u32,
    pub sku: Sku,
    #[serde(default)]
    pub tags: Vec<String>,
    pub specifications: Option<Specifications>,
    #[serde(default)]
    pub rating: Rating,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new product.
#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub discount_price: Option<Price>,
    pub category_id: CategoryId,
    pub brand: Option<String>,
    pub images: Vec<String>,
    pub stock: u32,
    pub sku: Sku,
    pub tags: Vec<String>,
    pub specifications: Option<Specifications>,
}

/// Partial product update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub discount_price: Option<Price>,
    pub category_id: Option<CategoryId>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub specifications: Option<Specifications>,
    pub is_active: Option<bool>,
}

impl Product {
    pub fn create(input: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            name: input.name,
            description: input.description,
            price: input.price,
            discount_price: input.discount_price,
            category_id: input.category_id,
            brand: input.brand,
            images: input.images,
            stock: input.stock,
            sku: input.sku,
            tags: input.tags,
            specifications: input.specifications,
            rating: Rating::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Price snapshotted into order lines. A zero discount counts as no discount.
    pub fn effective_price(&self) -> Price {
        match self.discount_price {
            Some(discount) if !discount.is_zero() => discount,
            _ => self.price,
        }
    }

    pub fn is_in_stock(&self) -> bool { self.stock > 0 }

    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(v) = patch.name { self.name = v; }
        if let Some(v) = patch.description { self.description = v; }
        if let Some(v) = patch.price { self.price = v; }
        if let Some(v) = patch.discount_price { self.discount_price = Some(v); }
        if let Some(v) = patch.category_id { self.category_id = v; }
        if let Some(v) = patch.brand { self.brand = Some(v); }
        if let Some(v) = patch.images { self.images = v; }
        if let Some(v) = patch.stock { self.stock = v; }
        if let Some(v) = patch.tags { self.tags = v; }
        if let Some(v) = patch.specifications { self.specifications = Some(v); }
        if let Some(v) = patch.is_active { self.is_active = v; }
        self.touch();
    }

    /// Case-insensitive substring match on name, description or any tag.
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample(stock: u32) -> Product {
        Product::create(NewProduct {
            name: "Trail Shoe".into(),
            description: "Lightweight running shoe".into(),
            price: Price::new(Decimal::new(12000, 2)).unwrap(),
            discount_price: None,
            category_id: CategoryId::new(),
            brand: Some("Stride".into()),
            images: vec![],
            stock,
            sku: Sku::new("shoe-001").unwrap(),
            tags: vec!["Running".into(), "outdoor".into()],
            specifications: None,
        })
    }

    #[test]
    fn test_product_create() {
        let p = sample(4);
        assert!(p.is_active);
        assert_eq!(p.rating, Rating::default());
        assert_eq!(p.sku.as_str(), "SHOE-001");
    }

    #[test]
    fn test_effective_price() {
        let mut p = sample(1);
        assert_eq!(p.effective_price(), p.price);
        p.discount_price = Some(Price::new(Decimal::new(9900, 2)).unwrap());
        assert_eq!(p.effective_price().amount(), Decimal::new(9900, 2));
        p.discount_price = Some(Price::ZERO);
        assert_eq!(p.effective_price(), p.price);
    }

    #[test]
    fn test_patch_leaves_absent_fields() {
        let mut p = sample(5);
        p.apply(ProductPatch { name: Some("Road Shoe".into()), ..Default::default() });
        assert_eq!(p.name, "Road Shoe");
        assert_eq!(p.stock, 5);
        assert_eq!(p.brand.as_deref(), Some("Stride"));
    }

    #[test]
    fn test_text_match() {
        let p = sample(1);
        assert!(p.matches_text("trail"));
        assert!(p.matches_text("RUNNING"));
        assert!(p.matches_text("OUTDOOR"));
        assert!(!p.matches_text("sandal"));
    }
}
