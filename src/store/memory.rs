use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::aggregates::{Category, CategoryPatch, Order, Product, ProductPatch, Review, ReviewPatch, User};
use crate::domain::value_objects::{CategoryId, OrderId, ProductId, Rating, ReviewId, Sku, UserId};

use super::{ProductQuery, StockChange, Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Collections {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    reviews: BTreeMap<ReviewId, Review>,
}

/// In-memory store for tests/dev.
///
/// Ids are UUIDv7, so map order is creation order. Every method runs under a
/// single lock, which makes each call atomic with respect to the others.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner.read().map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.inner.write().map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut c = self.write()?;
        if c.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate { field: "username" });
        }
        if c.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate { field: "email" });
        }
        c.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut c = self.write()?;
        if c.categories.values().any(|x| x.name == category.name) {
            return Err(StoreError::Duplicate { field: "name" });
        }
        c.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, id: CategoryId, patch: &CategoryPatch) -> StoreResult<Option<Category>> {
        let mut c = self.write()?;
        if let Some(name) = &patch.name {
            if c.categories.values().any(|x| x.id != id && &x.name == name) {
                return Err(StoreError::Duplicate { field: "name" });
            }
        }
        Ok(c.categories.get_mut(&id).map(|category| {
            category.apply(patch.clone());
            category.clone()
        }))
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        Ok(self.write()?.categories.remove(&id).is_some())
    }

    async fn category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn child_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<Category>> {
        Ok(self.read()?.categories.values().filter(|c| c.parent_id == parent).cloned().collect())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut c = self.write()?;
        if c.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::Duplicate { field: "sku" });
        }
        c.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, id: ProductId, patch: &ProductPatch) -> StoreResult<Option<Product>> {
        let mut c = self.write()?;
        Ok(c.products.get_mut(&id).map(|product| {
            product.apply(patch.clone());
            product.clone()
        }))
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        Ok(self.write()?.products.remove(&id).is_some())
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.values().find(|p| &p.sku == sku).cloned())
    }

    async fn query_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let c = self.read()?;
        let mut found: Vec<Product> = c.products.values().filter(|p| query.filter.matches(p)).cloned().collect();
        if let Some(sort) = query.sort {
            found.sort_by(|a, b| sort.compare(a, b));
        }
        let skipped = found.into_iter().skip(query.page.offset as usize);
        Ok(match query.page.limit {
            0 => skipped.collect(),
            n => skipped.take(n as usize).collect(),
        })
    }

    async fn search_products(&self, text: &str) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.products.values().filter(|p| p.matches_text(text)).cloned().collect())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> StoreResult<StockChange> {
        let mut c = self.write()?;
        let Some(product) = c.products.get_mut(&id) else { return Ok(StockChange::Missing) };
        let next = i64::from(product.stock) + delta;
        if next < 0 {
            return Ok(StockChange::Insufficient { available: product.stock });
        }
        product.stock = u32::try_from(next).map_err(|_| StoreError::Corrupt(format!("stock overflow on product {id}")))?;
        product.updated_at = chrono::Utc::now();
        Ok(StockChange::Applied(product.clone()))
    }

    async fn set_rating(&self, id: ProductId, rating: Rating) -> StoreResult<bool> {
        let mut c = self.write()?;
        Ok(c.products.get_mut(&id).map(|p| p.rating = rating).is_some())
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.write()?.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn save_order(&self, order: &Order) -> StoreResult<bool> {
        let mut c = self.write()?;
        Ok(match c.orders.get_mut(&order.id) {
            Some(existing) => { *existing = order.clone(); true }
            None => false,
        })
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn orders(&self) -> StoreResult<Vec<Order>> {
        Ok(self.read()?.orders.values().cloned().collect())
    }

    async fn orders_for_user(&self, user: UserId) -> StoreResult<Vec<Order>> {
        Ok(self.read()?.orders.values().filter(|o| o.user_id == user).cloned().collect())
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        self.write()?.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn update_review(&self, id: ReviewId, patch: &ReviewPatch) -> StoreResult<Option<Review>> {
        let mut c = self.write()?;
        Ok(c.reviews.get_mut(&id).map(|review| {
            review.apply(patch.clone());
            review.clone()
        }))
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.write()?.reviews.remove(&id))
    }

    async fn review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.read()?.reviews.get(&id).cloned())
    }

    async fn reviews_for_product(&self, product: ProductId) -> StoreResult<Vec<Review>> {
        Ok(self.read()?.reviews.values().filter(|r| r.product_id == product).cloned().collect())
    }

    async fn reviews_for_user(&self, user: UserId) -> StoreResult<Vec<Review>> {
        Ok(self.read()?.reviews.values().filter(|r| r.user_id == user).cloned().collect())
    }

    async fn clear(&self) -> StoreResult<()> {
        *self.write()? = Collections::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NewProduct;
    use crate::domain::value_objects::Price;
    use crate::store::{Page, ProductFilter, ProductSort, SortField, SortOrder};
    use rust_decimal::Decimal;

    fn product(sku: &str, price: i64, stock: u32) -> Product {
        Product::create(NewProduct {
            name: format!("Item {sku}"),
            description: "test item".into(),
            price: Price::new(Decimal::new(price, 0)).unwrap(),
            discount_price: None,
            category_id: CategoryId::new(),
            brand: None,
            images: vec![],
            stock,
            sku: Sku::new(sku).unwrap(),
            tags: vec![],
            specifications: None,
        })
    }

    #[tokio::test]
    async fn test_adjust_stock_is_conditional() {
        let store = InMemoryStore::new();
        let p = product("A", 10, 5);
        store.insert_product(&p).await.unwrap();

        match store.adjust_stock(p.id, -3).await.unwrap() {
            StockChange::Applied(updated) => assert_eq!(updated.stock, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.adjust_stock(p.id, -3).await.unwrap(), StockChange::Insufficient { available: 2 });
        assert_eq!(store.product(p.id).await.unwrap().unwrap().stock, 2);
        assert_eq!(store.adjust_stock(ProductId::new(), 1).await.unwrap(), StockChange::Missing);
    }

    #[tokio::test]
    async fn test_unique_sku() {
        let store = InMemoryStore::new();
        store.insert_product(&product("dup", 1, 1)).await.unwrap();
        let err = store.insert_product(&product("DUP", 1, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "sku" }));
    }

    #[tokio::test]
    async fn test_query_sort_and_page() {
        let store = InMemoryStore::new();
        for (sku, price, stock) in [("A", 30, 1), ("B", 10, 0), ("C", 20, 4), ("D", 40, 2)] {
            store.insert_product(&product(sku, price, stock)).await.unwrap();
        }
        let query = ProductQuery {
            filter: ProductFilter { in_stock: true, ..Default::default() },
            sort: Some(ProductSort { field: SortField::Price, order: SortOrder::Desc }),
            page: Page { limit: 2, offset: 1 },
        };
        let skus: Vec<String> = store.query_products(&query).await.unwrap().into_iter().map(|p| p.sku.to_string()).collect();
        assert_eq!(skus, vec!["A", "C"]);

        let all = store.query_products(&ProductQuery { page: Page::unbounded(), ..Default::default() }).await.unwrap();
        assert_eq!(all.len(), 4);
    }
}
