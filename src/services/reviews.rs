//! Reviews and the per-product rating derived from them.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::WorkflowMode;
use crate::domain::aggregates::{Review, ReviewPatch};
use crate::domain::events::{DomainEvent, EventPublisher};
use crate::domain::value_objects::{ProductId, Rating, ReviewId, Stars, UserId};
use crate::services::KeyedLocks;
use crate::store::Store;
use crate::{CatalogError, Result};

#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub rating: i64,
    pub comment: Option<String>,
    pub title: Option<String>,
}

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
    events: EventPublisher,
    mode: WorkflowMode,
    locks: Arc<KeyedLocks<ProductId>>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, mode: WorkflowMode) -> Self {
        Self { store, events, mode, locks: Arc::new(KeyedLocks::new()) }
    }

    #[instrument(skip(self, input), fields(user = %user_id, product = %input.product_id))]
    pub async fn create(&self, user_id: UserId, input: NewReview) -> Result<Review> {
        let rating = Stars::new(input.rating)?;
        if self.store.product(input.product_id).await?.is_none() {
            return Err(CatalogError::not_found("product", input.product_id));
        }

        let review = Review::create(user_id, input.product_id, rating, input.comment, input.title);
        self.store.insert_review(&review).await?;
        info!(review = %review.id, rating = rating.value(), "review posted");
        self.events.publish(DomainEvent::ReviewPosted { review_id: review.id, product_id: review.product_id }).await;

        self.refresh_rating(review.product_id).await?;
        Ok(review)
    }

    /// Strict mode recomputes the product rating when the score changes;
    /// lenient mode leaves the stored rating as it was.
    #[instrument(skip(self, rating, comment, title))]
    pub async fn update(&self, id: ReviewId, rating: Option<i64>, comment: Option<String>, title: Option<String>) -> Result<Review> {
        let patch = ReviewPatch { rating: rating.map(Stars::new).transpose()?, comment, title };
        let review = self
            .store
            .update_review(id, &patch)
            .await?
            .ok_or_else(|| CatalogError::not_found("review", id))?;

        if self.mode == WorkflowMode::Strict && patch.changes_rating() {
            self.refresh_rating(review.product_id).await?;
        }
        Ok(review)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ReviewId) -> Result<bool> {
        let Some(review) = self.store.delete_review(id).await? else {
            return Ok(false);
        };
        info!(review = %id, product = %review.product_id, "review removed");
        self.events.publish(DomainEvent::ReviewRemoved { review_id: id, product_id: review.product_id }).await;

        if self.mode == WorkflowMode::Strict {
            self.refresh_rating(review.product_id).await?;
        }
        Ok(true)
    }

    pub async fn review(&self, id: ReviewId) -> Result<Review> {
        self.store.review(id).await?.ok_or_else(|| CatalogError::not_found("review", id))
    }

    pub async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<Review>> {
        Ok(self.store.reviews_for_product(product_id).await?)
    }

    pub async fn reviews_for_user(&self, user_id: UserId) -> Result<Vec<Review>> {
        Ok(self.store.reviews_for_user(user_id).await?)
    }

    /// Recompute the rating from every review of the product.
    ///
    /// Runs under a per-product lock: the read of the review set and the write
    /// of the aggregate happen as one unit, so a slower recompute cannot
    /// overwrite the result of one that saw more reviews.
    pub async fn refresh_rating(&self, product_id: ProductId) -> Result<Rating> {
        let _guard = self.locks.lock(product_id).await;
        let reviews = self.store.reviews_for_product(product_id).await?;
        let rating = Rating::from_scores(reviews.iter().map(|r| r.rating));

        if self.store.set_rating(product_id, rating).await? {
            debug!(product = %product_id, average = rating.average, count = rating.count, "rating refreshed");
            self.events.publish(DomainEvent::ProductRatingChanged { product_id, rating }).await;
        }
        Ok(rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewProduct, Product};
    use crate::domain::value_objects::{CategoryId, Price, Sku};
    use crate::store::InMemoryStore;
    use rust_decimal::Decimal;

    async fn setup(mode: WorkflowMode) -> (Arc<dyn Store>, ReviewService, ProductId) {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let product = Product::create(NewProduct {
            name: "Kettle".into(),
            description: "Boils water".into(),
            price: Price::new(Decimal::new(30, 0)).unwrap(),
            discount_price: None,
            category_id: CategoryId::new(),
            brand: None,
            images: vec![],
            stock: 3,
            sku: Sku::new("KET-1").unwrap(),
            tags: vec![],
            specifications: None,
        });
        store.insert_product(&product).await.unwrap();
        let service = ReviewService::new(store.clone(), EventPublisher::disabled(), mode);
        (store, service, product.id)
    }

    fn new_review(product_id: ProductId, rating: i64) -> NewReview {
        NewReview { product_id, rating, comment: Some("ok".into()), title: None }
    }

    async fn rating(store: &Arc<dyn Store>, id: ProductId) -> Rating {
        store.product(id).await.unwrap().unwrap().rating
    }

    #[tokio::test]
    async fn test_rating_tracks_creates() {
        let (store, reviews, product) = setup(WorkflowMode::Strict).await;
        for score in [5, 4, 3] {
            reviews.create(UserId::new(), new_review(product, score)).await.unwrap();
        }
        assert_eq!(rating(&store, product).await, Rating { average: 4.0, count: 3 });
    }

    #[tokio::test]
    async fn test_strict_mode_recomputes_on_update_and_delete() {
        let (store, reviews, product) = setup(WorkflowMode::Strict).await;
        let first = reviews.create(UserId::new(), new_review(product, 5)).await.unwrap();
        let second = reviews.create(UserId::new(), new_review(product, 3)).await.unwrap();

        reviews.update(second.id, Some(1), None, None).await.unwrap();
        assert_eq!(rating(&store, product).await, Rating { average: 3.0, count: 2 });

        assert!(reviews.delete(first.id).await.unwrap());
        assert_eq!(rating(&store, product).await, Rating { average: 1.0, count: 1 });

        assert!(reviews.delete(second.id).await.unwrap());
        assert_eq!(rating(&store, product).await, Rating { average: 0.0, count: 0 });
        assert!(!reviews.delete(second.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_lenient_mode_recomputes_only_on_create() {
        let (store, reviews, product) = setup(WorkflowMode::Lenient).await;
        let first = reviews.create(UserId::new(), new_review(product, 5)).await.unwrap();
        reviews.create(UserId::new(), new_review(product, 3)).await.unwrap();

        reviews.update(first.id, Some(1), None, None).await.unwrap();
        reviews.delete(first.id).await.unwrap();
        assert_eq!(rating(&store, product).await, Rating { average: 4.0, count: 2 });
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (_, reviews, product) = setup(WorkflowMode::Strict).await;
        assert!(matches!(reviews.create(UserId::new(), new_review(product, 6)).await, Err(CatalogError::Validation(_))));
        assert!(matches!(reviews.create(UserId::new(), new_review(product, 0)).await, Err(CatalogError::Validation(_))));
        assert!(matches!(
            reviews.create(UserId::new(), new_review(ProductId::new(), 4)).await,
            Err(CatalogError::NotFound { entity: "product", .. })
        ));

        let review = reviews.create(UserId::new(), new_review(product, 4)).await.unwrap();
        assert!(matches!(reviews.update(review.id, Some(9), None, None).await, Err(CatalogError::Validation(_))));
        assert!(matches!(reviews.update(ReviewId::new(), None, None, None).await, Err(CatalogError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (_, reviews, product) = setup(WorkflowMode::Strict).await;
        let review = reviews.create(UserId::new(), new_review(product, 4)).await.unwrap();
        let updated = reviews.update(review.id, None, None, Some("Great kettle".into())).await.unwrap();
        assert_eq!(updated.rating.value(), 4);
        assert_eq!(updated.comment.as_deref(), Some("ok"));
        assert_eq!(updated.title.as_deref(), Some("Great kettle"));
        assert_eq!(reviews.reviews_for_product(product).await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_count_every_review() {
        let (store, reviews, product) = setup(WorkflowMode::Strict).await;
        let handles: Vec<_> = (1..=5)
            .map(|score| {
                let reviews = reviews.clone();
                tokio::spawn(async move { reviews.create(UserId::new(), new_review(product, score)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(rating(&store, product).await, Rating { average: 3.0, count: 5 });
    }
}
