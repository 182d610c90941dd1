//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{ProductId, ReviewId, Stars, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: Stars,
    pub comment: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub helpful: u32,
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial review edit; absent fields are left as they are.
#[derive(Clone, Debug, Default)]
pub struct ReviewPatch {
    pub rating: Option<Stars>,
    pub comment: Option<String>,
    pub title: Option<String>,
}

impl ReviewPatch {
    pub fn changes_rating(&self) -> bool { self.rating.is_some() }
}

impl Review {
    pub fn create(user_id: UserId, product_id: ProductId, rating: Stars, comment: Option<String>, title: Option<String>) -> Self {
        Self { id: ReviewId::new(), user_id, product_id, rating, comment, title, helpful: 0, verified: false, created_at: Utc::now() }
    }

    pub fn apply(&mut self, patch: ReviewPatch) {
        if let Some(v) = patch.rating { self.rating = v; }
        if let Some(v) = patch.comment { self.comment = Some(v); }
        if let Some(v) = patch.title { self.title = Some(v); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update() {
        let mut review = Review::create(UserId::new(), ProductId::new(), Stars::new(4).unwrap(), Some("Solid".into()), None);
        review.apply(ReviewPatch { title: Some("Good value".into()), ..Default::default() });
        assert_eq!(review.rating.value(), 4);
        assert_eq!(review.comment.as_deref(), Some("Solid"));
        assert_eq!(review.title.as_deref(), Some("Good value"));
        assert_eq!(review.helpful, 0);
        assert!(!review.verified);
    }
}
