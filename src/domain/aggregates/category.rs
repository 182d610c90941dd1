//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::domain::value_objects::CategoryId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

/// Partial category edit. `parent_id: Some(None)` detaches the category to the top level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Option<CategoryId>>,
}

impl Category {
    pub fn create(name: impl Into<String>, description: Option<String>, parent_id: Option<CategoryId>) -> Self {
        Self { id: CategoryId::new(), name: name.into(), description, image: None, parent_id, created_at: Utc::now() }
    }

    pub fn is_top_level(&self) -> bool { self.parent_id.is_none() }

    pub fn apply(&mut self, patch: CategoryPatch) {
        if let Some(v) = patch.name { self.name = v; }
        if let Some(v) = patch.description { self.description = Some(v); }
        if let Some(v) = patch.parent_id { self.parent_id = v; }
    }
}

/// Whether making `parent` the parent of `child` would close a loop.
///
/// Walks up from `parent` through `parents` (child -> parent links). The walk is
/// bounded by the number of known categories, so already-corrupt data cannot
/// make it spin.
pub fn creates_cycle(child: CategoryId, parent: CategoryId, parents: &HashMap<CategoryId, Option<CategoryId>>) -> bool {
    let mut cursor = Some(parent);
    for _ in 0..=parents.len() {
        match cursor {
            Some(id) if id == child => return true,
            Some(id) => cursor = parents.get(&id).copied().flatten(),
            None => return false,
        }
    }
    true
}
