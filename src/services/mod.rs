//! Application services
//!
//! Multi-step workflows on top of a [`Store`]. Each service is cheap to clone
//! and shares its store, event sink and lock tables with its clones.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::Config;
use crate::domain::events::EventPublisher;
use crate::store::Store;

pub mod accounts;
pub mod catalog;
pub mod orders;
pub mod reviews;

pub use accounts::{AccountService, Registration, Tokens};
pub use catalog::{CatalogService, NewCategory};
pub use orders::{OrderLine, OrderRequest, OrderWorkflow};
pub use reviews::{NewReview, ReviewService};

#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub orders: OrderWorkflow,
    pub reviews: ReviewService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, config: &Config) -> Self {
        let tokens = Tokens::new(config.jwt_secret.as_bytes(), config.token_ttl);
        Self {
            accounts: AccountService::new(store.clone(), tokens),
            catalog: CatalogService::new(store.clone()),
            orders: OrderWorkflow::new(store.clone(), events.clone(), config.workflow_mode),
            reviews: ReviewService::new(store, events, config.workflow_mode),
        }
    }
}

/// Table of async mutexes, one per key, created on first use.
///
/// Entries nobody holds are pruned once the table grows past a threshold.
pub(crate) struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

const PRUNE_THRESHOLD: usize = 1024;

impl<K: Eq + Hash + Copy> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    pub(crate) async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if slots.len() >= PRUNE_THRESHOLD {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(key).or_default().clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}
