//! Catalog service: products and the category tree.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::domain::aggregates::{creates_cycle, Category, CategoryPatch, NewProduct, Product, ProductPatch};
use crate::domain::value_objects::{CategoryId, ProductId, Sku};
use crate::store::{Page, ProductFilter, ProductQuery, Store};
use crate::{CatalogError, Result};

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    /// Serializes parent reassignments so two concurrent moves cannot close a loop.
    tree: Arc<Mutex<()>>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, tree: Arc::new(Mutex::new(())) }
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        if input.name.trim().is_empty() {
            return Err(CatalogError::validation("product name must not be empty"));
        }
        self.require_category(input.category_id).await?;
        let product = Product::create(input);
        self.store.insert_product(&product).await?;
        info!(product = %product.id, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CatalogError::validation("product name must not be empty"));
        }
        if let Some(category) = patch.category_id {
            self.require_category(category).await?;
        }
        self.store
            .update_product(id, &patch)
            .await?
            .ok_or_else(|| CatalogError::not_found("product", id))
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let deleted = self.store.delete_product(id).await?;
        if deleted {
            info!(product = %id, "product deleted");
        }
        Ok(deleted)
    }

    pub async fn product(&self, id: ProductId) -> Result<Product> {
        self.store.product(id).await?.ok_or_else(|| CatalogError::not_found("product", id))
    }

    pub async fn product_by_sku(&self, sku: &str) -> Result<Product> {
        let sku = Sku::new(sku)?;
        self.store
            .product_by_sku(&sku)
            .await?
            .ok_or_else(|| CatalogError::not_found("product", &sku))
    }

    pub async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        if let (Some(min), Some(max)) = (query.filter.min_price, query.filter.max_price) {
            if min > max {
                return Err(CatalogError::validation("minPrice must not exceed maxPrice"));
            }
        }
        Ok(self.store.query_products(query).await?)
    }

    /// Case-insensitive substring match over name, description and tags.
    /// A blank query matches nothing.
    pub async fn search_products(&self, text: &str) -> Result<Vec<Product>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.search_products(text).await?)
    }

    pub async fn products_in_category(&self, id: CategoryId) -> Result<Vec<Product>> {
        let query = ProductQuery {
            filter: ProductFilter { category_id: Some(id), ..Default::default() },
            sort: None,
            page: Page::unbounded(),
        };
        Ok(self.store.query_products(&query).await?)
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(&self, input: NewCategory) -> Result<Category> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CatalogError::validation("category name must not be empty"));
        }
        if let Some(parent) = input.parent_id {
            self.require_category(parent).await?;
        }
        let category = Category::create(name, input.description, input.parent_id);
        self.store.insert_category(&category).await?;
        info!(category = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_category(&self, id: CategoryId, mut patch: CategoryPatch) -> Result<Category> {
        if let Some(name) = patch.name.take() {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CatalogError::validation("category name must not be empty"));
            }
            patch.name = Some(name);
        }

        let Some(Some(parent)) = patch.parent_id else {
            return self
                .store
                .update_category(id, &patch)
                .await?
                .ok_or_else(|| CatalogError::not_found("category", id));
        };

        let _tree = self.tree.lock().await;
        let links: HashMap<CategoryId, Option<CategoryId>> =
            self.store.categories().await?.into_iter().map(|c| (c.id, c.parent_id)).collect();
        if !links.contains_key(&id) {
            return Err(CatalogError::not_found("category", id));
        }
        if !links.contains_key(&parent) {
            return Err(CatalogError::validation(format!("parent category {parent} does not exist")));
        }
        if creates_cycle(id, parent, &links) {
            return Err(CatalogError::validation("a category cannot be its own ancestor"));
        }
        self.store
            .update_category(id, &patch)
            .await?
            .ok_or_else(|| CatalogError::not_found("category", id))
    }

    /// Children and products of a deleted category keep their dangling reference.
    pub async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let deleted = self.store.delete_category(id).await?;
        if deleted {
            info!(category = %id, "category deleted");
        }
        Ok(deleted)
    }

    pub async fn category(&self, id: CategoryId) -> Result<Category> {
        self.store.category(id).await?.ok_or_else(|| CatalogError::not_found("category", id))
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.categories().await?)
    }

    pub async fn top_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.child_categories(None).await?)
    }

    pub async fn subcategories(&self, id: CategoryId) -> Result<Vec<Category>> {
        Ok(self.store.child_categories(Some(id)).await?)
    }

    async fn require_category(&self, id: CategoryId) -> Result<()> {
        match self.store.category(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::validation(format!("category {id} does not exist"))),
        }
    }
}
