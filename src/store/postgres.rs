//! Postgres-backed store.
//!
//! One table per collection. Stock changes, rating writes and partial updates
//! are single statements, so each is atomic against concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::aggregates::{Category, CategoryPatch, Order, OrderItem, Product, ProductPatch, Review, ReviewPatch, User};
use crate::domain::value_objects::{Address, CategoryId, OrderId, Price, ProductId, Rating, ReviewId, Sku, Specifications, Stars, UserId};

use super::{ProductQuery, SortField, SortOrder, StockChange, Store, StoreError, StoreResult};

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate { field: unique_field(db.constraint()) };
            }
        }
        StoreError::Unavailable(e.to_string())
    }
}

fn unique_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_username_key") => "username",
        Some("users_email_key") => "email",
        Some("categories_name_key") => "name",
        Some("products_sku_key") => "sku",
        _ => "id",
    }
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {e}"))
}

/// Escape LIKE metacharacters so user text matches literally.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') { escaped.push('\\'); }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid, username: String, email: String, password_hash: String, first_name: String, last_name: String,
    role: String, address: Option<Json<Address>>, phone: Option<String>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id.into(), username: r.username, email: r.email, password_hash: r.password_hash,
            first_name: r.first_name, last_name: r.last_name,
            role: r.role.parse().map_err(|e| corrupt("user role", e))?,
            address: r.address.map(|a| a.0), phone: r.phone, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid, name: String, description: Option<String>, image: Option<String>, parent_id: Option<Uuid>, created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Category { id: r.id.into(), name: r.name, description: r.description, image: r.image, parent_id: r.parent_id.map(Into::into), created_at: r.created_at }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid, name: String, description: String, price: Decimal, discount_price: Option<Decimal>, category_id: Uuid,
    brand: Option<String>, images: Vec<String>, stock: i64, sku: String, tags: Vec<String>,
    specifications: Option<Json<Specifications>>, rating_average: f64, rating_count: i64, is_active: bool,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: r.id.into(),
            name: r.name,
            description: r.description,
            price: Price::new(r.price).map_err(|e| corrupt("product price", e))?,
            discount_price: r.discount_price.map(Price::new).transpose().map_err(|e| corrupt("product discount", e))?,
            category_id: r.category_id.into(),
            brand: r.brand,
            images: r.images,
            stock: u32::try_from(r.stock).map_err(|e| corrupt("product stock", e))?,
            sku: Sku::new(r.sku).map_err(|e| corrupt("product sku", e))?,
            tags: r.tags,
            specifications: r.specifications.map(|s| s.0),
            rating: Rating {
                average: r.rating_average,
                count: u32::try_from(r.rating_count).map_err(|e| corrupt("rating count", e))?,
            },
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, items: Json<Vec<OrderItem>>, total_amount: Decimal, status: String, payment_status: String,
    shipping_address: Json<Address>, payment_method: String, tracking_number: Option<String>, notes: Option<String>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: r.id.into(), user_id: r.user_id.into(), items: r.items.0, total_amount: r.total_amount,
            status: r.status.parse().map_err(|e| corrupt("order status", e))?,
            payment_status: r.payment_status.parse().map_err(|e| corrupt("payment status", e))?,
            shipping_address: r.shipping_address.0, payment_method: r.payment_method,
            tracking_number: r.tracking_number, notes: r.notes, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid, user_id: Uuid, product_id: Uuid, rating: i16, comment: Option<String>, title: Option<String>,
    helpful: i32, verified: bool, created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;
    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            id: r.id.into(), user_id: r.user_id.into(), product_id: r.product_id.into(),
            rating: Stars::new(i64::from(r.rating)).map_err(|e| corrupt("review rating", e))?,
            comment: r.comment, title: r.title,
            helpful: u32::try_from(r.helpful).map_err(|e| corrupt("review helpful", e))?,
            verified: r.verified, created_at: r.created_at,
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, u: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, username, email, password_hash, first_name, last_name, role, address, phone, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)")
            .bind(*u.id.as_uuid()).bind(&u.username).bind(&u.email).bind(&u.password_hash).bind(&u.first_name).bind(&u.last_name)
            .bind(u.role.as_str()).bind(u.address.as_ref().map(Json)).bind(&u.phone).bind(u.created_at).bind(u.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(*id.as_uuid()).fetch_optional(&self.pool).await?.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email).fetch_optional(&self.pool).await?.map(User::try_from).transpose()
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        convert(sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id").fetch_all(&self.pool).await?)
    }

    async fn insert_category(&self, c: &Category) -> StoreResult<()> {
        sqlx::query("INSERT INTO categories (id, name, description, image, parent_id, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(*c.id.as_uuid()).bind(&c.name).bind(&c.description).bind(&c.image).bind(c.parent_id.map(Uuid::from)).bind(c.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn update_category(&self, id: CategoryId, patch: &CategoryPatch) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = COALESCE($2, name), description = COALESCE($3, description), \
             parent_id = CASE WHEN $4 THEN $5 ELSE parent_id END WHERE id = $1 RETURNING *",
        )
        .bind(*id.as_uuid()).bind(&patch.name).bind(&patch.description)
        .bind(patch.parent_id.is_some()).bind(patch.parent_id.flatten().map(Uuid::from))
        .fetch_optional(&self.pool).await?;
        Ok(row.map(Category::from))
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM categories WHERE id = $1").bind(*id.as_uuid()).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1").bind(*id.as_uuid()).fetch_optional(&self.pool).await?;
        Ok(row.map(Category::from))
    }

    async fn categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY id").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn child_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE parent_id IS NOT DISTINCT FROM $1 ORDER BY id")
            .bind(parent.map(Uuid::from)).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn insert_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, discount_price, category_id, brand, images, stock, sku, tags, \
             specifications, rating_average, rating_count, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(*p.id.as_uuid()).bind(&p.name).bind(&p.description).bind(p.price.amount()).bind(p.discount_price.map(|d| d.amount()))
        .bind(*p.category_id.as_uuid()).bind(&p.brand).bind(&p.images).bind(i64::from(p.stock)).bind(p.sku.as_str()).bind(&p.tags)
        .bind(p.specifications.as_ref().map(Json)).bind(p.rating.average).bind(i64::from(p.rating.count)).bind(p.is_active)
        .bind(p.created_at).bind(p.updated_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn update_product(&self, id: ProductId, patch: &ProductPatch) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(
            "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), price = COALESCE($4, price), \
             discount_price = COALESCE($5, discount_price), category_id = COALESCE($6, category_id), brand = COALESCE($7, brand), \
             images = COALESCE($8, images), stock = COALESCE($9, stock), tags = COALESCE($10, tags), \
             specifications = COALESCE($11, specifications), is_active = COALESCE($12, is_active), updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(*id.as_uuid()).bind(&patch.name).bind(&patch.description).bind(patch.price.map(|p| p.amount()))
        .bind(patch.discount_price.map(|p| p.amount())).bind(patch.category_id.map(Uuid::from)).bind(&patch.brand)
        .bind(&patch.images).bind(patch.stock.map(i64::from)).bind(&patch.tags)
        .bind(patch.specifications.as_ref().map(Json)).bind(patch.is_active)
        .fetch_optional(&self.pool).await?
        .map(Product::try_from)
        .transpose()
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(*id.as_uuid()).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(*id.as_uuid()).fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE sku = $1")
            .bind(sku.as_str()).fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn query_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let f = &query.filter;
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products WHERE TRUE");
        if let Some(c) = f.category_id { qb.push(" AND category_id = ").push_bind(Uuid::from(c)); }
        if let Some(min) = f.min_price { qb.push(" AND price >= ").push_bind(min); }
        if let Some(max) = f.max_price { qb.push(" AND price <= ").push_bind(max); }
        if let Some(brand) = &f.brand { qb.push(" AND brand = ").push_bind(brand.clone()); }
        if f.in_stock { qb.push(" AND stock > 0"); }
        if let Some(tags) = &f.tags { qb.push(" AND tags && ").push_bind(tags.clone()); }

        match query.sort {
            Some(sort) => {
                let column = match sort.field {
                    SortField::Name => "name",
                    SortField::Price => "price",
                    SortField::CreatedAt => "created_at",
                    SortField::Rating => "rating_average",
                };
                let direction = match sort.order { SortOrder::Asc => "ASC", SortOrder::Desc => "DESC" };
                qb.push(format!(" ORDER BY {column} {direction}, id"));
            }
            None => { qb.push(" ORDER BY id"); }
        }
        if query.page.limit > 0 { qb.push(" LIMIT ").push_bind(i64::from(query.page.limit)); }
        qb.push(" OFFSET ").push_bind(i64::from(query.page.offset));

        convert(qb.build_query_as::<ProductRow>().fetch_all(&self.pool).await?)
    }

    async fn search_products(&self, text: &str) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE name ILIKE $1 OR description ILIKE $1 \
             OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $1) ORDER BY id",
        )
        .bind(like_pattern(text)).fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> StoreResult<StockChange> {
        let updated = sqlx::query_as::<_, ProductRow>(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1 AND stock + $2 >= 0 RETURNING *",
        )
        .bind(*id.as_uuid()).bind(delta).fetch_optional(&self.pool).await?;
        if let Some(row) = updated {
            return Ok(StockChange::Applied(Product::try_from(row)?));
        }
        let current: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(*id.as_uuid()).fetch_optional(&self.pool).await?;
        Ok(match current {
            Some(stock) => StockChange::Insufficient { available: u32::try_from(stock).map_err(|e| corrupt("product stock", e))? },
            None => StockChange::Missing,
        })
    }

    async fn set_rating(&self, id: ProductId, rating: Rating) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE products SET rating_average = $2, rating_count = $3 WHERE id = $1")
            .bind(*id.as_uuid()).bind(rating.average).bind(i64::from(rating.count)).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn insert_order(&self, o: &Order) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, items, total_amount, status, payment_status, shipping_address, payment_method, \
             tracking_number, notes, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(*o.id.as_uuid()).bind(*o.user_id.as_uuid()).bind(Json(&o.items)).bind(o.total_amount).bind(o.status.as_str())
        .bind(o.payment_status.as_str()).bind(Json(&o.shipping_address)).bind(&o.payment_method).bind(&o.tracking_number)
        .bind(&o.notes).bind(o.created_at).bind(o.updated_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn save_order(&self, o: &Order) -> StoreResult<bool> {
        let done = sqlx::query(
            "UPDATE orders SET status = $2, payment_status = $3, tracking_number = $4, notes = $5, updated_at = $6 WHERE id = $1",
        )
        .bind(*o.id.as_uuid()).bind(o.status.as_str()).bind(o.payment_status.as_str()).bind(&o.tracking_number)
        .bind(&o.notes).bind(o.updated_at)
        .execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(*id.as_uuid()).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn orders(&self) -> StoreResult<Vec<Order>> {
        convert(sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY id").fetch_all(&self.pool).await?)
    }

    async fn orders_for_user(&self, user: UserId) -> StoreResult<Vec<Order>> {
        convert(
            sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 ORDER BY id")
                .bind(*user.as_uuid()).fetch_all(&self.pool).await?,
        )
    }

    async fn insert_review(&self, r: &Review) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO reviews (id, user_id, product_id, rating, comment, title, helpful, verified, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(*r.id.as_uuid()).bind(*r.user_id.as_uuid()).bind(*r.product_id.as_uuid()).bind(i16::from(r.rating.value()))
        .bind(&r.comment).bind(&r.title).bind(i32::try_from(r.helpful).unwrap_or(i32::MAX)).bind(r.verified).bind(r.created_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn update_review(&self, id: ReviewId, patch: &ReviewPatch) -> StoreResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>(
            "UPDATE reviews SET rating = COALESCE($2, rating), comment = COALESCE($3, comment), title = COALESCE($4, title) \
             WHERE id = $1 RETURNING *",
        )
        .bind(*id.as_uuid()).bind(patch.rating.map(|s| i16::from(s.value()))).bind(&patch.comment).bind(&patch.title)
        .fetch_optional(&self.pool).await?
        .map(Review::try_from)
        .transpose()
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>("DELETE FROM reviews WHERE id = $1 RETURNING *")
            .bind(*id.as_uuid()).fetch_optional(&self.pool).await?.map(Review::try_from).transpose()
    }

    async fn review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = $1")
            .bind(*id.as_uuid()).fetch_optional(&self.pool).await?.map(Review::try_from).transpose()
    }

    async fn reviews_for_product(&self, product: ProductId) -> StoreResult<Vec<Review>> {
        convert(
            sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE product_id = $1 ORDER BY id")
                .bind(*product.as_uuid()).fetch_all(&self.pool).await?,
        )
    }

    async fn reviews_for_user(&self, user: UserId) -> StoreResult<Vec<Review>> {
        convert(
            sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE user_id = $1 ORDER BY id")
                .bind(*user.as_uuid()).fetch_all(&self.pool).await?,
        )
    }

    async fn clear(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE users, categories, products, orders, reviews").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("shoe"), "%shoe%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_unique_constraint_names() {
        assert_eq!(unique_field(Some("products_sku_key")), "sku");
        assert_eq!(unique_field(Some("users_email_key")), "email");
        assert_eq!(unique_field(None), "id");
    }
}
