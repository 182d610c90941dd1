//! Aggregates module
pub mod category;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use category::{creates_cycle, Category, CategoryPatch};
pub use order::{Order, OrderItem, OrderStatus, PaymentStatus, UnknownVariant};
pub use product::{NewProduct, Product, ProductPatch};
pub use review::{Review, ReviewPatch};
pub use user::{Role, User};
