//! Persisted domain models.

mod category;
mod product;
mod review;

pub use category::Category;
pub use product::Product;
pub use review::ProductReview;
