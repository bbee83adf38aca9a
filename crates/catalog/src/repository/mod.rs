//! Category and product repositories.
//!
//! Repositories sit on top of the relational store traits. They own input
//! validation, translate "record missing" into `NotFound`, and publish a
//! change event after every successful write.

mod category;
mod product;

pub use category::CategoryRepository;
pub use product::ProductRepository;
