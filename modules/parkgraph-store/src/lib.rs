pub mod error;
pub mod postgres;
mod schema;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{Result, StoreError};
pub use postgres::PgDocumentStore;
pub use store::{filter_by_proximity, DocumentStore, DEFAULT_SEARCH_LIMIT};
