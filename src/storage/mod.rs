//! SQLite persistence: schema, the upsert engine, dimension resolution, and
//! read queries.

mod dimensions;
mod queries;
mod schema;
mod types;
mod upsert;

pub use dimensions::Dimension;
pub use schema::Database;
pub use types::{
    ArticleFilter, DatabaseError, DimensionEntry, Page, PageMeta, StoredArticle,
};
