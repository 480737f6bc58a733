//! Author account records: field validation and single-table persistence.

pub mod author;
pub mod config;
pub mod db;
pub mod error;
pub mod store;

pub use author::{Author, NewAuthor};
pub use error::{AuthorError, BoxError, Result};
pub use store::{NamedParams, QueryExecutor, Row, SqlValue};
