mod repo;
pub mod repo_types;
pub mod validate;

pub use repo_types::{Author, NewAuthor};
pub use validate::{generate_activation_token, parse_author_id};
