pub mod error;
pub mod types;

pub use error::{CollectionError, FetchError, MutationFailure, Result};
pub use types::{CollectionItem, ItemId, Page};
