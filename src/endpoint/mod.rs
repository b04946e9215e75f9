//! Remote collaborators the collection core consumes.
//!
//! The core never talks HTTP itself; callers plug in implementations of
//! [`ListEndpoint`] and [`MutationEndpoint`] that wrap their backend client.

use crate::core::{FetchError, ItemId, MutationFailure, Page, Result};
use crate::query::filter::{Predicate, encode_predicates};
use async_trait::async_trait;

/// Request descriptor sent to a list endpoint.
///
/// Two descriptors compare equal exactly when they would produce the same
/// backend query, which is what stale-response detection relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub predicates: Vec<Predicate>,
    pub sort: String,
    pub page_size: u32,
    pub page_token: Option<String>,
}

impl ListRequest {
    /// Query parameters in backend form: `filter`, `page_size`,
    /// `page_token` (first page omits it) and `sort_by`.
    pub fn query_params(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = vec![
            ("filter", encode_predicates(&self.predicates)?),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(token) = &self.page_token {
            params.push(("page_token", token.clone()));
        }
        params.push(("sort_by", self.sort.clone()));
        Ok(params)
    }
}

/// A remote paged-list API.
#[async_trait]
pub trait ListEndpoint<I>: Send + Sync {
    async fn list(&self, request: &ListRequest) -> std::result::Result<Page<I>, FetchError>;
}

/// A remote single-item mutation (archive, restore, delete, ...).
///
/// Dependent-resource endpoints implement the same trait.
#[async_trait]
pub trait MutationEndpoint: Send + Sync {
    async fn mutate(&self, id: &ItemId) -> std::result::Result<(), MutationFailure>;
}
