use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a collection item as issued by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An item held in a remote paged collection.
///
/// The core only ever reads the identity. Everything else on the item is
/// resource-specific payload that resolvers may inspect.
pub trait CollectionItem: Clone + Send + Sync + 'static {
    fn id(&self) -> &ItemId;
}

/// One page returned by a list endpoint.
///
/// `total_count` is advisory and can be stale under concurrent mutation.
/// Traversal ends only when `next_token` is absent or the page is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<I> {
    pub items: Vec<I>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl<I> Page<I> {
    pub fn new(items: Vec<I>) -> Self {
        Self {
            items,
            next_token: None,
            previous_token: None,
            total_count: None,
        }
    }

    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    pub fn with_previous_token(mut self, token: impl Into<String>) -> Self {
        self.previous_token = Some(token.into());
        self
    }

    pub fn with_total_count(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }

    /// Whether forward traversal can continue past this page.
    pub fn has_next(&self) -> bool {
        !self.items.is_empty() && self.next_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl<I: CollectionItem> Page<I> {
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id().clone()).collect()
    }
}
