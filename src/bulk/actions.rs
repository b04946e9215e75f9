use super::resolver::{DependentResourceResolver, NoDependency};
use crate::core::{CollectionError, CollectionItem, Result};
use crate::endpoint::MutationEndpoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kind of bulk mutation a user can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Archive,
    Restore,
    Delete,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Restore => "restore",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The primary mutation of a bulk action.
#[derive(Clone)]
pub struct PrimaryAction {
    pub kind: ActionKind,
    pub endpoint: Arc<dyn MutationEndpoint>,
}

impl PrimaryAction {
    pub fn new(kind: ActionKind, endpoint: Arc<dyn MutationEndpoint>) -> Self {
        Self { kind, endpoint }
    }
}

impl fmt::Debug for PrimaryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimaryAction").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Mutation endpoint and dependent resolver bound to one action kind.
pub struct ActionBinding<I> {
    pub primary: PrimaryAction,
    pub resolver: Arc<dyn DependentResourceResolver<I>>,
}

impl<I> Clone for ActionBinding<I> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

/// Lookup table `kind -> (mutation endpoint, resolver)`.
pub struct ActionTable<I> {
    bindings: HashMap<ActionKind, ActionBinding<I>>,
}

impl<I> Default for ActionTable<I> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<I: CollectionItem> ActionTable<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an action with no prerequisite mutation.
    pub fn bind(self, kind: ActionKind, endpoint: Arc<dyn MutationEndpoint>) -> Self {
        self.bind_with_resolver(kind, endpoint, Arc::new(NoDependency))
    }

    pub fn bind_with_resolver(
        mut self,
        kind: ActionKind,
        endpoint: Arc<dyn MutationEndpoint>,
        resolver: Arc<dyn DependentResourceResolver<I>>,
    ) -> Self {
        self.bindings.insert(
            kind,
            ActionBinding {
                primary: PrimaryAction::new(kind, endpoint),
                resolver,
            },
        );
        self
    }

    pub fn get(&self, kind: ActionKind) -> Result<&ActionBinding<I>> {
        self.bindings
            .get(&kind)
            .ok_or_else(|| CollectionError::UnknownAction(kind.to_string()))
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.bindings.contains_key(&kind)
    }
}
