use super::actions::ActionKind;
use crate::core::ItemId;
use std::fmt;

/// A prerequisite mutation on a related resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependentActionDescriptor {
    /// Resource type of the dependent target, e.g. `"experiment"`.
    pub resource: String,
    pub target_id: ItemId,
    pub action: ActionKind,
}

impl DependentActionDescriptor {
    pub fn new(resource: impl Into<String>, target_id: ItemId, action: ActionKind) -> Self {
        Self {
            resource: resource.into(),
            target_id,
            action,
        }
    }

    pub fn key(&self) -> DependentKey {
        DependentKey {
            resource: self.resource.clone(),
            action: self.action,
            target_id: self.target_id.clone(),
        }
    }
}

/// Identity of a dependent mutation for deduplication.
///
/// Two descriptors collapse into one remote call only when resource type,
/// action and target id all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependentKey {
    pub resource: String,
    pub action: ActionKind,
    pub target_id: ItemId,
}

impl fmt::Display for DependentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.action, self.resource, self.target_id)
    }
}

/// Decides whether an item needs a prerequisite mutation.
///
/// Implementations must be pure: inspect the item, never mutate anything.
/// Resolvers hold no state and can be shared between coordinators.
pub trait DependentResourceResolver<I>: Send + Sync {
    fn resolve(&self, item: &I) -> Option<DependentActionDescriptor>;
}

/// Resolver for actions that never need a prerequisite.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependency;

impl<I> DependentResourceResolver<I> for NoDependency {
    fn resolve(&self, _item: &I) -> Option<DependentActionDescriptor> {
        None
    }
}

/// Restores an archived owning group before acting on its member.
///
/// `archived_owner` returns the owner id only when the owner is archived.
pub struct ArchivedOwnerResolver<F> {
    resource: String,
    archived_owner: F,
}

impl<F> ArchivedOwnerResolver<F> {
    pub fn new(resource: impl Into<String>, archived_owner: F) -> Self {
        Self {
            resource: resource.into(),
            archived_owner,
        }
    }
}

impl<I, F> DependentResourceResolver<I> for ArchivedOwnerResolver<F>
where
    F: Fn(&I) -> Option<ItemId> + Send + Sync,
{
    fn resolve(&self, item: &I) -> Option<DependentActionDescriptor> {
        (self.archived_owner)(item).map(|owner| {
            DependentActionDescriptor::new(self.resource.clone(), owner, ActionKind::Restore)
        })
    }
}

/// Adapts a plain function into a resolver.
pub struct ResolveWith<F>(pub F);

impl<I, F> DependentResourceResolver<I> for ResolveWith<F>
where
    F: Fn(&I) -> Option<DependentActionDescriptor> + Send + Sync,
{
    fn resolve(&self, item: &I) -> Option<DependentActionDescriptor> {
        (self.0)(item)
    }
}
