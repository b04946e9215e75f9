// ============================================================================
// pagesync Library
// ============================================================================

pub mod bulk;
pub mod core;
pub mod endpoint;
pub mod prelude;
pub mod query;
pub mod selection;
pub mod view;

// Re-export main types for convenience
pub use crate::core::{
    CollectionError, CollectionItem, FetchError, ItemId, MutationFailure, Page, Result,
};
pub use endpoint::{ListEndpoint, ListRequest, MutationEndpoint};

pub use query::{
    ApplyOutcome, CollectionQuery, FilterPredicateSet, FilterValue, PageCursor, Predicate,
    QueryEvent, QueryState, SortDirection, SortSpec,
};
pub use selection::{RetentionPolicy, SelectAllState, SelectionSet};

pub use bulk::{
    ActionKind, ActionTable, ArchivedOwnerResolver, BulkFailure, BulkOperationCoordinator,
    BulkOperationResult, DependentActionDescriptor, DependentResourceResolver, NoDependency,
    PrimaryAction,
};

// ============================================================================
// High-level view API
// ============================================================================

pub use view::{BulkCompletion, BulkTicket, CollectionConfig, CollectionView};
