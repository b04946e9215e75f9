//! Recommended API entrypoints grouped by abstraction level.
//!
//! `view` is the default for wiring a list screen end to end.
//! `parts` exposes the building blocks for callers composing their own flow.

pub mod view {
    //! Everything needed to mount a list screen.
    //!
    //! Intended usage in app code:
    //! - implement `CollectionItem` for the resource row type,
    //! - implement `ListEndpoint` / `MutationEndpoint` over the backend client,
    //! - bind actions in an `ActionTable` and open a `CollectionView`.
    pub use crate::{
        ActionKind, ActionTable, ArchivedOwnerResolver, BulkOperationCoordinator,
        BulkOperationResult, CollectionConfig, CollectionError, CollectionItem, CollectionView,
        FetchError, FilterValue, ItemId, ListEndpoint, ListRequest, MutationEndpoint,
        MutationFailure, Page, RetentionPolicy, SelectAllState, SortDirection,
    };
}

pub mod parts {
    //! Individual components: cursor, filters, sort, query, selection,
    //! resolver and coordinator.
    pub use crate::bulk::{
        BulkActionItem, DependentActionDescriptor, DependentKey, DependentResourceResolver,
        NoDependency, PrimaryAction, ResolveWith,
    };
    pub use crate::query::{
        ApplyOutcome, CollectionQuery, FetchTicket, FilterPredicateSet, PageCursor, Predicate,
        QueryEvent, QueryState, SortSpec,
    };
    pub use crate::selection::SelectionSet;
}
