pub mod actions;
pub mod coordinator;
pub mod resolver;
pub mod result;

pub use actions::{ActionBinding, ActionKind, ActionTable, PrimaryAction};
pub use coordinator::{BulkActionItem, BulkOperationCoordinator};
pub use resolver::{
    ArchivedOwnerResolver, DependentActionDescriptor, DependentKey, DependentResourceResolver,
    NoDependency, ResolveWith,
};
pub use result::{BulkFailure, BulkOperationResult, FailureStage};
