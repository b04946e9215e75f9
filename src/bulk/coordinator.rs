// ============================================================================
// Bulk operation coordinator
// ============================================================================
//
// Per item: dependent mutation (if any) -> primary mutation.
// Across items: everything runs concurrently, no ordering.
//
// Dependent mutations are shared futures keyed by DependentKey, so items
// pointing at the same target all await one remote call. Keys confirmed in
// an earlier attempt are carried in the result and never re-issued on retry.
//
// ============================================================================

use super::actions::{ActionKind, PrimaryAction};
use super::resolver::{DependentActionDescriptor, DependentKey, DependentResourceResolver};
use super::result::{BulkFailure, BulkOperationResult, FailureStage};
use crate::core::{CollectionItem, ItemId, MutationFailure};
use crate::endpoint::MutationEndpoint;
use futures::future::{self, BoxFuture, FutureExt, Shared, join_all};
use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

type MutationOutcome = std::result::Result<(), MutationFailure>;
type SharedMutation = Shared<BoxFuture<'static, MutationOutcome>>;

/// An item paired with the prerequisite it needs, if any.
#[derive(Debug, Clone)]
pub struct BulkActionItem<I> {
    pub item: I,
    pub dependent_action: Option<DependentActionDescriptor>,
}

/// Route for dependent mutations: resource type + action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DependentRoute {
    resource: String,
    action: ActionKind,
}

/// Runs bulk actions against mutation endpoints.
///
/// Holds only the endpoints used for dependent resources; it keeps no state
/// between submissions; anything a retry needs travels in the result.
#[derive(Clone, Default)]
pub struct BulkOperationCoordinator {
    dependents: HashMap<DependentRoute, Arc<dyn MutationEndpoint>>,
}

impl BulkOperationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the endpoint that performs `action` on `resource` targets.
    pub fn with_dependent_endpoint(
        mut self,
        resource: impl Into<String>,
        action: ActionKind,
        endpoint: Arc<dyn MutationEndpoint>,
    ) -> Self {
        self.dependents.insert(
            DependentRoute {
                resource: resource.into(),
                action,
            },
            endpoint,
        );
        self
    }

    /// Resolves every item's prerequisite without issuing anything.
    ///
    /// Useful to warn the user up front (e.g. "restoring these runs also
    /// restores their experiment").
    pub fn plan<I: CollectionItem>(
        items: Vec<I>,
        resolver: &dyn DependentResourceResolver<I>,
    ) -> Vec<BulkActionItem<I>> {
        items
            .into_iter()
            .map(|item| {
                let dependent_action = resolver.resolve(&item);
                BulkActionItem {
                    item,
                    dependent_action,
                }
            })
            .collect()
    }

    /// Unique dependent targets of a plan, in stable order.
    pub fn dependent_targets<I>(plan: &[BulkActionItem<I>]) -> BTreeSet<DependentKey> {
        plan.iter()
            .filter_map(|entry| entry.dependent_action.as_ref().map(DependentActionDescriptor::key))
            .collect()
    }

    pub async fn submit<I: CollectionItem>(
        &self,
        items: Vec<I>,
        primary: &PrimaryAction,
        resolver: &dyn DependentResourceResolver<I>,
    ) -> BulkOperationResult<I> {
        let span = info_span!(
            "bulk.submit",
            submission = %Uuid::new_v4(),
            action = %primary.kind,
            items = items.len()
        );
        self.run(items, primary, resolver, BTreeSet::new())
            .instrument(span)
            .await
    }

    /// Re-submits exactly the failed subset of `previous`.
    ///
    /// The returned result covers the retried items only. Dependent targets
    /// satisfied by any earlier attempt are skipped.
    pub async fn retry_failed<I: CollectionItem>(
        &self,
        previous: &BulkOperationResult<I>,
        primary: &PrimaryAction,
        resolver: &dyn DependentResourceResolver<I>,
    ) -> BulkOperationResult<I> {
        let span = info_span!(
            "bulk.retry",
            submission = %Uuid::new_v4(),
            action = %primary.kind,
            items = previous.failed_items.len()
        );
        self.run(
            previous.failed_items.clone(),
            primary,
            resolver,
            previous.satisfied_dependents.clone(),
        )
        .instrument(span)
        .await
    }

    async fn run<I: CollectionItem>(
        &self,
        items: Vec<I>,
        primary: &PrimaryAction,
        resolver: &dyn DependentResourceResolver<I>,
        satisfied: BTreeSet<DependentKey>,
    ) -> BulkOperationResult<I> {
        let plan = Self::plan(items, resolver);

        let mut pending: HashMap<DependentKey, SharedMutation> = HashMap::new();
        for descriptor in plan.iter().filter_map(|entry| entry.dependent_action.as_ref()) {
            let key = descriptor.key();
            if satisfied.contains(&key) || pending.contains_key(&key) {
                continue;
            }
            let call = self.dependent_call(descriptor);
            pending.insert(key, call);
        }

        let per_item = plan.into_iter().map(|entry| {
            let dependent = entry
                .dependent_action
                .as_ref()
                .and_then(|descriptor| pending.get(&descriptor.key()).cloned());
            let endpoint = Arc::clone(&primary.endpoint);
            async move {
                if let Some(dependent) = dependent
                    && let Err(failure) = dependent.await
                {
                    return (entry.item, Err((FailureStage::Dependent, failure)));
                }
                let outcome = guarded(endpoint.mutate(entry.item.id())).await;
                (entry.item, outcome.map_err(|failure| (FailureStage::Primary, failure)))
            }
        });
        let outcomes = join_all(per_item).await;

        let mut satisfied = satisfied;
        for (key, call) in &pending {
            if matches!(call.peek(), Some(Ok(()))) {
                satisfied.insert(key.clone());
            }
        }

        let mut result = BulkOperationResult::empty(primary.kind, satisfied);
        for (item, outcome) in outcomes {
            match outcome {
                Ok(()) => result.succeeded.push(item.id().clone()),
                Err((stage, failure)) => {
                    result
                        .failed
                        .push(BulkFailure::new(item.id().clone(), stage, failure));
                    result.failed_items.push(item);
                }
            }
        }

        event!(
            Level::INFO,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            dependents_issued = pending.len(),
            "bulk action finished"
        );
        result
    }

    fn dependent_call(&self, descriptor: &DependentActionDescriptor) -> SharedMutation {
        let route = DependentRoute {
            resource: descriptor.resource.clone(),
            action: descriptor.action,
        };
        let key = descriptor.key();
        let Some(endpoint) = self.dependents.get(&route).cloned() else {
            event!(Level::ERROR, dependent = %key, "no endpoint registered for dependent action");
            let failure = MutationFailure::new(
                501,
                format!("no endpoint registered to {} {}", route.action, route.resource),
            );
            return future::ready(Err(failure)).boxed().shared();
        };

        let target: ItemId = descriptor.target_id.clone();
        async move {
            let outcome = guarded(endpoint.mutate(&target)).await;
            if let Err(failure) = &outcome {
                event!(Level::WARN, dependent = %key, error = %failure, "dependent action failed");
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

/// Turns a panicking mutation future into an ordinary failure so one item
/// cannot take the whole aggregate down.
async fn guarded<F>(call: F) -> MutationOutcome
where
    F: Future<Output = MutationOutcome>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            event!(Level::ERROR, "mutation future panicked");
            Err(MutationFailure::panicked())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::resolver::{NoDependency, ResolveWith};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Item(ItemId);

    impl CollectionItem for Item {
        fn id(&self) -> &ItemId {
            &self.0
        }
    }

    #[derive(Default)]
    struct Flaky {
        calls: Mutex<Vec<String>>,
        panic_on: Option<&'static str>,
    }

    #[async_trait]
    impl MutationEndpoint for Flaky {
        async fn mutate(&self, id: &ItemId) -> MutationOutcome {
            self.calls.lock().unwrap().push(id.to_string());
            if self.panic_on == Some(id.as_str()) {
                panic!("endpoint blew up");
            }
            Ok(())
        }
    }

    #[test]
    fn test_panicking_mutation_becomes_failure() {
        let endpoint = Arc::new(Flaky {
            panic_on: Some("b"),
            ..Default::default()
        });
        let primary = PrimaryAction::new(ActionKind::Delete, endpoint.clone());
        let items = vec![Item("a".into()), Item("b".into())];

        let result = tokio_test::block_on(BulkOperationCoordinator::new().submit(
            items,
            &primary,
            &NoDependency,
        ));

        assert_eq!(result.succeeded, vec![ItemId::from("a")]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].status, 500);
        assert_eq!(result.failed[0].stage, FailureStage::Primary);
    }

    #[test]
    fn test_unrouted_dependent_fails_items() {
        let endpoint = Arc::new(Flaky::default());
        let primary = PrimaryAction::new(ActionKind::Restore, endpoint.clone());
        let resolver = ResolveWith(|item: &Item| {
            Some(DependentActionDescriptor::new(
                "experiment",
                format!("exp-of-{}", item.0).into(),
                ActionKind::Restore,
            ))
        });

        let result = tokio_test::block_on(BulkOperationCoordinator::new().submit(
            vec![Item("a".into())],
            &primary,
            &resolver,
        ));

        assert!(result.is_total_failure());
        assert_eq!(result.failed[0].stage, FailureStage::Dependent);
        assert_eq!(result.failed[0].reason, "no endpoint registered to restore experiment");
        assert!(endpoint.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_plan_reports_unique_targets() {
        let resolver = ResolveWith(|_: &Item| {
            Some(DependentActionDescriptor::new("experiment", "e1".into(), ActionKind::Restore))
        });
        let plan = BulkOperationCoordinator::plan(
            vec![Item("a".into()), Item("b".into())],
            &resolver,
        );

        assert_eq!(plan.len(), 2);
        assert_eq!(BulkOperationCoordinator::dependent_targets(&plan).len(), 1);
    }
}
