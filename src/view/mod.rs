//! Per-view wiring of query, selection and bulk actions.
//!
//! A [`CollectionView`] is created once per mounted list screen with its
//! endpoints injected. Nothing is shared between views.

pub mod config;

pub use config::CollectionConfig;

use crate::bulk::{
    ActionBinding, ActionKind, ActionTable, BulkActionItem, BulkOperationCoordinator,
    BulkOperationResult, DependentKey,
};
use crate::core::{CollectionError, CollectionItem, ItemId, Result};
use crate::endpoint::ListEndpoint;
use crate::query::{
    ApplyOutcome, CollectionQuery, FilterValue, ListenerId, QueryEvent, QueryState, SortDirection,
};
use crate::selection::{RetentionPolicy, SelectAllState, SelectionSet};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{Level, event};

/// A bulk action captured from the view, ready to run without borrowing it.
///
/// Running a ticket never touches the view, so the caller is free to keep
/// interacting with the list (or leave it) while mutations are in flight.
pub struct BulkTicket<I> {
    binding: ActionBinding<I>,
    coordinator: BulkOperationCoordinator,
    items: Vec<I>,
    retry_of: Option<BulkOperationResult<I>>,
    filter_epoch: u64,
}

impl<I: CollectionItem> BulkTicket<I> {
    pub fn kind(&self) -> ActionKind {
        self.binding.primary.kind
    }

    pub fn items(&self) -> &[I] {
        match &self.retry_of {
            Some(previous) => previous.retryable_items(),
            None => &self.items,
        }
    }

    /// Prerequisite mutations this action would issue.
    pub fn plan(&self) -> Vec<BulkActionItem<I>> {
        BulkOperationCoordinator::plan(self.items().to_vec(), self.binding.resolver.as_ref())
    }

    pub fn dependent_targets(&self) -> BTreeSet<DependentKey> {
        let mut targets = BulkOperationCoordinator::dependent_targets(&self.plan());
        if let Some(previous) = &self.retry_of {
            targets.retain(|key| !previous.satisfied_dependents().contains(key));
        }
        targets
    }

    pub async fn execute(self) -> BulkCompletion<I> {
        let resolver = self.binding.resolver.as_ref();
        let result = match &self.retry_of {
            Some(previous) => {
                self.coordinator
                    .retry_failed(previous, &self.binding.primary, resolver)
                    .await
            }
            None => {
                self.coordinator
                    .submit(self.items, &self.binding.primary, resolver)
                    .await
            }
        };
        BulkCompletion {
            result,
            filter_epoch: self.filter_epoch,
        }
    }
}

/// Result of an executed [`BulkTicket`], to be handed back to the view.
#[derive(Debug, Clone)]
pub struct BulkCompletion<I> {
    result: BulkOperationResult<I>,
    filter_epoch: u64,
}

impl<I> BulkCompletion<I> {
    pub fn result(&self) -> &BulkOperationResult<I> {
        &self.result
    }

    pub fn into_result(self) -> BulkOperationResult<I> {
        self.result
    }
}

/// Collection view: one list screen's query, selection and bulk actions.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use pagesync::{
///     ActionKind, ActionTable, BulkOperationCoordinator, CollectionConfig, CollectionItem,
///     CollectionView, FetchError, ItemId, ListEndpoint, ListRequest, MutationEndpoint,
///     MutationFailure, Page,
/// };
/// use std::sync::Arc;
///
/// #[derive(Clone)]
/// struct Run(ItemId);
///
/// impl CollectionItem for Run {
///     fn id(&self) -> &ItemId {
///         &self.0
///     }
/// }
///
/// struct Runs;
///
/// #[async_trait]
/// impl ListEndpoint<Run> for Runs {
///     async fn list(&self, _request: &ListRequest) -> Result<Page<Run>, FetchError> {
///         Ok(Page::new(vec![Run("run-1".into()), Run("run-2".into())]))
///     }
/// }
///
/// struct Archive;
///
/// #[async_trait]
/// impl MutationEndpoint for Archive {
///     async fn mutate(&self, _id: &ItemId) -> Result<(), MutationFailure> {
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> pagesync::Result<()> {
/// let actions: ActionTable<Run> = ActionTable::new().bind(ActionKind::Archive, Arc::new(Archive));
/// let mut view = CollectionView::new(
///     CollectionConfig::new(),
///     Arc::new(Runs),
///     actions,
///     BulkOperationCoordinator::new(),
/// )?;
///
/// view.refresh().await;
/// view.select_all_visible();
///
/// let result = view.submit_bulk_action(ActionKind::Archive).await?;
/// assert_eq!(result.succeeded.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct CollectionView<I: CollectionItem> {
    query: CollectionQuery<I>,
    selection: SelectionSet,
    /// Item snapshots seen during the current filter session, so a selection
    /// spanning pages can still be acted on.
    snapshots: HashMap<ItemId, I>,
    snapshot_epoch: u64,
    list: Arc<dyn ListEndpoint<I>>,
    actions: ActionTable<I>,
    coordinator: BulkOperationCoordinator,
    last_result: Option<BulkOperationResult<I>>,
    mounted: bool,
}

impl<I: CollectionItem> CollectionView<I> {
    pub fn new(
        config: CollectionConfig,
        list: Arc<dyn ListEndpoint<I>>,
        actions: ActionTable<I>,
        coordinator: BulkOperationCoordinator,
    ) -> Result<Self> {
        let query = CollectionQuery::new(&config)?;
        let snapshot_epoch = query.filter_epoch();
        Ok(Self {
            query,
            selection: SelectionSet::new(config.retention),
            snapshots: HashMap::new(),
            snapshot_epoch,
            list,
            actions,
            coordinator,
            last_result: None,
            mounted: true,
        })
    }

    pub fn query(&self) -> &CollectionQuery<I> {
        &self.query
    }

    pub fn state(&self) -> &QueryState<I> {
        self.query.state()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Result of the last bulk action still attached to this view.
    pub fn last_result(&self) -> Option<&BulkOperationResult<I>> {
        self.last_result.as_ref()
    }

    pub fn dismiss_result(&mut self) {
        self.last_result = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Detaches the view. Bulk actions still in flight complete remotely but
    /// their results are dropped.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.last_result = None;
    }

    pub fn on_change(
        &mut self,
        listener: impl Fn(&QueryEvent<'_, I>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.query.on_change(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.query.remove_listener(id)
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    pub async fn refresh(&mut self) -> ApplyOutcome {
        let outcome = self.query.refetch(self.list.as_ref()).await;
        if outcome == ApplyOutcome::Applied {
            self.sync_page();
        }
        outcome
    }

    pub async fn refresh_if_needed(&mut self) -> Option<ApplyOutcome> {
        if self.query.needs_fetch() {
            Some(self.refresh().await)
        } else {
            None
        }
    }

    fn sync_page(&mut self) {
        self.rotate_snapshots();
        for item in self.query.state().items() {
            self.snapshots.insert(item.id().clone(), item.clone());
        }
        self.selection.reconcile(self.query.visible_ids());
    }

    /// Drops snapshots from an earlier filter session.
    ///
    /// Runs only once items of the new session arrive: until then the old
    /// page stays on screen and its selected items remain actionable.
    fn rotate_snapshots(&mut self) {
        let epoch = self.query.filter_epoch();
        if epoch != self.snapshot_epoch {
            self.snapshot_epoch = epoch;
            self.snapshots.clear();
        }
    }

    fn sync_filter_session(&mut self, changed: bool) {
        if changed {
            self.selection.on_filter_changed();
        }
    }

    // ------------------------------------------------------------------
    // Filter / sort / paging (call `refresh` afterwards)
    // ------------------------------------------------------------------

    pub fn set_filter(&mut self, key: impl Into<String>, value: FilterValue) -> bool {
        let changed = self.query.set_filter(key, value);
        self.sync_filter_session(changed);
        changed
    }

    pub fn clear_filter(&mut self, key: &str) -> bool {
        let changed = self.query.clear_filter(key);
        self.sync_filter_session(changed);
        changed
    }

    pub fn clear_filters(&mut self) -> bool {
        let changed = self.query.clear_filters();
        self.sync_filter_session(changed);
        changed
    }

    pub fn set_sort(&mut self, field: &str) {
        self.query.set_sort(field);
    }

    pub fn set_sort_with_direction(&mut self, field: &str, initial: SortDirection) {
        self.query.set_sort_with_direction(field, initial);
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Result<()> {
        self.query.set_page_size(page_size)
    }

    pub fn next_page(&mut self) -> Result<()> {
        self.query.next_page()
    }

    pub fn previous_page(&mut self) -> Result<()> {
        self.query.previous_page()
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn toggle(&mut self, id: &ItemId) -> bool {
        self.selection.toggle(id)
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.selection.is_selected(id)
    }

    pub fn select_all_visible(&mut self) {
        let visible = self.query.visible_ids();
        self.selection.select_all_visible(&visible);
    }

    pub fn toggle_all_visible(&mut self) {
        self.selection.toggle_all_visible();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn header_state(&self) -> SelectAllState {
        self.selection.header_state()
    }

    /// Selects every item matching the current filter, across all pages.
    ///
    /// Only meaningful when selection outlives the page.
    pub async fn select_all_matching(&mut self) -> Result<usize> {
        if self.selection.retention() != RetentionPolicy::AllMatchingFilter {
            return Err(CollectionError::precondition(
                "select all matching requires all-matching-filter retention",
            ));
        }
        let items = self.query.fetch_all(self.list.as_ref()).await?;
        self.rotate_snapshots();
        let count = items.len();
        for item in items {
            self.selection.select(item.id().clone());
            self.snapshots.insert(item.id().clone(), item);
        }
        Ok(count)
    }

    /// Snapshots of the selected items, in id order.
    ///
    /// Fails with [`CollectionError::UnloadedSelection`] when a selected id
    /// was never seen on a page of the current filter session.
    pub fn selected_items(&self) -> Result<Vec<I>> {
        let mut items = Vec::with_capacity(self.selection.count());
        let mut unloaded = Vec::new();
        for id in self.selection.selected_ids() {
            match self.snapshots.get(&id) {
                Some(item) => items.push(item.clone()),
                None => unloaded.push(id),
            }
        }
        if !unloaded.is_empty() {
            event!(
                Level::WARN,
                unloaded = unloaded.len(),
                "selected ids have no item snapshot"
            );
            return Err(CollectionError::UnloadedSelection(unloaded));
        }
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Bulk actions
    // ------------------------------------------------------------------

    pub fn begin_bulk(&self, kind: ActionKind) -> Result<BulkTicket<I>> {
        let binding = self.actions.get(kind)?.clone();
        if self.selection.is_empty() {
            return Err(CollectionError::precondition("no items selected"));
        }
        let items = self.selected_items()?;
        Ok(BulkTicket {
            binding,
            coordinator: self.coordinator.clone(),
            items,
            retry_of: None,
            filter_epoch: self.query.filter_epoch(),
        })
    }

    /// Ticket re-running the failed subset of the last result.
    pub fn begin_retry(&self) -> Result<BulkTicket<I>> {
        let previous = self
            .last_result
            .as_ref()
            .filter(|result| !result.failed.is_empty())
            .ok_or_else(|| CollectionError::precondition("no failed bulk action to retry"))?;
        let binding = self.actions.get(previous.kind())?.clone();
        Ok(BulkTicket {
            binding,
            coordinator: self.coordinator.clone(),
            items: Vec::new(),
            retry_of: Some(previous.clone()),
            filter_epoch: self.query.filter_epoch(),
        })
    }

    /// Attaches a finished bulk action to the view.
    ///
    /// Returns `None` when the view was unmounted or the filter changed while
    /// the action ran; the result is then dropped. Otherwise the succeeded
    /// items leave the selection and the list is re-fetched.
    pub async fn complete_bulk(
        &mut self,
        completion: BulkCompletion<I>,
    ) -> Option<&BulkOperationResult<I>> {
        if !self.mounted || completion.filter_epoch != self.query.filter_epoch() {
            event!(
                Level::DEBUG,
                succeeded = completion.result.succeeded.len(),
                failed = completion.result.failed.len(),
                "bulk result detached from view"
            );
            return None;
        }

        let result = completion.result;
        for id in &result.succeeded {
            self.selection.deselect(id);
        }
        self.last_result = Some(result);
        self.refresh().await;
        self.last_result.as_ref()
    }

    pub async fn submit_bulk_action(&mut self, kind: ActionKind) -> Result<BulkOperationResult<I>> {
        let ticket = self.begin_bulk(kind)?;
        let completion = ticket.execute().await;
        let result = completion.result().clone();
        self.complete_bulk(completion).await;
        Ok(result)
    }

    pub async fn retry_failed(&mut self) -> Result<BulkOperationResult<I>> {
        let ticket = self.begin_retry()?;
        let completion = ticket.execute().await;
        let result = completion.result().clone();
        self.complete_bulk(completion).await;
        Ok(result)
    }
}
