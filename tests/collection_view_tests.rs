/// Collection view tests
///
/// Selection lifecycle, bulk actions and result attachment.
/// Run with: cargo test --test collection_view_tests
mod common;

use common::{FakeList, FakeMutation, Run, ids, runs};
use pagesync::{
    ActionKind, ActionTable, ArchivedOwnerResolver, BulkOperationCoordinator, CollectionConfig,
    CollectionError, CollectionView, FilterValue, ItemId, RetentionPolicy, SelectAllState,
};
use std::sync::Arc;

struct Harness {
    view: CollectionView<Run>,
    list: Arc<FakeList>,
    archive: Arc<FakeMutation>,
    restore: Arc<FakeMutation>,
    experiments: Arc<FakeMutation>,
}

fn harness(items: Vec<Run>, config: CollectionConfig) -> Harness {
    let list = FakeList::new(items);
    let archive = FakeMutation::new("archive");
    let restore = FakeMutation::new("restore");
    let experiments = FakeMutation::new("experiment");

    let actions: ActionTable<Run> = ActionTable::new()
        .bind(ActionKind::Archive, archive.clone())
        .bind_with_resolver(
            ActionKind::Restore,
            restore.clone(),
            Arc::new(ArchivedOwnerResolver::new("experiment", |run: &Run| {
                run.experiment_archived.then(|| run.experiment_id.clone())
            })),
        );
    let coordinator = BulkOperationCoordinator::new().with_dependent_endpoint(
        "experiment",
        ActionKind::Restore,
        experiments.clone(),
    );

    let view = CollectionView::new(config, list.clone(), actions, coordinator).unwrap();
    Harness {
        view,
        list,
        archive,
        restore,
        experiments,
    }
}

fn id(raw: &str) -> ItemId {
    ItemId::from(raw)
}

// ============================================================================
// Selection lifecycle
// ============================================================================

#[tokio::test]
async fn test_page_retention_prunes_on_page_change() {
    let mut h = harness(
        runs(&["a", "b", "c", "d"]),
        CollectionConfig::new().page_size(2),
    );
    h.view.refresh().await;
    h.view.toggle(&id("a"));
    assert!(h.view.is_selected(&id("a")));

    h.view.next_page().unwrap();
    h.view.refresh().await;
    assert!(h.view.selection().is_empty());

    h.view.previous_page().unwrap();
    h.view.refresh().await;
    assert!(!h.view.is_selected(&id("a")));
}

#[tokio::test]
async fn test_all_matching_retention_survives_paging() {
    let mut h = harness(
        runs(&["a", "b", "c", "d"]),
        CollectionConfig::new()
            .page_size(2)
            .retention(RetentionPolicy::AllMatchingFilter),
    );
    h.view.refresh().await;
    h.view.toggle(&id("a"));

    h.view.next_page().unwrap();
    h.view.refresh().await;
    h.view.toggle(&id("c"));
    assert_eq!(h.view.header_state(), SelectAllState::Some);

    h.view.previous_page().unwrap();
    h.view.refresh().await;
    assert_eq!(h.view.selection().selected_ids(), ids(&["a", "c"]));
}

#[tokio::test]
async fn test_filter_change_clears_all_matching_selection() {
    let mut h = harness(
        runs(&["a1", "a2", "b1"]),
        CollectionConfig::new().retention(RetentionPolicy::AllMatchingFilter),
    );
    h.view.refresh().await;
    h.view.select_all_visible();
    assert_eq!(h.view.selection().count(), 3);

    h.view.set_filter("name", FilterValue::substring("a"));
    assert!(h.view.selection().is_empty());
}

#[tokio::test]
async fn test_filter_change_prunes_page_selection_after_fetch() {
    let mut h = harness(runs(&["a1", "a2", "b1"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();

    h.view.set_filter("name", FilterValue::substring("a"));
    h.view.refresh().await;

    assert_eq!(h.view.selection().selected_ids(), ids(&["a1", "a2"]));
}

#[tokio::test]
async fn test_header_state_tracks_visible_page() {
    let mut h = harness(runs(&["a", "b"]), CollectionConfig::new());
    h.view.refresh().await;
    assert_eq!(h.view.header_state(), SelectAllState::None);

    h.view.toggle(&id("a"));
    assert_eq!(h.view.header_state(), SelectAllState::Some);

    h.view.toggle(&id("b"));
    assert_eq!(h.view.header_state(), SelectAllState::All);

    h.view.toggle_all_visible();
    assert_eq!(h.view.header_state(), SelectAllState::None);

    h.view.toggle_all_visible();
    assert_eq!(h.view.header_state(), SelectAllState::All);
}

#[tokio::test]
async fn test_select_all_matching_spans_pages() {
    let mut h = harness(
        runs(&["a1", "a2", "a3", "b1"]),
        CollectionConfig::new()
            .page_size(1)
            .retention(RetentionPolicy::AllMatchingFilter),
    );
    h.view.set_filter("name", FilterValue::substring("a"));
    h.view.refresh().await;

    let count = h.view.select_all_matching().await.unwrap();
    assert_eq!(count, 3);
    assert_eq!(h.view.selection().selected_ids(), ids(&["a1", "a2", "a3"]));

    let result = h.view.submit_bulk_action(ActionKind::Archive).await.unwrap();
    assert_eq!(result.succeeded, ids(&["a1", "a2", "a3"]));
}

#[tokio::test]
async fn test_select_all_matching_requires_all_matching_retention() {
    let mut h = harness(runs(&["a"]), CollectionConfig::new());
    h.view.refresh().await;

    let err = h.view.select_all_matching().await.unwrap_err();
    assert!(matches!(err, CollectionError::Precondition(_)));
}

// ============================================================================
// Bulk actions
// ============================================================================

#[tokio::test]
async fn test_submit_deselects_succeeded_and_refetches() {
    let mut h = harness(runs(&["a", "b", "c"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();
    h.archive.fail("b", 409, "run is still executing");
    let fetches_before = h.list.requests().len();

    let result = h.view.submit_bulk_action(ActionKind::Archive).await.unwrap();

    assert_eq!(result.succeeded, ids(&["a", "c"]));
    assert_eq!(result.failed_ids(), ids(&["b"]));
    assert_eq!(h.view.selection().selected_ids(), ids(&["b"]));
    assert_eq!(h.list.requests().len(), fetches_before + 1);
    assert!(h.view.last_result().unwrap().is_partial_failure());
}

#[tokio::test]
async fn test_retry_failed_through_view() {
    let mut h = harness(runs(&["a", "b", "c"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();
    h.archive.fail("b", 503, "try again");

    h.view.submit_bulk_action(ActionKind::Archive).await.unwrap();
    h.archive.heal("b");

    let retry = h.view.retry_failed().await.unwrap();
    assert_eq!(retry.succeeded, ids(&["b"]));
    assert_eq!(h.archive.call_count("a"), 1);
    assert_eq!(h.archive.call_count("b"), 2);
    assert!(h.view.selection().is_empty());

    // Nothing left to retry.
    assert!(matches!(
        h.view.retry_failed().await,
        Err(CollectionError::Precondition(_))
    ));
}

#[tokio::test]
async fn test_restore_issues_shared_dependent_once() {
    let items = vec![
        Run::in_archived_experiment("r1", "exp-1"),
        Run::in_archived_experiment("r2", "exp-1"),
        Run::new("r3"),
    ];
    let mut h = harness(items, CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();

    let ticket = h.view.begin_bulk(ActionKind::Restore).unwrap();
    assert_eq!(ticket.dependent_targets().len(), 1);

    let completion = ticket.execute().await;
    let result = h.view.complete_bulk(completion).await.unwrap();

    assert!(result.is_success());
    assert_eq!(h.experiments.calls(), ids(&["exp-1"]));
    assert_eq!(h.restore.calls().len(), 3);
}

#[tokio::test]
async fn test_result_detaches_when_filter_changes_mid_flight() {
    let mut h = harness(runs(&["a", "b"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();

    let ticket = h.view.begin_bulk(ActionKind::Archive).unwrap();
    h.view.set_filter("name", FilterValue::substring("a"));
    let completion = ticket.execute().await;

    // Mutations still happened remotely.
    assert_eq!(completion.result().succeeded.len(), 2);
    assert!(h.view.complete_bulk(completion).await.is_none());
    assert!(h.view.last_result().is_none());
}

#[tokio::test]
async fn test_result_detaches_after_unmount() {
    let mut h = harness(runs(&["a"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();

    let ticket = h.view.begin_bulk(ActionKind::Archive).unwrap();
    h.view.unmount();
    let completion = ticket.execute().await;

    assert!(!h.view.is_mounted());
    assert!(h.view.complete_bulk(completion).await.is_none());
    assert_eq!(h.archive.calls(), ids(&["a"]));
}

#[tokio::test]
async fn test_sort_change_does_not_detach_result() {
    let mut h = harness(runs(&["a", "b"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();

    let ticket = h.view.begin_bulk(ActionKind::Archive).unwrap();
    h.view.set_sort("name");
    let completion = ticket.execute().await;

    assert!(h.view.complete_bulk(completion).await.is_some());
}

#[tokio::test]
async fn test_empty_selection_is_precondition_error() {
    let mut h = harness(runs(&["a"]), CollectionConfig::new());
    h.view.refresh().await;

    let err = h.view.submit_bulk_action(ActionKind::Archive).await.unwrap_err();
    assert!(matches!(err, CollectionError::Precondition(_)));
    assert!(h.archive.calls().is_empty());
}

#[tokio::test]
async fn test_selection_stays_actionable_between_filter_change_and_fetch() {
    let mut h = harness(
        runs(&["a1", "b1", "a2"]),
        CollectionConfig::new().page_size(2),
    );
    h.view.refresh().await;
    h.view.select_all_visible();

    h.view.set_filter("name", FilterValue::substring("a"));
    assert_eq!(h.view.selection().count(), 2);
    assert_eq!(h.view.selected_items().unwrap().len(), 2);

    let result = h.view.submit_bulk_action(ActionKind::Archive).await.unwrap();

    assert_eq!(result.succeeded, ids(&["a1", "b1"]));
    assert_eq!(h.archive.calls().len(), 2);
    assert_eq!(h.view.query().visible_ids(), ids(&["a1", "a2"]));
    assert!(h.view.selection().is_empty());
}

#[tokio::test]
async fn test_unloaded_selection_is_reported_not_skipped() {
    let mut h = harness(runs(&["a", "b"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.toggle(&id("a"));
    h.view.toggle(&id("ghost"));

    let err = h.view.submit_bulk_action(ActionKind::Archive).await.unwrap_err();

    match err {
        CollectionError::UnloadedSelection(unloaded) => assert_eq!(unloaded, ids(&["ghost"])),
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.archive.calls().is_empty());
    assert_eq!(h.view.selection().count(), 2);
}

#[tokio::test]
async fn test_unbound_action_is_rejected() {
    let mut h = harness(runs(&["a"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.select_all_visible();

    let err = h.view.submit_bulk_action(ActionKind::Delete).await.unwrap_err();
    assert!(matches!(err, CollectionError::UnknownAction(kind) if kind == "delete"));
}

#[tokio::test]
async fn test_deleted_items_vanish_after_refetch() {
    let mut h = harness(runs(&["a", "b"]), CollectionConfig::new());
    h.view.refresh().await;
    h.view.toggle(&id("a"));

    // The backend drops archived items from this listing.
    h.list.remove("a");
    h.view.submit_bulk_action(ActionKind::Archive).await.unwrap();

    assert_eq!(h.view.query().visible_ids(), ids(&["b"]));
    assert!(h.view.selection().is_empty());
}

#[tokio::test]
async fn test_refresh_if_needed_only_fetches_on_change() {
    let mut h = harness(runs(&["a"]), CollectionConfig::new());
    assert!(h.view.refresh_if_needed().await.is_some());
    assert!(h.view.refresh_if_needed().await.is_none());

    h.view.set_filter("name", FilterValue::substring("a"));
    assert!(h.view.refresh_if_needed().await.is_some());
    assert_eq!(h.list.requests().len(), 2);
}
