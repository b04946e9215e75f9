use super::cursor::PageCursor;
use super::filter::{FilterPredicateSet, FilterValue};
use super::sort::{SortDirection, SortSpec};
use crate::core::{CollectionError, CollectionItem, FetchError, ItemId, Page, Result};
use crate::endpoint::{ListEndpoint, ListRequest};
use crate::view::CollectionConfig;
use std::collections::HashSet;
use tracing::{Instrument, Level, event, info_span};

/// Observable fetch state of a collection.
#[derive(Debug, Clone)]
pub struct QueryState<I> {
    page: Option<Page<I>>,
    loading: bool,
    error: Option<FetchError>,
}

impl<I> Default for QueryState<I> {
    fn default() -> Self {
        Self {
            page: None,
            loading: false,
            error: None,
        }
    }
}

impl<I> QueryState<I> {
    /// Last successfully applied page. Survives later fetch failures.
    pub fn page(&self) -> Option<&Page<I>> {
        self.page.as_ref()
    }

    pub fn items(&self) -> &[I] {
        self.page.as_ref().map(|p| p.items.as_slice()).unwrap_or(&[])
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loaded(&self) -> bool {
        self.page.is_some()
    }

    /// Set when the most recent fetch failed; cleared by the next success.
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }
}

/// Notification emitted by a [`CollectionQuery`].
#[derive(Debug)]
pub enum QueryEvent<'a, I> {
    /// The request descriptor changed and the collection should be re-fetched.
    RequestChanged(&'a ListRequest),
    PageApplied(&'a Page<I>),
    FetchFailed(&'a FetchError),
}

pub type Listener<I> = Box<dyn Fn(&QueryEvent<'_, I>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Handle for one issued fetch. Hand it back to [`CollectionQuery::apply`]
/// together with the endpoint's response.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    request: ListRequest,
    cursor: PageCursor,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&self) -> &ListRequest {
        &self.request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The fetch failed; the previous page is kept and the error is exposed.
    Failed,
    /// The response belongs to a superseded request and was dropped.
    Discarded,
}

/// Filter, sort and cursor state for one list view plus the last fetched page.
///
/// Every change to filters, sort or page size puts the cursor back on the
/// first page before the next request is built. Responses are tagged with a
/// generation so only the most recently issued request can update the page.
pub struct CollectionQuery<I> {
    filters: FilterPredicateSet,
    sort: SortSpec,
    cursor: PageCursor,
    state: QueryState<I>,
    generation: u64,
    filter_epoch: u64,
    needs_fetch: bool,
    fetch_all_page_limit: usize,
    /// Request and cursor position that produced `state.page`.
    applied: Option<(ListRequest, PageCursor)>,
    listeners: Vec<(ListenerId, Listener<I>)>,
    next_listener_id: u64,
}

impl<I: CollectionItem> CollectionQuery<I> {
    pub fn new(config: &CollectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filters: FilterPredicateSet::new(),
            sort: config.default_sort.clone(),
            cursor: PageCursor::new(config.page_size)?,
            state: QueryState::default(),
            generation: 0,
            filter_epoch: 0,
            needs_fetch: true,
            fetch_all_page_limit: config.fetch_all_page_limit,
            applied: None,
            listeners: Vec::new(),
            next_listener_id: 1,
        })
    }

    pub fn filters(&self) -> &FilterPredicateSet {
        &self.filters
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn state(&self) -> &QueryState<I> {
        &self.state
    }

    /// Ids of the items on the current page, in page order.
    pub fn visible_ids(&self) -> Vec<ItemId> {
        self.state.items().iter().map(|item| item.id().clone()).collect()
    }

    /// Incremented on every effective filter change. Anything scoped to a
    /// "filter session" (selection, cached item snapshots) keys off this.
    pub fn filter_epoch(&self) -> u64 {
        self.filter_epoch
    }

    /// Whether the request changed since the last issued fetch.
    pub fn needs_fetch(&self) -> bool {
        self.needs_fetch
    }

    pub fn current_request(&self) -> ListRequest {
        ListRequest {
            predicates: self.filters.serialize(),
            sort: self.sort.to_backend_key(),
            page_size: self.cursor.page_size(),
            page_token: self.cursor.current_token().map(str::to_string),
        }
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn on_change(
        &mut self,
        listener: impl Fn(&QueryEvent<'_, I>) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn emit(&self, event: QueryEvent<'_, I>) {
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }

    fn request_changed(&mut self, filter_changed: bool, reset_cursor: bool) {
        if reset_cursor {
            self.cursor.reset();
        }
        if filter_changed {
            self.filter_epoch += 1;
        }
        self.needs_fetch = true;
        let request = self.current_request();
        self.emit(QueryEvent::RequestChanged(&request));
    }

    // ------------------------------------------------------------------
    // Filter / sort / paging
    // ------------------------------------------------------------------

    pub fn set_filter(&mut self, key: impl Into<String>, value: FilterValue) -> bool {
        let changed = self.filters.set(key, value);
        if changed {
            self.request_changed(true, true);
        }
        changed
    }

    pub fn clear_filter(&mut self, key: &str) -> bool {
        let changed = self.filters.clear(key);
        if changed {
            self.request_changed(true, true);
        }
        changed
    }

    pub fn clear_filters(&mut self) -> bool {
        let changed = self.filters.clear_all();
        if changed {
            self.request_changed(true, true);
        }
        changed
    }

    pub fn set_sort(&mut self, field: &str) {
        self.sort.set(field);
        self.request_changed(false, true);
    }

    pub fn set_sort_with_direction(&mut self, field: &str, initial: SortDirection) {
        self.sort.set_with_direction(field, initial);
        self.request_changed(false, true);
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Result<()> {
        self.cursor.set_page_size(page_size)?;
        self.request_changed(false, false);
        Ok(())
    }

    /// Moves to the page after the current one.
    ///
    /// Calling this when the current page carries no next token, or before
    /// the page for the current request has been fetched, is a caller bug;
    /// the UI is expected to disable the action.
    pub fn next_page(&mut self) -> Result<()> {
        let token = self
            .current_page()
            .filter(|page| page.has_next())
            .and_then(|page| page.next_token.clone())
            .ok_or_else(|| CollectionError::precondition("no next page token available"))?;
        self.cursor.advance(&token)?;
        self.request_changed(false, false);
        Ok(())
    }

    pub fn previous_page(&mut self) -> Result<()> {
        if self.cursor.is_first_page() {
            return Err(CollectionError::precondition("already on the first page"));
        }
        let backend_token = self
            .current_page()
            .and_then(|page| page.previous_token.clone())
            .filter(|token| !token.is_empty());
        match backend_token {
            Some(token) => self.cursor.retreat(&token)?,
            None => self.cursor.back()?,
        }
        self.request_changed(false, false);
        Ok(())
    }

    /// The visible page, if it was fetched for exactly the current request.
    fn current_page(&self) -> Option<&Page<I>> {
        let (request, _) = self.applied.as_ref()?;
        if *request != self.current_request() {
            return None;
        }
        self.state.page.as_ref()
    }

    /// Puts the cursor back on the kept page after a failed paging move.
    ///
    /// Only applies while filters, sort and page size still match the kept
    /// page; tokens are meaningless under any other request.
    fn restore_applied_cursor(&mut self) {
        let Some((request, cursor)) = &self.applied else {
            return;
        };
        let current = self.current_request();
        if request.predicates == current.predicates
            && request.sort == current.sort
            && request.page_size == current.page_size
            && request.page_token != current.page_token
        {
            event!(
                Level::DEBUG,
                page_index = cursor.page_index(),
                "restoring cursor to the kept page"
            );
            self.cursor = cursor.clone();
        }
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Issues a new fetch for the current request. Any ticket issued before
    /// this one becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state.loading = true;
        self.needs_fetch = false;
        FetchTicket {
            generation: self.generation,
            request: self.current_request(),
            cursor: self.cursor.clone(),
        }
    }

    /// Applies a list response.
    ///
    /// Responses for anything other than the latest ticket, or whose request
    /// no longer matches the current descriptor, are discarded untouched.
    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        response: std::result::Result<Page<I>, FetchError>,
    ) -> ApplyOutcome {
        if ticket.generation != self.generation || ticket.request != self.current_request() {
            event!(
                Level::DEBUG,
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale list response"
            );
            return ApplyOutcome::Discarded;
        }

        self.state.loading = false;
        match response {
            Ok(page) => {
                self.applied = Some((ticket.request, ticket.cursor));
                self.state.error = None;
                self.state.page = Some(page);
                if let Some(page) = &self.state.page {
                    self.emit(QueryEvent::PageApplied(page));
                }
                ApplyOutcome::Applied
            }
            Err(err) => {
                event!(Level::WARN, error = %err, "list fetch failed, keeping previous page");
                self.restore_applied_cursor();
                self.emit(QueryEvent::FetchFailed(&err));
                self.state.error = Some(err);
                ApplyOutcome::Failed
            }
        }
    }

    /// Fetches the current request and applies the response.
    pub async fn refetch(&mut self, endpoint: &dyn ListEndpoint<I>) -> ApplyOutcome {
        let ticket = self.begin_fetch();
        let span = info_span!(
            "collection.fetch",
            generation = ticket.generation,
            sort = %ticket.request.sort,
            page_size = ticket.request.page_size
        );
        let response = endpoint.list(&ticket.request).instrument(span).await;
        self.apply(ticket, response)
    }

    /// Walks every page matching the current filter and sort, from the first
    /// page, without touching the cursor or the visible page.
    ///
    /// Traversal ends on an absent token or an empty page; `total_count` is
    /// never consulted.
    pub async fn fetch_all(&self, endpoint: &dyn ListEndpoint<I>) -> Result<Vec<I>> {
        let mut request = self.current_request();
        request.page_token = None;

        let mut items = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.fetch_all_page_limit {
                return Err(CollectionError::Fetch(FetchError::new(format!(
                    "traversal exceeded {} pages",
                    self.fetch_all_page_limit
                ))));
            }
            let page = endpoint.list(&request).await?;
            pages += 1;

            let exhausted = !page.has_next();
            let next = page.next_token;
            items.extend(page.items);
            if exhausted {
                break;
            }

            let Some(token) = next else { break };
            if !seen_tokens.insert(token.clone()) {
                return Err(CollectionError::Fetch(FetchError::new(format!(
                    "list endpoint repeated page token '{token}'"
                ))));
            }
            request.page_token = Some(token);
        }

        event!(Level::DEBUG, pages, items = items.len(), "collection traversal complete");
        Ok(items)
    }
}
