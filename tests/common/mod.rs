//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use pagesync::{
    CollectionItem, FetchError, FilterValue, ItemId, ListEndpoint, ListRequest, MutationEndpoint,
    MutationFailure, Page,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: ItemId,
    pub experiment_id: ItemId,
    pub experiment_archived: bool,
}

impl Run {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            experiment_id: "default".into(),
            experiment_archived: false,
        }
    }

    pub fn in_archived_experiment(id: &str, experiment: &str) -> Self {
        Self {
            id: id.into(),
            experiment_id: experiment.into(),
            experiment_archived: true,
        }
    }
}

impl CollectionItem for Run {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

pub fn runs(ids: &[&str]) -> Vec<Run> {
    ids.iter().map(|id| Run::new(id)).collect()
}

pub fn ids(raw: &[&str]) -> Vec<ItemId> {
    raw.iter().map(|s| ItemId::from(*s)).collect()
}

/// In-memory list endpoint paging by offset tokens.
///
/// Understands a `name` substring filter and an `experiment_id` equality
/// filter; sort is recorded but ignored.
#[derive(Default)]
pub struct FakeList {
    runs: Mutex<Vec<Run>>,
    requests: Mutex<Vec<ListRequest>>,
    fail_next: Mutex<Option<FetchError>>,
}

impl FakeList {
    pub fn new(runs: Vec<Run>) -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(runs),
            ..Default::default()
        })
    }

    pub fn fail_next(&self, err: FetchError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn remove(&self, id: &str) {
        self.runs.lock().unwrap().retain(|run| run.id.as_str() != id);
    }

    pub fn requests(&self) -> Vec<ListRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ListRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn matches(request: &ListRequest, run: &Run) -> bool {
        request.predicates.iter().all(|p| match (p.key.as_str(), &p.value) {
            ("name", FilterValue::Substring(s)) => run.id.as_str().contains(s.as_str()),
            ("experiment_id", FilterValue::Equals(e)) => run.experiment_id.as_str() == e,
            _ => true,
        })
    }
}

#[async_trait]
impl ListEndpoint<Run> for FakeList {
    async fn list(&self, request: &ListRequest) -> Result<Page<Run>, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }

        let matching: Vec<Run> = self
            .runs
            .lock()
            .unwrap()
            .iter()
            .filter(|run| Self::matches(request, run))
            .cloned()
            .collect();
        let offset: usize = request
            .page_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);
        let size = request.page_size as usize;
        let end = (offset + size).min(matching.len());
        let items = matching.get(offset..end).unwrap_or_default().to_vec();

        let mut page = Page::new(items).with_total_count(matching.len() as u64);
        if end < matching.len() {
            page = page.with_next_token(end.to_string());
        }
        Ok(page)
    }
}

/// Mutation endpoint recording every call, with per-id scripted failures.
pub struct FakeMutation {
    name: &'static str,
    calls: Mutex<Vec<ItemId>>,
    failures: Mutex<HashMap<ItemId, MutationFailure>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeMutation {
    pub fn new(name: &'static str) -> Arc<Self> {
        Self::with_log(name, Arc::new(Mutex::new(Vec::new())))
    }

    /// Endpoints sharing `log` append `"<name>:<id>"` in call order.
    pub fn with_log(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            log,
        })
    }

    pub fn fail(&self, id: &str, status: u16, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(id.into(), MutationFailure::new(status, message));
    }

    pub fn heal(&self, id: &str) {
        self.failures.lock().unwrap().remove(&ItemId::from(id));
    }

    pub fn calls(&self) -> Vec<ItemId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == id)
            .count()
    }
}

#[async_trait]
impl MutationEndpoint for FakeMutation {
    async fn mutate(&self, id: &ItemId) -> Result<(), MutationFailure> {
        // Let other items interleave so ordering assertions mean something.
        tokio::task::yield_now().await;
        self.calls.lock().unwrap().push(id.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, id));
        match self.failures.lock().unwrap().get(id) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}
