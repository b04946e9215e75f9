use crate::core::{CollectionError, Result};
use crate::query::{SortDirection, SortSpec};
use crate::selection::RetentionPolicy;
use serde::{Deserialize, Serialize};

/// Collection view configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Items per page
    pub page_size: u32,

    /// Selection retention across pages
    pub retention: RetentionPolicy,

    /// Sort applied before the user picks a column
    pub default_sort: SortSpec,

    /// Upper bound on pages walked by a full traversal
    pub fetch_all_page_limit: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            retention: RetentionPolicy::Page,
            default_sort: SortSpec::new("created_at", SortDirection::Desc),
            fetch_all_page_limit: 1000,
        }
    }
}

impl CollectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the selection retention policy
    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Set the default sort
    pub fn default_sort(mut self, sort: SortSpec) -> Self {
        self.default_sort = sort;
        self
    }

    /// Set the traversal page limit
    pub fn fetch_all_page_limit(mut self, limit: usize) -> Self {
        self.fetch_all_page_limit = limit;
        self
    }

    /// Parse from a JSON document. Missing fields take their defaults.
    ///
    /// ```
    /// # use pagesync::CollectionConfig;
    /// let config = CollectionConfig::from_json(
    ///     r#"{"page_size": 25, "retention": "all-matching-filter"}"#,
    /// )?;
    /// assert_eq!(config.page_size, 25);
    /// # Ok::<(), pagesync::CollectionError>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CollectionError::InvalidConfig("page_size must be > 0".into()));
        }

        if self.default_sort.field.is_empty() {
            return Err(CollectionError::InvalidConfig(
                "default_sort.field cannot be empty".into(),
            ));
        }

        if self.fetch_all_page_limit == 0 {
            return Err(CollectionError::InvalidConfig(
                "fetch_all_page_limit must be > 0".into(),
            ));
        }

        Ok(())
    }
}
