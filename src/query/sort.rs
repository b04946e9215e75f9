use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction for the single active sort column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-column sort. There is no multi-column sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Selects `field`. Re-selecting the active field flips the direction,
    /// a new field starts ascending.
    pub fn set(&mut self, field: &str) {
        self.set_with_direction(field, SortDirection::Asc);
    }

    /// Like [`SortSpec::set`] but a newly selected field starts at `initial`
    /// (e.g. `Desc` for "most recent first" on timestamps).
    pub fn set_with_direction(&mut self, field: &str, initial: SortDirection) {
        if self.field == field {
            self.direction = self.direction.toggled();
        } else {
            self.field = field.to_string();
            self.direction = initial;
        }
    }

    /// Renders `"<field> <asc|desc>"`.
    pub fn to_backend_key(&self) -> String {
        format!("{} {}", self.field, self.direction)
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::descending("created_at")
    }
}
