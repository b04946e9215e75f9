use crate::core::{CollectionError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageDirection {
    #[default]
    Forward,
    Backward,
}

/// Continuation-token and page-size state for one list endpoint.
///
/// Tokens are opaque and only valid for the filter, sort and page size they
/// were issued under, so any of those changing puts the cursor back on the
/// first page. The cursor keeps the tokens it has walked past so a previous
/// page can be requested even when the backend only issues forward tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page_size: u32,
    current_token: Option<String>,
    direction: PageDirection,
    history: Vec<Option<String>>,
}

impl PageCursor {
    pub fn new(page_size: u32) -> Result<Self> {
        validate_page_size(page_size)?;
        Ok(Self {
            page_size,
            current_token: None,
            direction: PageDirection::Forward,
            history: Vec::new(),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_token(&self) -> Option<&str> {
        self.current_token.as_deref()
    }

    pub fn direction(&self) -> PageDirection {
        self.direction
    }

    /// 0-based index of the current page.
    pub fn page_index(&self) -> usize {
        self.history.len()
    }

    pub fn is_first_page(&self) -> bool {
        self.current_token.is_none() && self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.current_token = None;
        self.direction = PageDirection::Forward;
        self.history.clear();
    }

    pub fn advance(&mut self, token: &str) -> Result<()> {
        require_token(token, "advance")?;
        self.history.push(self.current_token.take());
        self.current_token = Some(token.to_string());
        self.direction = PageDirection::Forward;
        Ok(())
    }

    /// Moves back using a backend-issued previous-page token.
    pub fn retreat(&mut self, token: &str) -> Result<()> {
        require_token(token, "retreat")?;
        self.history.pop();
        self.current_token = Some(token.to_string());
        self.direction = PageDirection::Backward;
        Ok(())
    }

    /// Moves back to the token recorded before the last `advance`.
    pub fn back(&mut self) -> Result<()> {
        let previous = self
            .history
            .pop()
            .ok_or_else(|| CollectionError::precondition("cannot go back from the first page"))?;
        self.current_token = previous;
        self.direction = PageDirection::Backward;
        Ok(())
    }

    /// Changes the page size and returns to the first page.
    pub fn set_page_size(&mut self, page_size: u32) -> Result<()> {
        validate_page_size(page_size)?;
        self.page_size = page_size;
        self.reset();
        Ok(())
    }
}

fn require_token(token: &str, op: &str) -> Result<()> {
    if token.is_empty() {
        return Err(CollectionError::precondition(format!(
            "{op} requires a non-empty page token"
        )));
    }
    Ok(())
}

fn validate_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 {
        return Err(CollectionError::precondition("page size must be > 0"));
    }
    Ok(())
}
