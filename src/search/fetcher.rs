//! Cursor pagination over a [`SearchClient`]
//!
//! Pages are requested strictly one after another: the cursor for page N+1 is
//! only known once page N has arrived. The loop ends on the first page without
//! items. Two guards keep a misbehaving service from spinning forever: a page
//! ceiling, and a check that a non-empty page never hands back a cursor that
//! was already sent.
//!
//! The repeated-cursor check assumes each cursor names a position in the result
//! set. Scroll-style services that hand back one session id for every page
//! need it switched off with [`PaginatedFetcher::with_repeated_cursor_check`];
//! only the page ceiling applies then.

use super::SearchClient;
use crate::error::FetchError;
use crate::path::extract;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Items gathered by one pagination run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchSummary {
    /// All items, in arrival order
    pub items: Vec<Value>,
    /// Number of non-empty pages
    pub pages: usize,
}

/// Drives pagination for one job
pub struct PaginatedFetcher<'a> {
    client: &'a dyn SearchClient,
    max_pages: usize,
    reject_repeated_cursors: bool,
}

impl<'a> PaginatedFetcher<'a> {
    /// Create a fetcher that gives up after `max_pages` non-empty pages
    pub fn new(client: &'a dyn SearchClient, max_pages: usize) -> Self {
        Self {
            client,
            max_pages,
            reject_repeated_cursors: true,
        }
    }

    /// Enable or disable failing on a cursor that was already sent (default: enabled)
    pub fn with_repeated_cursor_check(mut self, enabled: bool) -> Self {
        self.reject_repeated_cursors = enabled;
        self
    }

    /// Fetch every page and return the accumulated items
    ///
    /// `item_path` and `cursor_path` are resolved against each response's data.
    /// A path that does not resolve means "no items" or "no cursor".
    pub async fn fetch_all(
        &self,
        query: &Value,
        variables: &Map<String, Value>,
        item_path: &str,
        cursor_path: &str,
    ) -> Result<FetchSummary, FetchError> {
        self.fetch_all_with(query, variables, item_path, cursor_path, |_, _, _| {})
            .await
    }

    /// Like [`fetch_all`](Self::fetch_all), calling `on_page(page, page_items, total)`
    /// after each non-empty page
    pub async fn fetch_all_with<F>(
        &self,
        query: &Value,
        variables: &Map<String, Value>,
        item_path: &str,
        cursor_path: &str,
        mut on_page: F,
    ) -> Result<FetchSummary, FetchError>
    where
        F: FnMut(usize, usize, usize),
    {
        let mut cursor: Option<Value> = None;
        let mut seen_cursors: HashSet<String> = HashSet::new();
        let mut summary = FetchSummary::default();

        loop {
            let page = summary.pages + 1;
            let request_variables = with_cursor(variables, cursor.as_ref());

            tracing::debug!(
                client = self.client.name(),
                page,
                cursor = ?cursor,
                "requesting page"
            );

            let data = self.client.execute(query, &request_variables).await?;

            let items = page_items(&data, item_path);
            if items.is_empty() {
                tracing::debug!(page, total = summary.items.len(), "empty page, pagination complete");
                break;
            }

            if summary.pages >= self.max_pages {
                return Err(FetchError::PageLimitExceeded {
                    limit: self.max_pages,
                });
            }

            let next_cursor = extract(&data, cursor_path).filter(|c| !c.is_null());

            summary.pages = page;
            let page_len = items.len();
            summary.items.extend(items);
            on_page(page, page_len, summary.items.len());

            tracing::debug!(page, items = page_len, total = summary.items.len(), "page fetched");

            match next_cursor {
                Some(next) => {
                    if let Some(current) = &cursor {
                        seen_cursors.insert(current.to_string());
                    }
                    let key = next.to_string();
                    if self.reject_repeated_cursors && seen_cursors.contains(&key) {
                        return Err(FetchError::CursorRepeated { page, cursor: key });
                    }
                    cursor = Some(next);
                }
                None => {
                    // Asking again without a cursor would restart at page one
                    tracing::warn!(
                        page,
                        cursor_path,
                        "non-empty page without a cursor, treating it as the last page"
                    );
                    break;
                }
            }
        }

        Ok(summary)
    }
}

/// Request variables for one page: the job's variables plus `cursor` once known
fn with_cursor(variables: &Map<String, Value>, cursor: Option<&Value>) -> Map<String, Value> {
    let mut merged = variables.clone();
    match cursor {
        Some(cursor) => {
            merged.insert("cursor".to_string(), cursor.clone());
        }
        None => {
            merged.remove("cursor");
        }
    }
    merged
}

/// Items located by `item_path`; anything that is not a list counts as empty
fn page_items(data: &Value, item_path: &str) -> Vec<Value> {
    match extract(data, item_path) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::warn!(
                item_path,
                kind = value_kind(&other),
                "item path does not point at a list, treating page as empty"
            );
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
