use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::Result;
use crate::footer::sync;
use crate::model::{Row, SearchMode, Table};
use crate::template::Translations;

pub const DEFAULT_SEARCH_DELAY_MS: u64 = 300;

/// Compiles a case-insensitive matcher for `query`, or `None` for a blank
/// query (everything matches).
pub fn prepare_query(query: &str, mode: SearchMode) -> Result<Option<Regex>> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let source = match mode {
        SearchMode::Literal => regex::escape(trimmed),
        SearchMode::Pattern => trimmed.to_string(),
    };
    let matcher = RegexBuilder::new(&source).case_insensitive(true).build()?;
    Ok(Some(matcher))
}

/// Searchable text of a row: every cell that is neither hidden nor the
/// actions column, concatenated.
pub fn haystack(row: &Row) -> String {
    row.cells
        .iter()
        .filter(|cell| cell.searchable())
        .map(|cell| cell.text.as_str())
        .collect()
}

/// Client-side free-text filter for one table.
#[derive(Clone, Debug)]
pub struct QuickSearch {
    mode: SearchMode,
    query: String,
    matcher: Option<Regex>,
    cache: Option<HashMap<String, String>>,
}

impl QuickSearch {
    pub fn new(mode: SearchMode) -> Self {
        Self {
            mode,
            query: String::new(),
            matcher: None,
            cache: None,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Drops the cached row texts; the next search re-reads every row.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Sets a new query. A pattern that does not compile is matched as
    /// literal text instead.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.matcher = match prepare_query(query, self.mode) {
            Ok(matcher) => matcher,
            Err(err) => {
                warn!(%err, query, "search pattern rejected; matching literally");
                prepare_query(query, SearchMode::Literal).unwrap_or(None)
            }
        };
    }

    pub fn matches(&mut self, row: &Row) -> bool {
        let matcher = match &self.matcher {
            Some(matcher) => matcher,
            None => return true,
        };
        let cache = self.cache.get_or_insert_with(HashMap::new);
        let text = cache
            .entry(row.key.clone())
            .or_insert_with(|| haystack(row));
        matcher.is_match(text)
    }

    /// Hides rows that do not match, then re-syncs count, placeholder and
    /// striping. Returns the visible count.
    pub fn apply(&mut self, table: &mut Table, translations: &Translations) -> usize {
        for row in table.rows.iter_mut() {
            row.hidden = !self.matches(row);
        }
        sync(table, translations)
    }
}

/// Collapses a burst of keystrokes into a single search once input pauses.
#[derive(Clone, Debug)]
pub struct Debouncer {
    delay_ms: u64,
    pending: Option<(String, u64)>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn push(&mut self, value: impl Into<String>, now_ms: u64) {
        self.pending = Some((value.into(), now_ms));
    }

    /// The latest value once `delay_ms` has passed since the last keystroke.
    pub fn due(&mut self, now_ms: u64) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now_ms.saturating_sub(*at) >= self.delay_ms => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DELAY_MS)
    }
}
