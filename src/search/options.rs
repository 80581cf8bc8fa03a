//! Indexing options

use crate::search::flatten::DEFAULT_MAX_DEPTH;
use crate::search::record::{FieldSelector, LanguageTextSelector};
use std::sync::Arc;
use std::time::Duration;

/// Commit-within window passed along with writes (5 seconds)
pub const DEFAULT_COMMIT_WITHIN: Duration = Duration::from_millis(5000);

/// Options for a [`SearchIndex`](crate::search::SearchIndex)
#[derive(Clone)]
pub struct SearchIndexOptions {
    /// Maximum nesting depth accepted by the flattener
    pub max_depth: usize,

    /// How soon the backend should make writes visible
    pub commit_within: Duration,

    /// Policy deciding which leaves are searchable
    pub field_selector: Arc<dyn FieldSelector>,
}

impl Default for SearchIndexOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            commit_within: DEFAULT_COMMIT_WITHIN,
            field_selector: Arc::new(LanguageTextSelector),
        }
    }
}

impl std::fmt::Debug for SearchIndexOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndexOptions")
            .field("max_depth", &self.max_depth)
            .field("commit_within", &self.commit_within)
            .finish_non_exhaustive()
    }
}

/// Builder for SearchIndexOptions
pub struct SearchIndexOptionsBuilder {
    options: SearchIndexOptions,
}

impl SearchIndexOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: SearchIndexOptions::default(),
        }
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    pub fn commit_within(mut self, window: Duration) -> Self {
        self.options.commit_within = window;
        self
    }

    pub fn field_selector(mut self, selector: Arc<dyn FieldSelector>) -> Self {
        self.options.field_selector = selector;
        self
    }

    pub fn build(self) -> SearchIndexOptions {
        self.options
    }
}

impl Default for SearchIndexOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
