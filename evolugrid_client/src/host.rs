//! Hooks into the environment hosting a grid: page navigation and the
//! browsing history.

use evolugrid_common::filter::Filter;
use url::Url;

/// Opens a URL outside of the grid, as a CSV download does.
pub trait Navigator {
    fn open(&mut self, url: &Url);
}

/// A search the user can come back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub filters: Vec<Filter>,
    /// Query string to show in the address bar, without the leading `?`.
    pub query_string: String,
}

/// Receives entries pushed by filter-driven fetches. Going back is
/// reported to the grid through
/// [crate::controller::GridController::on_history_pop].
pub trait History {
    fn push(&mut self, entry: HistoryEntry);
}
