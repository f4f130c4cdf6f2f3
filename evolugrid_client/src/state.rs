//! Per-grid query state.

use evolugrid_common::query::SortOrder;

/// Where the grid currently is in the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Page(usize),
    Scroll { offset: u64, end_of_data: bool },
}

/// Lifecycle of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridPhase {
    /// Nothing rendered yet, nothing in flight.
    #[default]
    Idle,
    Fetching,
    Rendered,
}

/// Paging, sort and fetch bookkeeping for one grid instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub position: Position,
    pub sort_key: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub in_flight: bool,
    /// Incremented for every issued request.
    pub generation: u64,
}

impl QueryState {
    pub fn new(infinite: bool) -> Self {
        let position = if infinite {
            Position::Scroll {
                offset: 0,
                end_of_data: false,
            }
        } else {
            Position::Page(0)
        };

        Self {
            position,
            sort_key: None,
            sort_order: None,
            in_flight: false,
            generation: 0,
        }
    }

    /// Current page; zero in infinite mode.
    pub fn page(&self) -> usize {
        match self.position {
            Position::Page(p) => p,
            Position::Scroll { .. } => 0,
        }
    }

    pub fn end_of_data(&self) -> bool {
        matches!(self.position, Position::Scroll { end_of_data: true, .. })
    }

    /// Offset of the next request at the current position.
    pub fn offset(&self, limit: u64) -> u64 {
        match self.position {
            Position::Page(p) => p as u64 * limit,
            Position::Scroll { offset, .. } => offset,
        }
    }

    /// Back to the first row, forgetting any end-of-data marker.
    pub fn reset_position(&mut self) {
        self.position = match self.position {
            Position::Page(_) => Position::Page(0),
            Position::Scroll { .. } => Position::Scroll {
                offset: 0,
                end_of_data: false,
            },
        };
    }

    pub fn is_sorted(&self) -> bool {
        self.sort_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets() {
        let mut s = QueryState::new(false);
        s.position = Position::Page(3);
        assert_eq!(s.offset(25), 75);

        s.reset_position();
        assert_eq!(s.position, Position::Page(0));
    }

    #[test]
    fn reset_clears_end_of_data() {
        let mut s = QueryState::new(true);
        s.position = Position::Scroll {
            offset: 40,
            end_of_data: true,
        };
        assert!(s.end_of_data());

        s.reset_position();
        assert!(!s.end_of_data());
        assert_eq!(s.offset(20), 0);
    }
}
