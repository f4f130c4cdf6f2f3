//! Pager layout for paged grids.

/// Pages shown on each side of the current one.
pub const PAGE_WINDOW: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerItem {
    Previous(usize),
    Page { index: usize, current: bool },
    Ellipsis,
    Next(usize),
}

/// What the pager shows after a page has been rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerModel {
    pub current: usize,
    /// Known only when the server sent a total count.
    pub page_count: Option<usize>,
    pub items: Vec<PagerItem>,
}

impl PagerModel {
    /// Lay out the pager for `current`, given the total count (if known),
    /// the page size and the number of rows that came back.
    pub fn build(
        current: usize,
        count: Option<u64>,
        limit: u64,
        rows_on_page: usize,
    ) -> Self {
        let limit = limit.max(1);
        let page_count = count.map(|c| c.div_ceil(limit) as usize);

        let has_next = match page_count {
            Some(n) => current + 1 < n,
            None => rows_on_page as u64 == limit,
        };

        let mut items = Vec::new();

        if current > 0 {
            items.push(PagerItem::Previous(current - 1));
        }

        if let Some(n) = page_count.filter(|n| *n > 1) {
            let last = n - 1;
            let low = current.saturating_sub(PAGE_WINDOW);
            let high = (current + PAGE_WINDOW).min(last);

            let mut previous: Option<usize> = None;
            for index in 0..n {
                let shown = index == 0 || index == last || (low..=high).contains(&index);
                if !shown {
                    continue;
                }
                if let Some(p) = previous {
                    if index > p + 1 {
                        items.push(PagerItem::Ellipsis);
                    }
                }
                items.push(PagerItem::Page {
                    index,
                    current: index == current,
                });
                previous = Some(index);
            }
        }

        if has_next {
            items.push(PagerItem::Next(current + 1));
        }

        Self {
            current,
            page_count,
            items,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.items.iter().any(|i| matches!(i, PagerItem::Previous(_)))
    }

    pub fn has_next(&self) -> bool {
        self.items.iter().any(|i| matches!(i, PagerItem::Next(_)))
    }

    /// Indices of the page links shown.
    pub fn page_links(&self) -> Vec<usize> {
        self.items
            .iter()
            .filter_map(|i| match i {
                PagerItem::Page { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// `Page 2 / 5`, or `Page 2` when the total is unknown.
    pub fn label(&self) -> String {
        match self.page_count {
            Some(n) if n > 0 => format!("Page {} / {}", self.current + 1, n),
            _ => format!("Page {}", self.current + 1),
        }
    }
}
