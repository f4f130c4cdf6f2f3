//! The grid controller: paging, sorting, filtering and infinite scroll for
//! one grid instance.
//!
//! The controller is a state machine without I/O. Each trigger that needs
//! data returns a [FetchRequest]; the host runs it through a
//! [crate::transport::Transport] (or anything else) and hands the outcome
//! back with [GridController::complete].
//!
//! A superseding trigger does not cancel older requests. With the default
//! [SupersedePolicy::LastResponseWins], every response is applied as it
//! arrives, so the grid shows whichever response resolved last.
//! [SupersedePolicy::DiscardSuperseded] only applies the response to the
//! newest request.

use std::collections::BTreeMap;

use evolugrid_common::envelope::{ResponseEnvelope, RowData};
use evolugrid_common::filter::{encode_filters, Filter};
use evolugrid_common::query::{strings, OutputFormat, SortOrder};
use serde_json::Value;
use url::Url;

use crate::config::{
    FilterSource, GridConfiguration, NavigationMode, RowEvent, RowEventKind,
    SupersedePolicy,
};
use crate::form::FilterForm;
use crate::host::{History, HistoryEntry, Navigator};
use crate::markup::Element;
use crate::pager::PagerModel;
use crate::render::{render_grid, resolve_columns, RenderInput, ResolvedColumn};
use crate::state::{GridPhase, Position, QueryState};
use crate::transport::{FetchKind, FetchRequest, TransportError};

/// A UI action, for hosts that route events by value.
#[derive(Debug, Clone, PartialEq)]
pub enum GridCommand {
    Init,
    Refresh {
        page: usize,
        filters: Option<Vec<Filter>>,
    },
    GoToPage(usize),
    NextPage,
    PreviousPage,
    Sort {
        key: String,
        order: SortOrder,
    },
    SortColumn {
        index: usize,
        order: SortOrder,
    },
    SubmitFilters,
    Scroll {
        viewport_bottom: f64,
        sentinel_top: f64,
    },
    ExportCsv,
    HistoryPop(HistoryEntry),
}

/// What is currently on display.
#[derive(Debug, Clone)]
pub struct GridView {
    pub columns: Vec<ResolvedColumn>,
    pub rows: Vec<RowData>,
    /// Total row count, for the configured count target.
    pub count: Option<u64>,
    pub additional_data: Value,
    pub pager: Option<PagerModel>,
    pub show_no_results: bool,
    pub show_no_more_results: bool,
    pub loading: bool,
    pub controls_enabled: bool,
}

impl Default for GridView {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            count: None,
            additional_data: Value::Null,
            pager: None,
            show_no_results: false,
            show_no_more_results: false,
            loading: false,
            controls_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    kind: FetchKind,
    page: usize,
    offset: u64,
}

pub struct GridController {
    config: GridConfiguration,
    state: QueryState,
    phase: GridPhase,
    view: GridView,
    rendered: bool,
    pending: BTreeMap<u64, PendingFetch>,
    /// Ticket of the latest fetch that started over from the first row.
    /// Scroll responses issued before it belong to a stale list.
    last_restart: u64,
    form: Option<Box<dyn FilterForm>>,
    history: Option<Box<dyn History>>,
    navigator: Option<Box<dyn Navigator>>,
}

impl GridController {
    pub fn new(config: GridConfiguration) -> Self {
        let state = QueryState::new(config.navigation.is_infinite());

        Self {
            config,
            state,
            phase: GridPhase::Idle,
            view: GridView::default(),
            rendered: false,
            pending: BTreeMap::new(),
            last_restart: 0,
            form: None,
            history: None,
            navigator: None,
        }
    }

    pub fn with_form(mut self, form: impl FilterForm + 'static) -> Self {
        self.form = Some(Box::new(form));
        self
    }

    pub fn with_history(mut self, history: impl History + 'static) -> Self {
        self.history = Some(Box::new(history));
        self
    }

    pub fn with_navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Some(Box::new(navigator));
        self
    }

    pub fn config(&self) -> &GridConfiguration {
        &self.config
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn phase(&self) -> GridPhase {
        self.phase
    }

    pub fn view(&self) -> &GridView {
        &self.view
    }

    pub fn form(&self) -> Option<&dyn FilterForm> {
        self.form.as_deref()
    }

    // =========================================================================

    /// Filters for the next fetch: an explicit list if given, otherwise the
    /// configured source.
    fn resolve_filters(&self, explicit: Option<Vec<Filter>>) -> Vec<Filter> {
        if let Some(f) = explicit {
            return f;
        }

        match &self.config.filter_source {
            FilterSource::None => Vec::new(),
            FilterSource::Static(list) => list.clone(),
            FilterSource::Callback(cb) => cb(),
            FilterSource::Form => self
                .form
                .as_ref()
                .map(|f| f.serialize())
                .unwrap_or_default(),
        }
    }

    fn request_url(&self, filters: &[Filter], offset: u64) -> Url {
        let mut url = self.config.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for f in filters {
                pairs.append_pair(&f.name, &f.value);
            }
            pairs.append_pair(strings::OFFSET, &offset.to_string());
            pairs.append_pair(strings::LIMIT, &self.config.limit.to_string());

            if self.state.is_sorted() {
                if let Some(key) = &self.state.sort_key {
                    pairs.append_pair(strings::SORT_KEY, key);
                }
                if let Some(order) = self.state.sort_order {
                    pairs.append_pair(strings::SORT_ORDER, order.as_str());
                }
            }
        }
        url
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        self.view.controls_enabled = enabled;
        if let Some(form) = &mut self.form {
            form.set_submit_enabled(enabled);
        }
    }

    fn issue(
        &mut self,
        kind: FetchKind,
        page: usize,
        offset: u64,
        filters: Vec<Filter>,
    ) -> FetchRequest {
        self.state.generation += 1;
        let ticket = self.state.generation;
        let url = self.request_url(&filters, offset);

        log::debug!("Issuing {kind:?} fetch #{ticket}: {url}");

        self.pending.insert(ticket, PendingFetch { kind, page, offset });
        self.state.in_flight = true;
        self.phase = GridPhase::Fetching;
        self.view.loading = true;
        self.set_controls_enabled(false);

        FetchRequest { ticket, url, kind }
    }

    /// Fetch from the first row, replacing what is on display.
    fn restart(&mut self, kind: FetchKind, filters: Vec<Filter>) -> FetchRequest {
        self.state.reset_position();
        let request = self.issue(kind, 0, 0, filters);
        self.last_restart = request.ticket;
        request
    }

    // =========================================================================

    /// Initial load. Nothing happens when load-on-init is off.
    pub fn init(&mut self) -> Option<FetchRequest> {
        if !self.config.load_on_init {
            return None;
        }

        let filters = self.resolve_filters(None);

        let page = match self.config.navigation {
            NavigationMode::Paged => self.config.load_on_init_page.unwrap_or(0),
            NavigationMode::InfiniteScroll { .. } => 0,
        };

        if page == 0 {
            return Some(self.restart(FetchKind::Initial, filters));
        }

        let offset = page as u64 * self.config.limit;
        Some(self.issue(FetchKind::Initial, page, offset, filters))
    }

    /// Load a page, with explicit filters if given. In infinite-scroll mode
    /// this reloads from the top.
    pub fn refresh(
        &mut self,
        page: usize,
        filters: Option<Vec<Filter>>,
    ) -> FetchRequest {
        let filters = self.resolve_filters(filters);

        match self.config.navigation {
            NavigationMode::Paged => {
                let offset = page as u64 * self.config.limit;
                self.issue(FetchKind::Page, page, offset, filters)
            }
            NavigationMode::InfiniteScroll { .. } => {
                self.restart(FetchKind::Page, filters)
            }
        }
    }

    pub fn go_to_page(&mut self, page: usize) -> FetchRequest {
        self.refresh(page, None)
    }

    /// Next page, if the pager offers one.
    pub fn next_page(&mut self) -> Option<FetchRequest> {
        let pager = self.view.pager.as_ref().filter(|p| p.has_next())?;
        let page = pager.current + 1;
        Some(self.go_to_page(page))
    }

    pub fn previous_page(&mut self) -> Option<FetchRequest> {
        let pager = self.view.pager.as_ref().filter(|p| p.has_previous())?;
        let page = pager.current - 1;
        Some(self.go_to_page(page))
    }

    /// Sort on a key and go back to the first row.
    pub fn sort(&mut self, key: impl Into<String>, order: SortOrder) -> FetchRequest {
        self.state.sort_key = Some(key.into());
        self.state.sort_order = Some(order);

        let filters = self.resolve_filters(None);
        self.restart(FetchKind::Sort, filters)
    }

    /// Sort on a displayed column, using its sort key when it has one.
    pub fn sort_by_column(
        &mut self,
        index: usize,
        order: SortOrder,
    ) -> Option<FetchRequest> {
        let descriptor = &self.view.columns.get(index)?.descriptor;
        if !descriptor.sortable {
            return None;
        }
        let key = descriptor.effective_sort_key().to_string();
        Some(self.sort(key, order))
    }

    /// Apply the current filters from the first row. Refused while a fetch
    /// is in flight.
    pub fn submit_filters(&mut self) -> Option<FetchRequest> {
        if self.state.in_flight {
            log::debug!("Filter submit ignored, a fetch is in flight");
            return None;
        }

        let filters = self.resolve_filters(None);

        if self.config.search_history {
            if let Some(history) = &mut self.history {
                history.push(HistoryEntry {
                    query_string: encode_filters(&filters),
                    filters: filters.clone(),
                });
            }
        }

        Some(self.restart(FetchKind::Filter, filters))
    }

    /// Go back to a search from the history, without pushing a new entry.
    pub fn on_history_pop(&mut self, entry: &HistoryEntry) -> FetchRequest {
        if self.config.search_history_auto_fill_form {
            if let Some(form) = &mut self.form {
                form.populate(&entry.filters);
            }
        }

        self.restart(FetchKind::HistoryRestore, entry.filters.clone())
    }

    /// Index of the row whose visibility triggers the next infinite-scroll
    /// fetch.
    pub fn scroll_sentinel(&self) -> Option<usize> {
        let distance = self.config.trigger_distance()?;
        if self.view.rows.is_empty() {
            return None;
        }
        Some(self.view.rows.len().saturating_sub(distance))
    }

    /// Report the scroll position: the bottom of the viewport and the top
    /// of the sentinel row, in the same coordinates.
    pub fn on_scroll(
        &mut self,
        viewport_bottom: f64,
        sentinel_top: f64,
    ) -> Option<FetchRequest> {
        if !self.config.navigation.is_infinite()
            || self.phase != GridPhase::Rendered
            || self.state.in_flight
            || self.state.end_of_data()
            || viewport_bottom < sentinel_top
        {
            return None;
        }

        let offset = self.state.offset(self.config.limit);
        let filters = self.resolve_filters(None);
        Some(self.issue(FetchKind::Scroll, 0, offset, filters))
    }

    /// URL of the CSV export for the current filters. The navigator, if
    /// any, is asked to open it. `None` when export is disabled.
    pub fn export_csv(&mut self) -> Option<Url> {
        if !self.config.export_csv {
            log::debug!("CSV export is disabled for this grid");
            return None;
        }

        let filters = self.resolve_filters(None);

        let mut url = self.config.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for f in &filters {
                pairs.append_pair(&f.name, &f.value);
            }
            pairs.append_pair(strings::OUTPUT, OutputFormat::Csv.as_str());
        }

        log::info!("Exporting grid to {url}");

        if let Some(nav) = &mut self.navigator {
            nav.open(&url);
        }
        Some(url)
    }

    /// Route a command to its operation.
    pub fn dispatch(&mut self, command: GridCommand) -> Option<FetchRequest> {
        match command {
            GridCommand::Init => self.init(),
            GridCommand::Refresh { page, filters } => Some(self.refresh(page, filters)),
            GridCommand::GoToPage(page) => Some(self.go_to_page(page)),
            GridCommand::NextPage => self.next_page(),
            GridCommand::PreviousPage => self.previous_page(),
            GridCommand::Sort { key, order } => Some(self.sort(key, order)),
            GridCommand::SortColumn { index, order } => {
                self.sort_by_column(index, order)
            }
            GridCommand::SubmitFilters => self.submit_filters(),
            GridCommand::Scroll {
                viewport_bottom,
                sentinel_top,
            } => self.on_scroll(viewport_bottom, sentinel_top),
            GridCommand::ExportCsv => {
                self.export_csv();
                None
            }
            GridCommand::HistoryPop(entry) => Some(self.on_history_pop(&entry)),
        }
    }

    // =========================================================================

    /// Report the outcome of a fetch. Returns true when the response was
    /// rendered.
    pub fn complete(
        &mut self,
        ticket: u64,
        result: Result<ResponseEnvelope, TransportError>,
    ) -> bool {
        let Some(pending) = self.pending.remove(&ticket) else {
            log::warn!("Ignoring response to unknown fetch #{ticket}");
            return false;
        };

        self.state.in_flight = !self.pending.is_empty();

        let superseded = ticket < self.state.generation;
        let stale_scroll =
            pending.kind == FetchKind::Scroll && ticket < self.last_restart;

        let applied = match result {
            Ok(_) if stale_scroll => {
                log::warn!("Dropping scroll response #{ticket} issued before a reload");
                false
            }
            Ok(_)
                if superseded
                    && self.config.supersede_policy
                        == SupersedePolicy::DiscardSuperseded =>
            {
                log::warn!("Discarding superseded response #{ticket}");
                false
            }
            Ok(envelope) => {
                self.apply(pending, envelope);
                true
            }
            Err(e) => {
                log::error!("Grid fetch #{ticket} failed: {e}");
                false
            }
        };

        if self.pending.is_empty() {
            self.view.loading = false;
            self.set_controls_enabled(true);
        }

        self.phase = if !self.pending.is_empty() {
            GridPhase::Fetching
        } else if self.rendered {
            GridPhase::Rendered
        } else {
            GridPhase::Idle
        };

        applied
    }

    fn apply(&mut self, pending: PendingFetch, envelope: ResponseEnvelope) {
        let limit = self.config.limit;
        let received = envelope.data.len();

        log::debug!(
            "Rendering {received} rows ({:?}), total {:?}",
            pending.kind,
            envelope.count
        );

        self.view.columns =
            resolve_columns(&self.config.columns, &envelope.descriptor.columns);
        self.view.count = envelope.count;
        self.view.additional_data = envelope.additional_data.clone();

        match self.config.navigation {
            NavigationMode::Paged => {
                self.state.position = Position::Page(pending.page);
                self.view.pager = Some(PagerModel::build(
                    pending.page,
                    envelope.count,
                    limit,
                    received,
                ));
                self.view.show_no_results = received == 0;
                self.view.rows = envelope.data.clone();
            }
            NavigationMode::InfiniteScroll { .. } => {
                if pending.kind.replaces_rows() {
                    self.view.rows = envelope.data.clone();
                } else {
                    self.view.rows.extend(envelope.data.iter().cloned());
                }

                let end_of_data = received == 0 || (received as u64) < limit;
                self.state.position = Position::Scroll {
                    offset: pending.offset + limit,
                    end_of_data,
                };
                self.view.pager = None;
                self.view.show_no_results = false;
                self.view.show_no_more_results = end_of_data;
            }
        }

        self.rendered = true;

        if let Some(cb) = &self.config.on_result_shown {
            cb(&envelope);
        }
    }

    /// Forward a row event to the click callback and matching listeners.
    /// Returns false when nothing handled it.
    pub fn dispatch_row_event(&self, row_index: usize, kind: RowEventKind) -> bool {
        let Some(row) = self.view.rows.get(row_index) else {
            return false;
        };

        let event = RowEvent { kind, row_index };
        let mut handled = false;

        if event.kind == RowEventKind::Click {
            if let Some(cb) = &self.config.on_row_click {
                cb(row, &event);
                handled = true;
            }
        }

        for l in self
            .config
            .row_event_listeners
            .iter()
            .filter(|l| l.kind == event.kind)
        {
            (l.callback)(row, &event);
            handled = true;
        }

        handled
    }

    /// Build the grid markup for the current view.
    pub fn render(&self) -> Element {
        render_grid(
            &self.config,
            RenderInput {
                columns: &self.view.columns,
                rows: &self.view.rows,
                pager: self.view.pager.as_ref(),
                show_no_results: self.view.show_no_results,
                show_no_more_results: self.view.show_no_more_results,
                loading: self.view.loading,
            },
        )
    }

    pub fn render_html(&self) -> String {
        self.render().to_html()
    }
}
