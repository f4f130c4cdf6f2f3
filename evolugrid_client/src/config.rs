//! Grid configuration.
//!
//! A [GridConfiguration] is assembled with [GridConfiguration::builder] and
//! never changes afterwards:
//!
//! ```
//! use evolugrid_client::config::{GridConfiguration, NavigationMode};
//!
//! let config = GridConfiguration::builder("http://localhost:8080/grid")
//!     .limit(20)
//!     .navigation(NavigationMode::infinite_scroll())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.limit, 20);
//! ```

use std::fmt;
use std::sync::Arc;

use evolugrid_common::envelope::{ResponseEnvelope, RowData};
use evolugrid_common::filter::Filter;
use url::Url;

use crate::render::CellRenderer;

pub const DEFAULT_LIMIT: u64 = 100;
pub const DEFAULT_TRIGGER_DISTANCE: usize = 5;
pub const DEFAULT_NO_MORE_RESULTS: &str = "> No more results <";
pub const DEFAULT_COUNT_TARGET: &str = "#count";
pub const DEFAULT_CHEVRON_UP: &str = "icon-chevron-up";
pub const DEFAULT_CHEVRON_DOWN: &str = "icon-chevron-down";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Infinite scroll trigger distance must be at least one row")]
    InvalidTriggerDistance,
}

/// How the user moves through results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationMode {
    #[default]
    Paged,
    /// Append rows as the user scrolls. A fetch fires once the row
    /// `trigger_distance` rows from the end becomes visible.
    InfiniteScroll { trigger_distance: usize },
}

impl NavigationMode {
    pub fn infinite_scroll() -> Self {
        NavigationMode::InfiniteScroll {
            trigger_distance: DEFAULT_TRIGGER_DISTANCE,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, NavigationMode::InfiniteScroll { .. })
    }
}

/// What to do with a response when a newer request has been issued since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupersedePolicy {
    /// Apply every response as it arrives; the last one to arrive wins.
    #[default]
    LastResponseWins,
    /// Only apply the response to the most recent request.
    DiscardSuperseded,
}

pub type FilterCallback = Arc<dyn Fn() -> Vec<Filter> + Send + Sync>;

/// Where the filters sent with each fetch come from.
#[derive(Clone, Default)]
pub enum FilterSource {
    #[default]
    None,
    Static(Vec<Filter>),
    Callback(FilterCallback),
    /// Serialize the form attached to the controller.
    Form,
}

impl fmt::Debug for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Static(list) => f.debug_tuple("Static").field(list).finish(),
            Self::Callback(_) => write!(f, "Callback"),
            Self::Form => write!(f, "Form"),
        }
    }
}

/// Kind of UI event a row listener reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowEventKind {
    Click,
    DoubleClick,
    Hover,
    Other(String),
}

impl From<&str> for RowEventKind {
    fn from(value: &str) -> Self {
        match value {
            "click" => Self::Click,
            "dblclick" => Self::DoubleClick,
            "hover" | "mouseover" => Self::Hover,
            other => Self::Other(other.to_string()),
        }
    }
}

/// An event on a rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowEvent {
    pub kind: RowEventKind,
    pub row_index: usize,
}

pub type RowCallback = Arc<dyn Fn(&RowData, &RowEvent) + Send + Sync>;
pub type ResultCallback = Arc<dyn Fn(&ResponseEnvelope) + Send + Sync>;

/// A named listener attached to every row.
#[derive(Clone)]
pub struct RowEventListener {
    pub kind: RowEventKind,
    pub callback: RowCallback,
}

impl RowEventListener {
    pub fn new(
        kind: impl Into<RowEventKind>,
        callback: impl Fn(&RowData, &RowEvent) + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: kind.into(),
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for RowEventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowEventListener")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Client-side column settings.
///
/// These are merged position by position with the columns the server
/// describes. Whatever the server sends wins; these fill the gaps, and the
/// custom renderer only exists on this side.
#[derive(Clone, Default)]
pub struct ColumnConfig {
    pub title: Option<String>,
    pub display: Option<String>,
    pub renderer: Option<Arc<dyn CellRenderer>>,
    pub sortable: Option<bool>,
    pub sort_key: Option<String>,
    pub css_class: Option<String>,
    pub width: Option<String>,
    pub escape_html: Option<bool>,
}

impl ColumnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn display(mut self, key: impl Into<String>) -> Self {
        self.display = Some(key.into());
        self
    }

    pub fn renderer(mut self, renderer: impl CellRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = Some(sortable);
        self
    }

    pub fn sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    pub fn css_class(mut self, class: impl Into<String>) -> Self {
        self.css_class = Some(class.into());
        self
    }

    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn escape_html(mut self, escape: bool) -> Self {
        self.escape_html = Some(escape);
        self
    }
}

impl fmt::Debug for ColumnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnConfig")
            .field("title", &self.title)
            .field("display", &self.display)
            .field("renderer", &self.renderer.is_some())
            .field("sortable", &self.sortable)
            .field("sort_key", &self.sort_key)
            .field("css_class", &self.css_class)
            .field("width", &self.width)
            .field("escape_html", &self.escape_html)
            .finish()
    }
}

/// Immutable settings of one grid instance.
#[derive(Clone)]
pub struct GridConfiguration {
    pub endpoint: Url,
    pub limit: u64,
    pub columns: Vec<ColumnConfig>,
    pub navigation: NavigationMode,
    pub fixed_header: bool,
    pub export_csv: bool,
    pub on_row_click: Option<RowCallback>,
    pub row_event_listeners: Vec<RowEventListener>,
    pub on_result_shown: Option<ResultCallback>,
    /// Row field whose value becomes the class of the `tr`.
    pub row_css_class: Option<String>,
    pub filter_source: FilterSource,
    pub no_results_message: Option<String>,
    pub no_more_results_message: String,
    pub search_history: bool,
    pub search_history_auto_fill_form: bool,
    pub load_on_init: bool,
    pub load_on_init_page: Option<usize>,
    pub table_classes: String,
    pub pager_id: Option<String>,
    pub chevron_up_class: String,
    pub chevron_down_class: String,
    /// Where the host should display the total row count.
    pub count_target: String,
    pub supersede_policy: SupersedePolicy,
}

impl fmt::Debug for GridConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridConfiguration")
            .field("endpoint", &self.endpoint.as_str())
            .field("limit", &self.limit)
            .field("columns", &self.columns)
            .field("navigation", &self.navigation)
            .field("filter_source", &self.filter_source)
            .field("supersede_policy", &self.supersede_policy)
            .finish_non_exhaustive()
    }
}

impl GridConfiguration {
    pub fn builder(endpoint: impl Into<String>) -> GridConfigurationBuilder {
        GridConfigurationBuilder::new(endpoint.into())
    }

    pub fn trigger_distance(&self) -> Option<usize> {
        match self.navigation {
            NavigationMode::Paged => None,
            NavigationMode::InfiniteScroll { trigger_distance } => {
                Some(trigger_distance)
            }
        }
    }
}

/// Builder for [GridConfiguration]
pub struct GridConfigurationBuilder {
    endpoint: String,
    limit: Option<u64>,
    config: PartialConfig,
}

// Everything but the endpoint and limit, which need validation.
struct PartialConfig {
    columns: Vec<ColumnConfig>,
    navigation: NavigationMode,
    fixed_header: bool,
    export_csv: bool,
    on_row_click: Option<RowCallback>,
    row_event_listeners: Vec<RowEventListener>,
    on_result_shown: Option<ResultCallback>,
    row_css_class: Option<String>,
    filter_source: FilterSource,
    no_results_message: Option<String>,
    no_more_results_message: String,
    search_history: bool,
    search_history_auto_fill_form: bool,
    load_on_init: bool,
    load_on_init_page: Option<usize>,
    table_classes: String,
    pager_id: Option<String>,
    chevron_up_class: String,
    chevron_down_class: String,
    count_target: String,
    supersede_policy: SupersedePolicy,
}

impl GridConfigurationBuilder {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            limit: None,
            config: PartialConfig {
                columns: Vec::new(),
                navigation: NavigationMode::default(),
                fixed_header: false,
                export_csv: false,
                on_row_click: None,
                row_event_listeners: Vec::new(),
                on_result_shown: None,
                row_css_class: None,
                filter_source: FilterSource::default(),
                no_results_message: None,
                no_more_results_message: DEFAULT_NO_MORE_RESULTS.to_string(),
                search_history: false,
                search_history_auto_fill_form: false,
                load_on_init: true,
                load_on_init_page: None,
                table_classes: "table".to_string(),
                pager_id: None,
                chevron_up_class: DEFAULT_CHEVRON_UP.to_string(),
                chevron_down_class: DEFAULT_CHEVRON_DOWN.to_string(),
                count_target: DEFAULT_COUNT_TARGET.to_string(),
                supersede_policy: SupersedePolicy::default(),
            },
        }
    }

    /// Rows per page. Zero means the default of 100.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn column(mut self, column: ColumnConfig) -> Self {
        self.config.columns.push(column);
        self
    }

    pub fn navigation(mut self, mode: NavigationMode) -> Self {
        self.config.navigation = mode;
        self
    }

    pub fn fixed_header(mut self, fixed: bool) -> Self {
        self.config.fixed_header = fixed;
        self
    }

    pub fn export_csv(mut self, export: bool) -> Self {
        self.config.export_csv = export;
        self
    }

    pub fn on_row_click(
        mut self,
        callback: impl Fn(&RowData, &RowEvent) + Send + Sync + 'static,
    ) -> Self {
        self.config.on_row_click = Some(Arc::new(callback));
        self
    }

    pub fn row_event_listener(mut self, listener: RowEventListener) -> Self {
        self.config.row_event_listeners.push(listener);
        self
    }

    pub fn on_result_shown(
        mut self,
        callback: impl Fn(&ResponseEnvelope) + Send + Sync + 'static,
    ) -> Self {
        self.config.on_result_shown = Some(Arc::new(callback));
        self
    }

    pub fn row_css_class(mut self, field: impl Into<String>) -> Self {
        self.config.row_css_class = Some(field.into());
        self
    }

    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.config.filter_source = FilterSource::Static(filters);
        self
    }

    pub fn filter_callback(
        mut self,
        callback: impl Fn() -> Vec<Filter> + Send + Sync + 'static,
    ) -> Self {
        self.config.filter_source = FilterSource::Callback(Arc::new(callback));
        self
    }

    pub fn filter_form(mut self) -> Self {
        self.config.filter_source = FilterSource::Form;
        self
    }

    pub fn no_results_message(mut self, message: impl Into<String>) -> Self {
        self.config.no_results_message = Some(message.into());
        self
    }

    pub fn no_more_results_message(mut self, message: impl Into<String>) -> Self {
        self.config.no_more_results_message = message.into();
        self
    }

    pub fn search_history(mut self, enabled: bool, auto_fill_form: bool) -> Self {
        self.config.search_history = enabled;
        self.config.search_history_auto_fill_form = auto_fill_form;
        self
    }

    pub fn load_on_init(mut self, load: bool) -> Self {
        self.config.load_on_init = load;
        self
    }

    pub fn load_on_init_page(mut self, page: usize) -> Self {
        self.config.load_on_init_page = Some(page);
        self
    }

    pub fn table_classes(mut self, classes: impl Into<String>) -> Self {
        self.config.table_classes = classes.into();
        self
    }

    pub fn pager_id(mut self, id: impl Into<String>) -> Self {
        self.config.pager_id = Some(id.into());
        self
    }

    pub fn chevron_classes(
        mut self,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        self.config.chevron_up_class = up.into();
        self.config.chevron_down_class = down.into();
        self
    }

    pub fn count_target(mut self, target: impl Into<String>) -> Self {
        self.config.count_target = target.into();
        self
    }

    pub fn supersede_policy(mut self, policy: SupersedePolicy) -> Self {
        self.config.supersede_policy = policy;
        self
    }

    pub fn build(self) -> Result<GridConfiguration, ConfigError> {
        let endpoint = Url::parse(&self.endpoint)?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(
                endpoint.scheme().to_string(),
            ));
        }

        if let NavigationMode::InfiniteScroll { trigger_distance: 0 } =
            self.config.navigation
        {
            return Err(ConfigError::InvalidTriggerDistance);
        }

        let limit = match self.limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(l) => l,
        };

        let c = self.config;

        Ok(GridConfiguration {
            endpoint,
            limit,
            columns: c.columns,
            navigation: c.navigation,
            fixed_header: c.fixed_header,
            export_csv: c.export_csv,
            on_row_click: c.on_row_click,
            row_event_listeners: c.row_event_listeners,
            on_result_shown: c.on_result_shown,
            row_css_class: c.row_css_class,
            filter_source: c.filter_source,
            no_results_message: c.no_results_message,
            no_more_results_message: c.no_more_results_message,
            search_history: c.search_history,
            search_history_auto_fill_form: c.search_history_auto_fill_form,
            load_on_init: c.load_on_init,
            load_on_init_page: c.load_on_init_page,
            table_classes: c.table_classes,
            pager_id: c.pager_id,
            chevron_up_class: c.chevron_up_class,
            chevron_down_class: c.chevron_down_class,
            count_target: c.count_target,
            supersede_policy: c.supersede_policy,
        })
    }
}
