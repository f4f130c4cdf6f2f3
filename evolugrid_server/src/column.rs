//! Server-side column definitions.
//!
//! A column knows how to turn a row into one cell value, and carries the
//! metadata the client needs to display it. Three render strategies are
//! provided:
//! - [KeyColumn] reads one field (or accessor path) of the row, optionally
//!   passing it through a [Formatter];
//! - [RowFormatterColumn] transforms the whole row with a [RowFormatter] and
//!   reads one key of the result;
//! - [TemplateColumn] interpolates row fields into a template on the server.
//!
//! [HtmlColumn] sends no cell data at all; the client builds the cell from a
//! template carried in the descriptor.

use std::sync::Arc;

use evolugrid_common::envelope::ColumnDescriptor;
use evolugrid_common::value_tools::{
    escape_html, interpolate, lookup_path, scalar_text,
};
use serde_json::Value;

/// A boolean gate on column visibility.
pub trait Condition: Send + Sync {
    fn is_ok(&self) -> bool;
}

impl Condition for bool {
    fn is_ok(&self) -> bool {
        *self
    }
}

impl<F> Condition for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_ok(&self) -> bool {
        (self)()
    }
}

/// Maps a raw cell value to a display value.
pub trait Formatter: Send + Sync {
    fn format(&self, value: Value) -> Value;
}

impl<F> Formatter for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn format(&self, value: Value) -> Value {
        (self)(value)
    }
}

/// Transforms an entire row into a new row.
pub trait RowFormatter: Send + Sync {
    fn format_row(&self, row: &Value) -> Value;
}

impl<F> RowFormatter for F
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn format_row(&self, row: &Value) -> Value {
        (self)(row)
    }
}

// =============================================================================

/// Settings shared by every column type.
#[derive(Clone, Default)]
pub struct ColumnOptions {
    pub sortable: bool,
    pub sort_key: Option<String>,
    pub width: Option<String>,
    pub css_class: Option<String>,
    pub display_condition: Option<Arc<dyn Condition>>,
    /// Overrides whether the column is part of the JSON payload.
    pub display: Option<bool>,
    /// Overrides whether the column is part of the CSV export.
    pub export: Option<bool>,
}

impl std::fmt::Debug for ColumnOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnOptions")
            .field("sortable", &self.sortable)
            .field("sort_key", &self.sort_key)
            .field("width", &self.width)
            .field("css_class", &self.css_class)
            .field("display_condition", &self.display_condition.is_some())
            .field("display", &self.display)
            .field("export", &self.export)
            .finish()
    }
}

/// A column of a grid.
pub trait Column: Send + Sync {
    fn options(&self) -> &ColumnOptions;

    /// Title displayed in the header.
    fn title(&self) -> String;

    /// Cell value for the given row.
    fn render(&self, row: &Value) -> Value;

    fn is_escape_html(&self) -> bool {
        true
    }

    fn is_sortable(&self) -> bool {
        self.options().sortable
    }

    fn sort_key(&self) -> Option<String> {
        self.options().sort_key.clone()
    }

    fn width(&self) -> Option<String> {
        self.options().width.clone()
    }

    fn css_class(&self) -> Option<String> {
        self.options().css_class.clone()
    }

    /// True when the display condition is not met.
    fn is_hidden(&self) -> bool {
        self.options()
            .display_condition
            .as_ref()
            .map(|c| !c.is_ok())
            .unwrap_or(false)
    }

    fn is_displayed(&self) -> bool {
        self.options().display.unwrap_or(true)
    }

    /// Raw-HTML columns are not exported unless asked for.
    fn is_exported(&self) -> bool {
        self.options().export.unwrap_or_else(|| self.is_escape_html())
    }

    /// Template the client should use to build the cell itself.
    fn client_template(&self) -> Option<String> {
        None
    }

    /// Build the descriptor sent to the client for this column.
    fn descriptor(&self, display: String) -> ColumnDescriptor {
        ColumnDescriptor {
            title: self.title(),
            sortable: self.is_sortable(),
            sort_key: self.sort_key(),
            css_class: self.css_class(),
            width: self.width(),
            display,
            escape_html: self.is_escape_html(),
            jsdisplay: self.client_template(),
        }
    }
}

/// Chained setters for the shared column options.
pub trait ColumnBuilder: Sized {
    fn options_mut(&mut self) -> &mut ColumnOptions;

    fn sortable(mut self, sortable: bool) -> Self {
        self.options_mut().sortable = sortable;
        self
    }

    fn sort_key(mut self, key: impl Into<String>) -> Self {
        self.options_mut().sort_key = Some(key.into());
        self
    }

    fn width(mut self, width: impl Into<String>) -> Self {
        self.options_mut().width = Some(width.into());
        self
    }

    fn css_class(mut self, class: impl Into<String>) -> Self {
        self.options_mut().css_class = Some(class.into());
        self
    }

    fn display_condition(mut self, condition: impl Condition + 'static) -> Self {
        self.options_mut().display_condition = Some(Arc::new(condition));
        self
    }

    fn display(mut self, display: bool) -> Self {
        self.options_mut().display = Some(display);
        self
    }

    fn export(mut self, export: bool) -> Self {
        self.options_mut().export = Some(export);
        self
    }

    fn boxed(self) -> Box<dyn Column>
    where
        Self: Column + 'static,
    {
        Box::new(self)
    }
}

// =============================================================================

/// A column that renders one key of the row.
#[derive(Clone)]
pub struct KeyColumn {
    title: String,
    key: String,
    escape_html: bool,
    formatter: Option<Arc<dyn Formatter>>,
    options: ColumnOptions,
}

impl KeyColumn {
    /// `key` may be a plain field name or an accessor path such as
    /// `customer.name` or `lines[0].amount`.
    pub fn new(title: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            key: key.into(),
            escape_html: true,
            formatter: None,
            options: ColumnOptions::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn escape_html(mut self, escape: bool) -> Self {
        self.escape_html = escape;
        self
    }

    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }
}

impl ColumnBuilder for KeyColumn {
    fn options_mut(&mut self) -> &mut ColumnOptions {
        &mut self.options
    }
}

impl Column for KeyColumn {
    fn options(&self) -> &ColumnOptions {
        &self.options
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn render(&self, row: &Value) -> Value {
        let value = lookup_path(row, &self.key).cloned().unwrap_or(Value::Null);

        match &self.formatter {
            Some(f) => f.format(value),
            None => value,
        }
    }

    fn is_escape_html(&self) -> bool {
        self.escape_html
    }

    fn sort_key(&self) -> Option<String> {
        Some(
            self.options
                .sort_key
                .clone()
                .unwrap_or_else(|| self.key.clone()),
        )
    }
}

// =============================================================================

/// A column that reshapes the whole row, then reads one key of the result.
#[derive(Clone)]
pub struct RowFormatterColumn {
    title: String,
    key: String,
    escape_html: bool,
    formatter: Arc<dyn RowFormatter>,
    options: ColumnOptions,
}

impl RowFormatterColumn {
    pub fn new(
        title: impl Into<String>,
        key: impl Into<String>,
        formatter: impl RowFormatter + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            key: key.into(),
            escape_html: true,
            formatter: Arc::new(formatter),
            options: ColumnOptions::default(),
        }
    }

    pub fn escape_html(mut self, escape: bool) -> Self {
        self.escape_html = escape;
        self
    }
}

impl ColumnBuilder for RowFormatterColumn {
    fn options_mut(&mut self) -> &mut ColumnOptions {
        &mut self.options
    }
}

impl Column for RowFormatterColumn {
    fn options(&self) -> &ColumnOptions {
        &self.options
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn render(&self, row: &Value) -> Value {
        let formatted = self.formatter.format_row(row);
        lookup_path(&formatted, &self.key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn is_escape_html(&self) -> bool {
        self.escape_html
    }
}

// =============================================================================

/// A column rendered from a template such as
/// `<a href="/show?id={{ id }}">{{ name }}</a>`.
///
/// Interpolated values are HTML-escaped; the template itself is sent as
/// markup. Not exported to CSV unless asked for.
#[derive(Clone)]
pub struct TemplateColumn {
    title: String,
    template: String,
    options: ColumnOptions,
}

impl TemplateColumn {
    pub fn new(title: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            template: template.into(),
            options: ColumnOptions::default(),
        }
    }
}

impl ColumnBuilder for TemplateColumn {
    fn options_mut(&mut self) -> &mut ColumnOptions {
        &mut self.options
    }
}

impl Column for TemplateColumn {
    fn options(&self) -> &ColumnOptions {
        &self.options
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn render(&self, row: &Value) -> Value {
        Value::String(interpolate(&self.template, |k| {
            lookup_path(row, k).map(|v| escape_html(&scalar_text(v)))
        }))
    }

    fn is_escape_html(&self) -> bool {
        false
    }

    fn is_exported(&self) -> bool {
        self.options.export.unwrap_or(false)
    }
}

// =============================================================================

/// A column whose cells are built by the client from a `{field}` template.
///
/// The serializer sends the fields the template names along with each row,
/// next to the positional cell values. Sortable only when given a sort key.
#[derive(Clone)]
pub struct HtmlColumn {
    title: String,
    template: String,
    options: ColumnOptions,
}

impl HtmlColumn {
    pub fn new(title: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            template: template.into(),
            options: ColumnOptions::default(),
        }
    }
}

impl ColumnBuilder for HtmlColumn {
    fn options_mut(&mut self) -> &mut ColumnOptions {
        &mut self.options
    }
}

impl Column for HtmlColumn {
    fn options(&self) -> &ColumnOptions {
        &self.options
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn render(&self, _row: &Value) -> Value {
        Value::Null
    }

    fn is_escape_html(&self) -> bool {
        false
    }

    fn is_sortable(&self) -> bool {
        self.options.sort_key.is_some()
    }

    fn is_exported(&self) -> bool {
        self.options.export.unwrap_or(false)
    }

    fn client_template(&self) -> Option<String> {
        Some(self.template.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::json;

    use super::*;

    #[test]
    fn key_column_reads_paths_and_formats() {
        let col = KeyColumn::new("Amount", "lines[0].amount")
            .formatter(|v: Value| json!(format!("{} €", scalar_text(&v))));

        let row = json!({"lines": [{"amount": 12}]});

        assert_eq!(col.render(&row), json!("12 €"));
        assert_eq!(Column::sort_key(&col).as_deref(), Some("lines[0].amount"));
    }

    #[test]
    fn missing_field_renders_empty() {
        let col = KeyColumn::new("Name", "name");

        assert_eq!(col.render(&json!({"id": 1})), Value::Null);
    }

    #[test]
    fn distinct_sort_key_wins() {
        let col = KeyColumn::new("Name", "display_name")
            .sortable(true)
            .sort_key("last_name");

        let d = col.descriptor("col0".into());

        assert!(d.sortable);
        assert_eq!(d.sort_key.as_deref(), Some("last_name"));
    }

    #[test]
    fn export_defaults_follow_escaping() {
        let escaped = KeyColumn::new("A", "a");
        let raw = KeyColumn::new("B", "b").escape_html(false);
        let raw_forced = KeyColumn::new("C", "c").escape_html(false).export(true);
        let template = TemplateColumn::new("D", "{{ d }}");

        assert!(escaped.is_exported());
        assert!(!raw.is_exported());
        assert!(raw_forced.is_exported());
        assert!(!template.is_exported());
    }

    #[test]
    fn display_and_export_are_independent() {
        let col = KeyColumn::new("A", "a").display(false).export(true);

        assert!(!col.is_displayed());
        assert!(col.is_exported());
    }

    #[test]
    fn condition_hides_column() {
        static ALLOWED: AtomicBool = AtomicBool::new(false);

        let col = KeyColumn::new("Secret", "secret")
            .display_condition(|| ALLOWED.load(Ordering::SeqCst));

        assert!(col.is_hidden());
        ALLOWED.store(true, Ordering::SeqCst);
        assert!(!col.is_hidden());
    }

    #[test]
    fn template_column_escapes_values() {
        let col =
            TemplateColumn::new("Link", "<a href='/c/{{ id }}'>{{ name }}</a>");

        assert_eq!(
            col.render(&json!({"id": 3, "name": "<Ann>"})),
            json!("<a href='/c/3'>&lt;Ann&gt;</a>")
        );
        assert!(!col.is_escape_html());
    }

    #[test]
    fn row_formatter_column() {
        let col = RowFormatterColumn::new("Full name", "full", |row: &Value| {
            json!({
                "full": format!(
                    "{} {}",
                    scalar_text(&row["first"]),
                    scalar_text(&row["last"])
                )
            })
        });

        assert_eq!(
            col.render(&json!({"first": "Grace", "last": "Hopper"})),
            json!("Grace Hopper")
        );
    }

    #[test]
    fn html_column_ships_template() {
        let col = HtmlColumn::new("Edit", "<a href='edit?id={id}'>edit</a>");

        assert!(!col.is_sortable());
        let d = col.descriptor("col2".into());
        assert_eq!(d.jsdisplay.as_deref(), Some("<a href='edit?id={id}'>edit</a>"));
        assert!(!d.escape_html);

        let col = col.sort_key("id");
        assert!(col.is_sortable());
    }
}
