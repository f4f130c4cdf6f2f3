//! Build grid markup from the current view.

use std::fmt;
use std::sync::Arc;

use evolugrid_common::envelope::{ColumnDescriptor, RowData};
use evolugrid_common::query::SortOrder;
use evolugrid_common::value_tools::{display_text, escape_html, interpolate, lookup_path};
use serde_json::Value;

use crate::config::{ColumnConfig, GridConfiguration};
use crate::markup::{Element, Node};
use crate::pager::{PagerItem, PagerModel};

/// Produces the markup of one cell from a row.
pub trait CellRenderer: Send + Sync {
    fn render(&self, row: &RowData) -> String;
}

impl<F> CellRenderer for F
where
    F: Fn(&RowData) -> String + Send + Sync,
{
    fn render(&self, row: &RowData) -> String {
        (self)(row)
    }
}

/// A column as the grid displays it: the server's descriptor merged with
/// the client's settings.
#[derive(Clone)]
pub struct ResolvedColumn {
    pub descriptor: ColumnDescriptor,
    pub renderer: Option<Arc<dyn CellRenderer>>,
}

impl fmt::Debug for ResolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedColumn")
            .field("descriptor", &self.descriptor)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

fn from_config(c: &ColumnConfig) -> ColumnDescriptor {
    ColumnDescriptor {
        title: c.title.clone().unwrap_or_default(),
        sortable: c.sortable.unwrap_or(false),
        sort_key: c.sort_key.clone(),
        css_class: c.css_class.clone(),
        width: c.width.clone(),
        display: c.display.clone().unwrap_or_default(),
        escape_html: c.escape_html.unwrap_or(true),
        jsdisplay: None,
    }
}

/// Merge client column settings with the server descriptor, by position.
pub fn resolve_columns(
    config: &[ColumnConfig],
    server: &[ColumnDescriptor],
) -> Vec<ResolvedColumn> {
    let len = config.len().max(server.len());

    (0..len)
        .map(|i| {
            let client = config.get(i);
            let descriptor = match (server.get(i), client) {
                (Some(d), Some(c)) => {
                    let mut d = d.clone();
                    if d.title.is_empty() {
                        d.title = c.title.clone().unwrap_or_default();
                    }
                    if d.display.is_empty() {
                        d.display = c.display.clone().unwrap_or_default();
                    }
                    d.sort_key = d.sort_key.or_else(|| c.sort_key.clone());
                    d.css_class = d.css_class.or_else(|| c.css_class.clone());
                    d.width = d.width.or_else(|| c.width.clone());
                    d
                }
                (Some(d), None) => d.clone(),
                (None, Some(c)) => from_config(c),
                (None, None) => ColumnDescriptor::default(),
            };

            ResolvedColumn {
                descriptor,
                renderer: client.and_then(|c| c.renderer.clone()),
            }
        })
        .collect()
}

/// Content of one cell, or `None` when the cell stays empty.
///
/// A `jsdisplay` template comes first, then a custom renderer, then the
/// value under the display key. Template and renderer output is markup;
/// plain values are text unless the column opts out of escaping.
pub fn render_cell(column: &ResolvedColumn, row: &RowData) -> Option<Node> {
    if let Some(template) = &column.descriptor.jsdisplay {
        let row_value = Value::Object(row.clone());
        let html = interpolate(template, |k| {
            lookup_path(&row_value, k)
                .and_then(display_text)
                .map(|t| escape_html(&t))
        });
        return Some(html).filter(|h| !h.is_empty()).map(Node::Raw);
    }

    if let Some(renderer) = &column.renderer {
        return Some(renderer.render(row))
            .filter(|h| !h.is_empty())
            .map(Node::Raw);
    }

    let display = &column.descriptor.display;
    if display.is_empty() {
        return None;
    }

    let text = row.get(display).and_then(display_text)?;

    Some(if column.descriptor.escape_html {
        Node::Text(text)
    } else {
        Node::Raw(text)
    })
}

fn sort_button(config: &GridConfiguration, key: &str, order: SortOrder) -> Element {
    let icon = match order {
        SortOrder::Asc => &config.chevron_up_class,
        SortOrder::Desc => &config.chevron_down_class,
    };

    Element::new("a")
        .attr("href", "#")
        .class(&format!("sort-{order}"))
        .attr("data-sort-key", key)
        .attr("data-sort-order", order.as_str())
        .child(Element::new("i").class(icon))
}

fn render_header(config: &GridConfiguration, columns: &[ResolvedColumn]) -> Element {
    let mut tr = Element::new("tr");

    for (index, c) in columns.iter().enumerate() {
        let d = &c.descriptor;
        let mut th = Element::new("th")
            .attr("data-column", index.to_string())
            .text(d.title.clone());

        if let Some(w) = d.width.as_deref().filter(|w| !w.is_empty()) {
            th.set_attr("style", format!("width: {w}"));
        }

        if d.sortable {
            let key = d.effective_sort_key();
            th.push(Node::Text(" ".to_string()));
            th.push(sort_button(config, key, SortOrder::Asc));
            th.push(Node::Text(" ".to_string()));
            th.push(sort_button(config, key, SortOrder::Desc));
        }

        tr.push(th);
    }

    let mut thead = Element::new("thead").child(tr);
    if config.fixed_header {
        thead.add_class("header");
    }
    thead
}

/// One `tr` for a row.
pub fn render_row(
    config: &GridConfiguration,
    columns: &[ResolvedColumn],
    index: usize,
    row: &RowData,
) -> Element {
    let mut tr = Element::new("tr").attr("data-row", index.to_string());

    if let Some(field) = &config.row_css_class {
        if let Some(class) = row.get(field).and_then(display_text) {
            tr.add_class(&class);
        }
    }

    for c in columns {
        let mut td = Element::new("td");
        if let Some(class) = &c.descriptor.css_class {
            td.add_class(class);
        }
        if let Some(content) = render_cell(c, row) {
            td.push(content);
        }
        tr.push(td);
    }

    tr
}

fn render_pager(config: &GridConfiguration, pager: Option<&PagerModel>) -> Element {
    let mut div = Element::new("div").class("pager");
    if let Some(id) = &config.pager_id {
        div.set_attr("id", id.clone());
    }

    if config.export_csv {
        div.push(
            Element::new("span")
                .class("export-csv-link")
                .child(Element::new("i").class("icon-file pointer export-csv"))
                .text("Export to CSV"),
        );
    }

    let Some(pager) = pager else {
        return div;
    };

    for item in &pager.items {
        let node = match *item {
            PagerItem::Previous(p) => Element::new("i")
                .class("icon-chevron-left pointer pager-cursor")
                .attr("data-page", p.to_string())
                .text("<"),
            PagerItem::Page { index, current } => {
                let mut a = Element::new("a")
                    .attr("href", "#")
                    .class("pager-page")
                    .attr("data-page", index.to_string())
                    .text((index + 1).to_string());
                if current {
                    a.add_class("active");
                }
                a
            }
            PagerItem::Ellipsis => Element::new("span").class("pager-ellipsis").text("…"),
            PagerItem::Next(p) => Element::new("i")
                .class("icon-chevron-right pointer pager-cursor")
                .attr("data-page", p.to_string())
                .text(">"),
        };
        div.push(node);
    }

    div.push(Element::new("span").class("pager-label").text(pager.label()));
    div
}

/// Everything needed to draw a grid.
pub struct RenderInput<'a> {
    pub columns: &'a [ResolvedColumn],
    pub rows: &'a [RowData],
    pub pager: Option<&'a PagerModel>,
    pub show_no_results: bool,
    pub show_no_more_results: bool,
    pub loading: bool,
}

/// Build the full grid: table, pager and footers.
pub fn render_grid(config: &GridConfiguration, input: RenderInput<'_>) -> Element {
    let mut table = Element::new("table").class(&config.table_classes);
    if config.fixed_header {
        table.add_class("table-fixed-header");
    }

    table.push(render_header(config, input.columns));

    let mut tbody = Element::new("tbody");
    if !input.show_no_results {
        for (i, row) in input.rows.iter().enumerate() {
            tbody.push(render_row(config, input.columns, i, row));
        }
    }
    table.push(tbody);

    let mut root = Element::new("div").class("evolugrid").child(table);

    if input.show_no_results {
        if let Some(message) = &config.no_results_message {
            root.push(Element::new("div").class("noResults").raw(message.clone()));
        }
    }

    if config.navigation.is_infinite() {
        if input.show_no_more_results {
            root.push(
                Element::new("div")
                    .class("noMoreResults")
                    .text(config.no_more_results_message.clone()),
            );
        }
        if config.export_csv {
            root.push(render_pager(config, None));
        }
    } else {
        root.push(render_pager(config, input.pager));
    }

    if input.loading {
        root.push(Element::new("div").class("ajaxLoader"));
    }

    root
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(v: Value) -> RowData {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn column(display: &str, escape: bool) -> ResolvedColumn {
        ResolvedColumn {
            descriptor: ColumnDescriptor {
                title: display.to_string(),
                display: display.to_string(),
                escape_html: escape,
                ..Default::default()
            },
            renderer: None,
        }
    }

    #[test]
    fn zero_renders_as_text() {
        let c = column("col0", true);

        assert_eq!(
            render_cell(&c, &row(json!({"col0": 0}))),
            Some(Node::Text("0".to_string()))
        );
        assert_eq!(render_cell(&c, &row(json!({"col0": ""}))), None);
        assert_eq!(render_cell(&c, &row(json!({"col0": null}))), None);
        assert_eq!(render_cell(&c, &row(json!({}))), None);
    }

    #[test]
    fn escaping_follows_descriptor() {
        let r = row(json!({"col0": "<b>x</b>"}));

        assert_eq!(
            render_cell(&column("col0", true), &r),
            Some(Node::Text("<b>x</b>".to_string()))
        );
        assert_eq!(
            render_cell(&column("col0", false), &r),
            Some(Node::Raw("<b>x</b>".to_string()))
        );
    }

    #[test]
    fn template_and_renderer_take_precedence() {
        let r = row(json!({"col0": "ignored", "id": 4, "name": "<Al>"}));

        let mut templated = column("col0", true);
        templated.descriptor.jsdisplay = Some("<a href='e?id={id}'>{name}</a>".into());
        assert_eq!(
            render_cell(&templated, &r),
            Some(Node::Raw("<a href='e?id=4'>&lt;Al&gt;</a>".to_string()))
        );

        let mut custom = column("col0", true);
        custom.renderer = Some(Arc::new(|r: &RowData| {
            format!("<em>{}</em>", r["id"])
        }));
        assert_eq!(
            render_cell(&custom, &r),
            Some(Node::Raw("<em>4</em>".to_string()))
        );
    }

    #[test]
    fn merge_by_position() {
        let client = vec![
            ColumnConfig::new().renderer(|_: &RowData| "x".to_string()),
            ColumnConfig::new().title("Local").display("local").sortable(true),
        ];
        let server = vec![ColumnDescriptor {
            title: "Id".into(),
            display: "col0".into(),
            css_class: Some("num".into()),
            escape_html: true,
            ..Default::default()
        }];

        let cols = resolve_columns(&client, &server);

        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].descriptor.title, "Id");
        assert!(cols[0].renderer.is_some());
        assert_eq!(cols[1].descriptor.title, "Local");
        assert_eq!(cols[1].descriptor.display, "local");
        assert!(cols[1].descriptor.sortable);
    }

    #[test]
    fn header_uses_sort_key() {
        let config = GridConfiguration::builder("http://h/g")
            .fixed_header(true)
            .build()
            .unwrap();
        let mut c = column("col0", true);
        c.descriptor.sortable = true;
        c.descriptor.sort_key = Some("last_name".into());
        c.descriptor.width = Some("10%".into());

        let grid = render_grid(
            &config,
            RenderInput {
                columns: &[c],
                rows: &[],
                pager: None,
                show_no_results: false,
                show_no_more_results: false,
                loading: false,
            },
        );

        let th = grid.find_all("th")[0];
        assert_eq!(th.get_attr("style"), Some("width: 10%"));
        let links = th.find_all("a");
        assert_eq!(links[0].get_attr("data-sort-key"), Some("last_name"));
        assert_eq!(links[1].get_attr("data-sort-order"), Some("desc"));
        assert!(links[0].find_class("icon-chevron-up").is_some());

        let table = grid.find_all("table")[0];
        assert!(table.has_class("table"));
        assert!(table.has_class("table-fixed-header"));
    }
}
