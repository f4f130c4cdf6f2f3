//! Turn a row source into a grid response.
//!
//! A [ResultSerializer] is built once per request: give it a row source,
//! optionally a count source and a column list, then let request parameters
//! fill in whatever was not set explicitly with [ResultSerializer::apply_query].
//!
//! ```
//! use evolugrid_server::prelude::*;
//! use serde_json::json;
//!
//! let rows = VecSource::new(vec![json!({"a": 1, "b": 2}), json!({"a": 3, "b": 4})]);
//!
//! let envelope = ResultSerializer::new(rows).limit(1).to_envelope().unwrap();
//!
//! assert_eq!(envelope.count, Some(2));
//! assert_eq!(envelope.data.len(), 1);
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use evolugrid_common::envelope::{
    column_key, Descriptor, ResponseEnvelope, RowData,
};
use evolugrid_common::error::WireError;
use evolugrid_common::query::{GridQuery, OutputFormat};
use evolugrid_common::value_tools::{lookup_path, scalar_text, template_fields};
use indexmap::IndexSet;
use serde_json::Value;

use crate::charset::Charset;
use crate::column::{Column, KeyColumn};
use crate::csv::{strip_tags, write_record};
use crate::source::{CountSource, RowSource, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("The output format '{0}' is not supported")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<WireError> for SerializerError {
    fn from(value: WireError) -> Self {
        match value {
            WireError::UnsupportedFormat(f) => Self::UnsupportedFormat(f),
            WireError::Json(e) => Self::Json(e),
            other => Self::Source(SourceError::Backend(other.to_string())),
        }
    }
}

/// A finished CSV export.
#[derive(Debug, Clone)]
pub struct CsvDocument {
    pub filename: String,
    pub charset: Charset,
    pub bytes: Vec<u8>,
}

/// What a serializer produced, ready to be sent.
#[derive(Debug, Clone)]
pub enum GridResponse {
    Json(ResponseEnvelope),
    Csv(CsvDocument),
}

pub struct ResultSerializer {
    source: Box<dyn RowSource>,
    count: Option<Box<dyn CountSource>>,
    columns: Vec<Box<dyn Column>>,
    format: Option<String>,
    csv_filename: String,
    charset: Charset,
    additional_data: Value,
    offset: Option<u64>,
    limit: Option<u64>,
    sort_key: Option<String>,
    sort_order: Option<String>,
}

impl ResultSerializer {
    pub fn new(source: impl RowSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            count: None,
            columns: Vec::new(),
            format: None,
            csv_filename: "data.csv".to_string(),
            charset: Charset::default(),
            additional_data: Value::Null,
            offset: None,
            limit: None,
            sort_key: None,
            sort_order: None,
        }
    }

    /// Total row count, overriding whatever the row source reports.
    pub fn count(mut self, count: impl CountSource + 'static) -> Self {
        self.count = Some(Box::new(count));
        self
    }

    pub fn column(mut self, column: impl Column + 'static) -> Self {
        self.columns.push(Box::new(column));
        self
    }

    pub fn columns(mut self, columns: Vec<Box<dyn Column>>) -> Self {
        self.columns = columns;
        self
    }

    /// `json` or `csv`. Anything else fails when the response is built.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn csv_filename(mut self, filename: impl Into<String>) -> Self {
        self.csv_filename = filename.into();
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Opaque payload passed to the client along with the rows.
    pub fn additional_data(mut self, data: Value) -> Self {
        self.additional_data = data;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(
        mut self,
        key: impl Into<String>,
        order: Option<impl Into<String>>,
    ) -> Self {
        self.sort_key = Some(key.into());
        self.sort_order = order.map(Into::into);
        self
    }

    /// Fill paging, sort and format from request parameters. Values set
    /// explicitly beforehand are kept.
    pub fn apply_query(mut self, query: &GridQuery) -> Self {
        self.offset = self.offset.or(query.offset);
        self.limit = self.limit.or(query.limit.filter(|l| *l > 0));
        self.sort_key = self.sort_key.or_else(|| query.sort_key.clone());
        self.sort_order = self.sort_order.or_else(|| query.sort_order.clone());
        self.format = self.format.or_else(|| query.output.clone());
        self
    }

    fn output_format(&self) -> Result<OutputFormat, SerializerError> {
        match self.format.as_deref() {
            None | Some("") => Ok(OutputFormat::Json),
            Some(f) => Ok(f.parse()?),
        }
    }

    fn apply_sort(&mut self) {
        let Some(key) = self.sort_key.as_deref().filter(|k| !k.is_empty()) else {
            return;
        };

        match self.source.as_sortable() {
            Some(s) => s.sort(key, self.sort_order.as_deref()),
            None => log::debug!("Row source is not sortable, ignoring sort on {key}"),
        }
    }

    fn apply_pagination(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        let offset = self.offset.unwrap_or(0);

        match self.source.as_paginatable() {
            Some(p) => p.paginate(limit, offset),
            None => log::debug!("Row source is not paginatable, sending all rows"),
        }
    }

    fn total_count(&mut self) -> Option<u64> {
        match &mut self.count {
            Some(c) => c.count(),
            None => self.source.total_count(),
        }
    }

    /// One escaped, unformatted column per field, in first-seen order.
    fn derive_columns(rows: &[Value]) -> Vec<Box<dyn Column>> {
        let mut keys = IndexSet::new();
        for row in rows {
            if let Value::Object(map) = row {
                keys.extend(map.keys().cloned());
            }
        }

        keys.into_iter()
            .map(|k| Box::new(KeyColumn::new(k.clone(), k)) as Box<dyn Column>)
            .collect()
    }

    fn resolve_columns(&mut self, rows: &[Value]) {
        if self.columns.is_empty() {
            self.columns = Self::derive_columns(rows);
            log::debug!("Derived {} columns from rows", self.columns.len());
        }
    }

    /// Build the JSON envelope for the current page.
    pub fn to_envelope(mut self) -> Result<ResponseEnvelope, SerializerError> {
        let count = self.total_count();

        self.apply_pagination();
        self.apply_sort();

        let rows = self.source.rows()?;
        self.resolve_columns(&rows);

        let shown: Vec<(usize, &dyn Column)> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_hidden() && c.is_displayed())
            .map(|(i, c)| (i, c.as_ref()))
            .collect();

        // Fields client-side templates refer to travel with each row.
        let template_keys: IndexSet<String> = shown
            .iter()
            .filter_map(|(_, c)| c.client_template())
            .flat_map(|t| template_fields(&t))
            .collect();

        let data = rows
            .iter()
            .map(|row| {
                let mut out = shown
                    .iter()
                    .map(|(i, c)| (column_key(*i), c.render(row)))
                    .collect::<RowData>();

                for key in &template_keys {
                    if !out.contains_key(key) {
                        let value = lookup_path(row, key).cloned().unwrap_or(Value::Null);
                        out.insert(key.clone(), value);
                    }
                }
                out
            })
            .collect();

        let columns = shown
            .iter()
            .map(|(i, c)| c.descriptor(column_key(*i)))
            .collect();

        Ok(ResponseEnvelope {
            count,
            data,
            descriptor: Descriptor { columns },
            additional_data: self.additional_data,
        })
    }

    /// Write every row (sorted, not paginated) as CSV text.
    fn csv_text(&mut self) -> Result<String, SerializerError> {
        self.apply_sort();

        let rows = self.source.rows()?;
        self.resolve_columns(&rows);

        let exported: Vec<&dyn Column> = self
            .columns
            .iter()
            .filter(|c| c.is_exported() && !c.is_hidden())
            .map(|c| c.as_ref())
            .collect();

        let mut out = String::new();

        let titles: Vec<String> = exported.iter().map(|c| c.title()).collect();
        write_record(&mut out, &titles);

        for row in &rows {
            let cells: Vec<String> = exported
                .iter()
                .map(|c| strip_tags(&scalar_text(&c.render(row))))
                .collect();
            write_record(&mut out, &cells);
        }

        Ok(out)
    }

    /// Write the CSV export to any writer, in the configured charset.
    pub fn write_csv<W: Write>(mut self, mut w: W) -> Result<(), SerializerError> {
        let text = self.csv_text()?;
        w.write_all(&self.charset.encode(&text))?;
        Ok(())
    }

    /// Write the CSV export to a file.
    pub fn save_csv(self, path: impl AsRef<Path>) -> Result<(), SerializerError> {
        let path = path.as_ref();
        log::info!("Saving CSV export to {}", path.display());
        self.write_csv(File::create(path)?)
    }

    /// Build the response in the requested format.
    pub fn response(mut self) -> Result<GridResponse, SerializerError> {
        match self.output_format()? {
            OutputFormat::Json => Ok(GridResponse::Json(self.to_envelope()?)),
            OutputFormat::Csv => {
                let text = self.csv_text()?;
                Ok(GridResponse::Csv(CsvDocument {
                    filename: self.csv_filename.clone(),
                    charset: self.charset,
                    bytes: self.charset.encode(&text),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::column::{ColumnBuilder, HtmlColumn, TemplateColumn};
    use crate::source::VecSource;

    fn csv_of(ser: ResultSerializer) -> String {
        match ser.response().unwrap() {
            GridResponse::Csv(doc) => String::from_utf8(doc.bytes).unwrap(),
            GridResponse::Json(_) => panic!("expected csv"),
        }
    }

    #[test]
    fn derives_columns_in_first_seen_order() {
        let rows = vec![json!({"a": 1, "b": 2}), json!({"a": 3, "b": 4})];

        let env = ResultSerializer::new(rows).to_envelope().unwrap();

        let titles: Vec<_> =
            env.descriptor.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert!(env.descriptor.columns.iter().all(|c| c.escape_html));
        assert_eq!(env.data[0]["col0"], json!(1));
        assert_eq!(env.data[0]["col1"], json!(2));
        assert_eq!(env.data[1]["col0"], json!(3));
        assert_eq!(env.data[1]["col1"], json!(4));
        assert_eq!(env.count, None);
    }

    #[test]
    fn derived_columns_include_late_fields() {
        let rows = vec![json!({"a": 1}), json!({"b": 2, "a": 3})];

        let env = ResultSerializer::new(rows).to_envelope().unwrap();

        assert_eq!(env.descriptor.columns.len(), 2);
        assert_eq!(env.data[0]["col1"], Value::Null);
    }

    #[test]
    fn pages_through_capable_source() {
        let rows = VecSource::new(vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);

        let query = GridQuery::from_query_str("offset=2&limit=2").unwrap();
        let env = ResultSerializer::new(rows)
            .column(KeyColumn::new("Id", "id"))
            .apply_query(&query)
            .to_envelope()
            .unwrap();

        assert_eq!(env.count, Some(3));
        assert_eq!(env.data.len(), 1);
        assert_eq!(env.data[0]["col0"], json!(3));
    }

    #[test]
    fn explicit_values_beat_request() {
        let rows = VecSource::new(vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);

        let query = GridQuery::from_query_str("limit=1&sort_key=id&sort_order=asc").unwrap();
        let env = ResultSerializer::new(rows)
            .limit(2)
            .sort("id", Some("desc"))
            .count(10u64)
            .apply_query(&query)
            .to_envelope()
            .unwrap();

        assert_eq!(env.count, Some(10));
        assert_eq!(env.data.len(), 2);
        assert_eq!(env.data[0]["col0"], json!(3));
    }

    #[test]
    fn plain_rows_ignore_paging() {
        let rows = vec![json!({"id": 1}), json!({"id": 2})];

        let env = ResultSerializer::new(rows)
            .limit(1)
            .sort("id", Some("desc"))
            .to_envelope()
            .unwrap();

        assert_eq!(env.data.len(), 2);
        assert_eq!(env.data[0]["col0"], json!(1));
    }

    #[test]
    fn hidden_and_undisplayed_columns_are_left_out() {
        let rows = vec![json!({"a": 1, "b": 2, "c": 3})];

        let env = ResultSerializer::new(rows)
            .column(KeyColumn::new("A", "a").display_condition(false))
            .column(KeyColumn::new("B", "b").display(false))
            .column(KeyColumn::new("C", "c").width("40px"))
            .additional_data(json!({"total": 6}))
            .to_envelope()
            .unwrap();

        assert_eq!(env.descriptor.columns.len(), 1);
        let c = &env.descriptor.columns[0];
        assert_eq!(c.display, "col2");
        assert_eq!(c.width.as_deref(), Some("40px"));
        assert_eq!(env.data[0].len(), 1);
        assert_eq!(env.data[0]["col2"], json!(3));
        assert_eq!(env.additional_data, json!({"total": 6}));
    }

    #[test]
    fn template_fields_travel_with_rows() {
        let env = ResultSerializer::new(VecSource::new(vec![
            json!({"id": 4, "name": "Ann", "customer": {"city": "Lyon"}}),
        ]))
        .column(KeyColumn::new("Name", "name"))
        .column(HtmlColumn::new(
            "Edit",
            "<a href='e?id={id}&city={customer.city}&n={col0}'>e</a>",
        ))
        .to_envelope()
        .unwrap();

        assert_eq!(
            Value::Object(env.data[0].clone()),
            json!({"col0": "Ann", "col1": null, "id": 4, "customer.city": "Lyon"})
        );
    }

    #[test]
    fn csv_exports_escaped_columns_only() {
        let rows = vec![json!({"id": 1, "name": "<b>Ann</b>", "note": "x"})];

        let ser = ResultSerializer::new(rows)
            .column(KeyColumn::new("Id", "id"))
            .column(KeyColumn::new("Name", "name"))
            .column(KeyColumn::new("Note", "note").escape_html(false))
            .column(TemplateColumn::new("Link", "<a>{{ id }}</a>"))
            .column(HtmlColumn::new("Edit", "<a href='e?id={id}'>e</a>"))
            .format("csv")
            .charset(Charset::Utf8);

        assert_eq!(csv_of(ser), "Id;Name\n1;Ann\n");
    }

    #[test]
    fn csv_includes_undisplayed_exported_columns() {
        let rows = vec![json!({"id": 1, "secret": "s"})];

        let ser = ResultSerializer::new(rows)
            .column(KeyColumn::new("Id", "id"))
            .column(KeyColumn::new("Secret", "secret").display(false))
            .column(KeyColumn::new("Gone", "id").display_condition(false))
            .format("csv");

        assert_eq!(csv_of(ser), "Id;Secret\n1;s\n");
    }

    #[test]
    fn csv_is_not_paginated() {
        let rows = VecSource::new(vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);

        let ser = ResultSerializer::new(rows)
            .limit(1)
            .sort("id", Some("desc"))
            .format("csv");

        assert_eq!(csv_of(ser), "id\n3\n2\n1\n");
    }

    #[test]
    fn csv_transcodes() {
        let rows = vec![json!({"city": "Orléans"})];

        match ResultSerializer::new(rows)
            .format("csv")
            .csv_filename("cities.csv")
            .response()
            .unwrap()
        {
            GridResponse::Csv(doc) => {
                assert_eq!(doc.filename, "cities.csv");
                assert_eq!(doc.charset, Charset::Windows1252);
                assert_eq!(doc.bytes, b"city\nOrl\xE9ans\n".to_vec());
            }
            GridResponse::Json(_) => panic!("expected csv"),
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = ResultSerializer::new(Vec::<Value>::new())
            .format("xml")
            .response()
            .unwrap_err();

        assert!(matches!(err, SerializerError::UnsupportedFormat(f) if f == "xml"));
    }

    #[test]
    fn save_to_file() {
        let path = std::env::temp_dir().join("evolugrid_save_csv_test.csv");

        ResultSerializer::new(vec![json!({"a": "x y"})])
            .save_csv(&path)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n\"x y\"\n");
        let _ = std::fs::remove_file(&path);
    }
}
